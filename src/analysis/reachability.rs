//! 可达步图：从初始网出发逐个迁移单独发生，按标识去重.
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::{debug, info, warn};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{EdgeReference, Graph, NodeIndex};

use crate::analysis::SimulationError;
use crate::net::{Marking, PetriNet, TransitionId};

#[derive(Debug, Clone, Default)]
pub struct StepGraphConfig {
    /// Maximum number of distinct steps. `None` explores without bound and
    /// does not terminate on nets whose markers grow along a cycle.
    pub state_limit: Option<usize>,
}

/// 初始网的一个不同的可达标识.
#[derive(Debug, Clone)]
pub struct Step {
    pub index: usize,
    pub marking: Marking,
    pub enabled: Vec<TransitionId>,
}

/// 步图的边，标注产生它的迁移.
#[derive(Debug, Clone)]
pub struct NetArc {
    pub transition: TransitionId,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct StepGraph {
    pub net: PetriNet,
    pub graph: Graph<Step, NetArc>,
    pub initial: NodeIndex,
    pub markings: IndexMap<Marking, NodeIndex>,
}

impl StepGraph {
    pub fn build(net: &PetriNet) -> Result<Self, SimulationError> {
        Self::with_config(net, &StepGraphConfig::default())
    }

    pub fn with_config(net: &PetriNet, config: &StepGraphConfig) -> Result<Self, SimulationError> {
        let mut graph = Graph::new();
        let mut markings: IndexMap<Marking, NodeIndex> = IndexMap::new();
        let mut queue = VecDeque::new();

        let initial_marking = net.marking();
        let initial = graph.add_node(Step {
            index: 0,
            marking: initial_marking.clone(),
            enabled: Vec::new(),
        });
        markings.insert(initial_marking, initial);
        queue.push_back(initial);

        while let Some(current) = queue.pop_front() {
            let mut state = net.deep_copy();
            state.apply_marking(&graph[current].marking);
            let enabled = state.enabled_transitions();
            graph[current].enabled = enabled.clone();

            for transition in enabled {
                let mut next = state.deep_copy();
                next.fire_transition(transition)?;
                let next_marking = next.marking();

                let target = match markings.entry(next_marking) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        if let Some(limit) = config.state_limit {
                            if graph.node_count() >= limit {
                                warn!(
                                    "step graph of {} exceeded {} steps, giving up",
                                    net.id, limit
                                );
                                return Err(SimulationError::StateSpaceUnbounded {
                                    limit,
                                    explored: graph.node_count(),
                                });
                            }
                        }
                        let index = graph.add_node(Step {
                            index: graph.node_count(),
                            marking: entry.key().clone(),
                            enabled: Vec::new(),
                        });
                        entry.insert(index);
                        queue.push_back(index);
                        index
                    }
                };

                graph.add_edge(
                    current,
                    target,
                    NetArc {
                        transition,
                        label: net.transition(transition).id.clone(),
                    },
                );
            }
        }

        info!(
            "step graph of {}: {} steps, {} arcs",
            net.id,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Self {
            net: net.deep_copy(),
            graph,
            initial,
            markings,
        })
    }

    pub fn step_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn arc_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn step(&self, index: NodeIndex) -> &Step {
        &self.graph[index]
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.graph.node_weights()
    }

    /// The net as it stands in `index`: shared structure, that step's markers.
    pub fn step_net(&self, index: NodeIndex) -> PetriNet {
        let mut net = self.net.deep_copy();
        net.apply_marking(&self.graph[index].marking);
        net
    }

    pub fn contains_marking(&self, marking: &Marking) -> bool {
        self.markings.contains_key(marking)
    }

    /// 没有可发生迁移的步.
    pub fn terminal_steps(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|idx| self.graph[*idx].enabled.is_empty())
            .collect()
    }

    /// 探索中至少发生过一次的迁移.
    pub fn fired_transitions(&self) -> IndexSet<TransitionId> {
        let fired: IndexSet<TransitionId> = self
            .graph
            .edge_references()
            .map(|edge| edge.weight().transition)
            .collect();
        debug!("{} of {} transitions fired", fired.len(), self.net.transitions_len());
        fired
    }

    pub fn dot(&self) -> String {
        fn escape(s: &str) -> String {
            s.replace('\\', "\\\\").replace('"', "\\\"")
        }

        let edge_attr = |_, edge: EdgeReference<'_, NetArc>| -> String {
            format!("label=\"{}\"", escape(&edge.weight().label))
        };

        let node_attr = |_, (_idx, step): (NodeIndex, &Step)| -> String {
            let marked = step
                .marking
                .iter()
                .filter(|(_, tokens)| **tokens > 0)
                .map(|(place, tokens)| format!("{}:{}", self.net.place(place).id, tokens))
                .join(", ");
            format!("label=\"s{}\\n{}\"", step.index, escape(&marked))
        };

        format!(
            "{:?}",
            Dot::with_attr_getters(
                &self.graph,
                &[Config::EdgeNoLabel, Config::NodeNoLabel],
                &edge_attr,
                &node_attr
            )
        )
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.dot())
    }
}
