//! 路径枚举：沿步图中实际使用过的弧，在初始网上展开无环路径.
use std::collections::HashSet;

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};

use crate::analysis::{SimulationError, StepGraph};
use crate::net::{NodeRef, PetriNet};

/// 初始网中库所与迁移交替的序列.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetPath {
    nodes: Vec<NodeRef>,
    /// 最后一个节点与前面某个节点重复.
    cyclic: bool,
}

impl NetPath {
    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    pub fn start(&self) -> NodeRef {
        self.nodes[0]
    }

    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn describe(&self, net: &PetriNet) -> String {
        self.nodes
            .iter()
            .map(|node| net.node_name(*node))
            .join(" -> ")
    }
}

/// 步图初始网的极大路径，按起点索引。公式在该集合上求值.
#[derive(Debug, Clone)]
pub struct PathSet {
    net: PetriNet,
    paths: Vec<NetPath>,
    by_start: IndexMap<NodeRef, Vec<usize>>,
    successors: IndexMap<NodeRef, Vec<NodeRef>>,
}

impl PathSet {
    pub fn from_step_graph(step_graph: &StepGraph) -> Result<Self, SimulationError> {
        Self::with_limit(step_graph, None)
    }

    pub fn with_limit(
        step_graph: &StepGraph,
        limit: Option<usize>,
    ) -> Result<Self, SimulationError> {
        let net = step_graph.net.deep_copy();
        let successors = used_successors(step_graph);
        let paths = maximal_paths(enumerate(&successors, limit)?);

        let mut by_start: IndexMap<NodeRef, Vec<usize>> = IndexMap::new();
        for (idx, path) in paths.iter().enumerate() {
            by_start.entry(path.start()).or_default().push(idx);
        }
        info!(
            "{} maximal paths over {} start nodes ({} cyclic)",
            paths.len(),
            by_start.len(),
            paths.iter().filter(|p| p.cyclic).count()
        );
        Ok(Self {
            net,
            paths,
            by_start,
            successors,
        })
    }

    pub fn net(&self) -> &PetriNet {
        &self.net
    }

    pub fn paths(&self) -> &[NetPath] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// `node` 沿构造路径所用弧的直接后继.
    pub fn successors(&self, node: NodeRef) -> &[NodeRef] {
        self.successors.get(&node).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn starting_at(&self, node: NodeRef) -> impl Iterator<Item = &NetPath> + '_ {
        self.by_start
            .get(&node)
            .into_iter()
            .flatten()
            .map(|idx| &self.paths[*idx])
    }
}

/// 构造步图时实际发生过的迁移所关联的弧.
fn used_successors(step_graph: &StepGraph) -> IndexMap<NodeRef, Vec<NodeRef>> {
    let fired = step_graph.fired_transitions();
    let mut successors: IndexMap<NodeRef, Vec<NodeRef>> = IndexMap::new();
    for (_, arc) in step_graph.net.arcs() {
        let used = [arc.source(), arc.target()]
            .into_iter()
            .filter_map(NodeRef::as_transition)
            .any(|transition| fired.contains(&transition));
        if used {
            successors.entry(arc.source()).or_default().push(arc.target());
        }
    }
    successors
}

/// Every path of length one, extended hop by hop while no node repeats. A
/// hop back onto the path closes it as a cyclic path.
fn enumerate(
    successors: &IndexMap<NodeRef, Vec<NodeRef>>,
    limit: Option<usize>,
) -> Result<Vec<NetPath>, SimulationError> {
    let check = |count: usize| match limit {
        Some(limit) if count > limit => Err(SimulationError::PathSpaceExceeded { limit }),
        _ => Ok(()),
    };

    let mut all = Vec::new();
    let mut frontier: Vec<NetPath> = successors
        .iter()
        .flat_map(|(source, targets)| {
            targets.iter().map(|target| NetPath {
                nodes: vec![*source, *target],
                cyclic: false,
            })
        })
        .collect();

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for path in frontier {
            let last = path.nodes[path.nodes.len() - 1];
            for successor in successors.get(&last).into_iter().flatten() {
                let mut nodes = path.nodes.clone();
                nodes.push(*successor);
                if path.nodes.contains(successor) {
                    all.push(NetPath {
                        nodes,
                        cyclic: true,
                    });
                } else {
                    next.push(NetPath {
                        nodes,
                        cyclic: false,
                    });
                }
            }
            all.push(path);
            check(all.len() + next.len())?;
        }
        debug!("path frontier grew to {} open paths", next.len());
        frontier = next;
    }
    Ok(all)
}

/// 去掉作为其他路径真前缀的路径，无环路径排在前面.
fn maximal_paths(all: Vec<NetPath>) -> Vec<NetPath> {
    let prefixes: HashSet<&[NodeRef]> = all
        .iter()
        .flat_map(|path| (2..path.nodes.len()).map(move |len| &path.nodes[..len]))
        .collect();
    let keep: Vec<bool> = all
        .iter()
        .map(|path| !prefixes.contains(path.nodes.as_slice()))
        .collect();

    let mut paths: Vec<NetPath> = all
        .into_iter()
        .zip(keep)
        .filter_map(|(path, keep)| keep.then_some(path))
        .collect();
    paths.sort_by_key(|path| (path.cyclic, path.nodes.len()));
    paths
}
