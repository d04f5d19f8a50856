//! 展开：APP 迁移拆成 start/inner/end 三段，以便观察并发执行.
use std::collections::BTreeSet;

use indexmap::IndexMap;
use log::{debug, info};

use crate::analysis::{SimulationError, StepGraph, StepGraphConfig};
use crate::net::{NetError, NodeRef, PetriNet, Place, Transition, TransitionKind};

/// Splits every APP transition `t` into `t#start -> t#inner -> t#end`.
///
/// `t#start` takes over the arcs into `t`, `t#end` the arcs out of it, and
/// `t#inner` remembers `t` as its origin. A marked inner place means `t` is
/// executing. CONTROL transitions and all places are copied unchanged.
pub fn unfold(net: &PetriNet) -> Result<PetriNet, NetError> {
    let mut unfolded = PetriNet::new(format!("{}#unfolded", net.id));

    let places: IndexMap<_, _> = net
        .places
        .iter_enumerated()
        .map(|(idx, place)| (idx, unfolded.add_place(place.detached())))
        .collect();

    // (entry, exit) of every original transition in the unfolded net
    let mut ends = IndexMap::new();
    for (idx, transition) in net.transitions.iter_enumerated() {
        match transition.kind() {
            TransitionKind::Control => {
                let copy = unfolded.add_transition(transition.detached());
                ends.insert(idx, (copy, copy));
            }
            TransitionKind::App => {
                let mut start = Transition::new(format!("{}#start", transition.id));
                let mut end = Transition::new(format!("{}#end", transition.id));
                start.context = transition.context.clone();
                end.context = transition.context.clone();

                let start = unfolded.add_transition(start);
                let inner = unfolded.add_place(Place::new_inner(
                    format!("{}#inner", transition.id),
                    transition.id.clone(),
                ));
                let end = unfolded.add_transition(end);
                unfolded.add_arc(start, inner)?;
                unfolded.add_arc(inner, end)?;
                ends.insert(idx, (start, end));
            }
        }
    }

    for (_, arc) in net.arcs() {
        let (source, target) = match (arc.source(), arc.target()) {
            (NodeRef::Place(place), NodeRef::Transition(transition)) => {
                (NodeRef::Place(places[&place]), NodeRef::Transition(ends[&transition].0))
            }
            (NodeRef::Transition(transition), NodeRef::Place(place)) => {
                (NodeRef::Transition(ends[&transition].1), NodeRef::Place(places[&place]))
            }
            (source, target) => {
                return Err(NetError::InvalidTopology {
                    source_node: net.node_name(source).to_owned(),
                    target: net.node_name(target).to_owned(),
                });
            }
        };
        unfolded.add_arc(source, target)?;
    }

    debug!(
        "unfolded {}: {} -> {} transitions",
        net.id,
        net.transitions_len(),
        unfolded.transitions_len()
    );
    Ok(unfolded)
}

/// 可同时执行的迁移集合.
///
/// 展开 `net` 并探索其步图，在每一步收集有托肯的内部库所所对应的原迁移。
/// 只报告至少两个成员的集合，结果去重并排序.
pub fn parallel_sets(
    net: &PetriNet,
    config: &StepGraphConfig,
) -> Result<Vec<BTreeSet<String>>, SimulationError> {
    let unfolded = unfold(net)?;
    let steps = StepGraph::with_config(&unfolded, config)?;

    let sets: BTreeSet<BTreeSet<String>> = steps
        .steps()
        .map(|step| {
            step.marking
                .marked_places()
                .filter_map(|place| unfolded.place(place).origin())
                .map(str::to_owned)
                .collect::<BTreeSet<String>>()
        })
        .filter(|set| set.len() >= 2)
        .collect();

    info!("{} parallel sets in {}", sets.len(), net.id);
    Ok(sets.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Context;
    use crate::route::{Endpoint, Route, RouteBuilder};

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn app_transition_is_split_in_three() {
        let mut net = PetriNet::new("n");
        let p0 = net.add_place(Place::new("p0", 1));
        let p1 = net.add_place(Place::new("p1", 0));
        let t = net.add_transition(Transition::with_context(
            "t",
            Context::new(TransitionKind::App),
        ));
        let c = net.add_transition(Transition::with_context(
            "c",
            Context::new(TransitionKind::Control),
        ));
        net.add_arc(p0, t).unwrap();
        net.add_arc(t, p1).unwrap();
        net.add_arc(p1, c).unwrap();

        let unfolded = unfold(&net).unwrap();
        assert_eq!(unfolded.transitions_len(), 3);
        assert_eq!(unfolded.places_len(), 3);

        let inner = unfolded.place_by_id("t#inner").unwrap();
        assert_eq!(unfolded.place(inner).origin(), Some("t"));
        let start = unfolded.transition_by_id("t#start").unwrap();
        let end = unfolded.transition_by_id("t#end").unwrap();
        assert_eq!(
            unfolded.preset(start).collect::<Vec<_>>(),
            vec![unfolded.place_by_id("p0").unwrap()]
        );
        assert_eq!(
            unfolded.postset(end).collect::<Vec<_>>(),
            vec![unfolded.place_by_id("p1").unwrap()]
        );
        assert!(unfolded.transition_by_id("c").is_some());
        assert_eq!(
            unfolded.place(unfolded.place_by_id("p0").unwrap()).markers,
            1
        );
    }

    #[test]
    fn branching_route_runs_both_consumers_together() {
        let route = Route::new("root")
            .step(
                Route::new("s1")
                    .start(Endpoint::app("E0"))
                    .end(Endpoint::app("E1"))
                    .output("R1"),
            )
            .step(
                Route::new("s2")
                    .start(Endpoint::app("E0"))
                    .end(Endpoint::app("E2"))
                    .output("R2"),
            );
        let built = RouteBuilder::build(&route).unwrap();

        let sets = parallel_sets(&built.net, &StepGraphConfig::default()).unwrap();
        assert_eq!(sets, vec![set(&["E1", "E2"])]);
    }

    #[test]
    fn sequential_route_has_no_parallel_sets() {
        let route = Route::new("r")
            .start(Endpoint::app("in"))
            .end(Endpoint::app("out"))
            .output("R1");
        let built = RouteBuilder::build(&route).unwrap();

        assert!(
            parallel_sets(&built.net, &StepGraphConfig::default())
                .unwrap()
                .is_empty()
        );
    }
}
