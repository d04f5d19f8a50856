use std::collections::{BTreeSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use log::{debug, info};

use crate::net::{
    Context, NetError, NodeRef, PetriNet, Place, PlaceId, Transition, TransitionId, TransitionKind,
};
use crate::route::{Endpoint, Route};

/// 由路由翻译得到的网，附带合成的起点与终点库所.
#[derive(Debug, Clone)]
pub struct RouteNet {
    pub net: PetriNet,
    /// 预置一个托肯，连向所有没有输入的迁移.
    pub source: PlaceId,
    /// 汇集所有没有输出的迁移.
    pub sink: PlaceId,
}

/// Translates a route tree into a [`RouteNet`].
///
/// One place per route node, one transition per endpoint identifier. Start
/// endpoints feed the route node's place and write its output resources; end
/// endpoints drain it and read them.
pub struct RouteBuilder {
    net: PetriNet,
    places: IndexMap<String, PlaceId>,
    transitions: IndexMap<String, TransitionId>,
}

impl RouteBuilder {
    pub fn new(net_id: impl Into<String>) -> Self {
        Self {
            net: PetriNet::new(net_id),
            places: IndexMap::new(),
            transitions: IndexMap::new(),
        }
    }

    pub fn build(route: &Route) -> Result<RouteNet, NetError> {
        let mut builder = Self::new(route.id.clone());
        builder.visit(route)?;
        builder.finish()
    }

    /// 添加路由节点及其子路由。已出现过的标识符连同其子节点一起跳过.
    pub fn visit(&mut self, route: &Route) -> Result<(), NetError> {
        if self.places.contains_key(&route.id) {
            debug!("route node {} already translated, skipping", route.id);
            return Ok(());
        }
        let place = self.net.add_place(Place::new(route.id.clone(), 0));
        self.places.insert(route.id.clone(), place);

        for endpoint in &route.start_endpoints {
            let transition = self.transition_or_create(endpoint);
            self.net
                .transition_mut(transition)
                .context_or_default()
                .write
                .extend(route.output_resources.iter().cloned());
            self.net.add_arc_once(transition, place)?;
        }

        for endpoint in &route.end_endpoints {
            let transition = self.transition_or_create(endpoint);
            self.net
                .transition_mut(transition)
                .context_or_default()
                .read
                .extend(route.output_resources.iter().cloned());
            self.net.add_arc_once(place, transition)?;
        }

        for sub_route in &route.sub_routes {
            self.visit(sub_route)?;
        }
        Ok(())
    }

    fn transition_or_create(&mut self, endpoint: &Endpoint) -> TransitionId {
        let net = &mut self.net;
        let transition = *self
            .transitions
            .entry(endpoint.id.clone())
            .or_insert_with(|| {
                net.add_transition(Transition::with_context(
                    endpoint.id.clone(),
                    Context::new(endpoint.kind),
                ))
            });
        self.net
            .transition_mut(transition)
            .context_or_default()
            .tags
            .extend(endpoint.context_tags.iter().cloned());
        transition
    }

    /// 补上源库所与汇库所，再传播读/写/擦除上下文.
    pub fn finish(mut self) -> Result<RouteNet, NetError> {
        let source = self
            .net
            .add_place(Place::new(format!("{}#source", self.net.id), 1));
        let sink = self
            .net
            .add_place(Place::new(format!("{}#sink", self.net.id), 0));

        let transitions: Vec<TransitionId> = self.net.transitions.indices().collect();
        for transition in transitions {
            if self.net.transition(transition).target_arcs().is_empty() {
                self.net.add_arc(source, transition)?;
            }
            if self.net.transition(transition).source_arcs().is_empty() {
                self.net.add_arc(transition, sink)?;
            }
        }

        fill_write_and_erase(&mut self.net, source);

        info!(
            "route {} translated: {} places, {} transitions, {} arcs",
            self.net.id,
            self.net.places_len(),
            self.net.transitions_len(),
            self.net.arcs_len()
        );
        Ok(RouteNet {
            net: self.net,
            source,
            sink,
        })
    }
}

/// Sets every transition's read set to the union of the write sets two arcs
/// upstream. APP transitions erase what they read but do not write again;
/// CONTROL transitions pass what they read through as their write set.
///
/// Transitions are visited breadth-first from `origin` so that chains of
/// CONTROL transitions see their predecessors' updated write sets.
pub fn fill_write_and_erase(net: &mut PetriNet, origin: PlaceId) {
    for transition in propagation_order(net, origin) {
        let previous: BTreeSet<String> = net
            .preset(transition)
            .flat_map(|place| net.predecessors(place.into()))
            .filter_map(NodeRef::as_transition)
            .filter_map(|upstream| net.transition(upstream).context.as_ref())
            .flat_map(|context| context.write.iter().cloned())
            .collect();

        let context = net.transition_mut(transition).context_or_default();
        context.read = previous.clone();
        match context.kind {
            TransitionKind::App => {
                context.erase = previous.difference(&context.write).cloned().collect();
            }
            TransitionKind::Control => {
                context.write = previous;
            }
        }
        debug!("context of {}: {}", net.transition(transition).id, context_of(net, transition));
    }
}

fn context_of(net: &PetriNet, transition: TransitionId) -> String {
    net.transition(transition)
        .context
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default()
}

fn propagation_order(net: &PetriNet, origin: PlaceId) -> IndexSet<TransitionId> {
    let mut order = IndexSet::new();
    let mut seen = IndexSet::new();
    let mut queue = VecDeque::from([NodeRef::Place(origin)]);
    seen.insert(NodeRef::Place(origin));

    while let Some(node) = queue.pop_front() {
        if let NodeRef::Transition(transition) = node {
            order.insert(transition);
        }
        for next in net.successors(node) {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }

    order.extend(net.transitions.indices());
    order
}
