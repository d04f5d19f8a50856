//! 路由网的存储区：节点与弧的登记、结构相等与图描述输出.
use std::collections::BTreeSet;
use std::fmt::{self, Write as FmtWrite};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::ids::{ArcId, NodeRef, PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::{Arc, Marking, Place, Transition};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetError {
    #[error("arc {source_node} -> {target} joins two nodes of the same kind")]
    InvalidTopology { source_node: String, target: String },
    #[error("node {0:?} does not belong to this net")]
    UnknownNode(NodeRef),
    #[error("arc {0:?} does not belong to this net")]
    UnknownArc(ArcId),
}

/// 存放库所、迁移与弧的存储区。弧按下标引用节点，
/// 因此普通 clone 即深拷贝，弧指向拷贝后的节点.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(from = "NetDocument")]
pub struct PetriNet {
    pub id: String,
    pub places: IndexVec<PlaceId, Place>,
    pub transitions: IndexVec<TransitionId, Transition>,
    arcs: IndexVec<ArcId, Arc>,
    #[serde(skip)]
    place_lookup: IndexMap<String, PlaceId>,
    #[serde(skip)]
    transition_lookup: IndexMap<String, TransitionId>,
}

/// 序列化形式：不含按 id 的查找表，反序列化后重建.
#[derive(Deserialize)]
struct NetDocument {
    id: String,
    places: IndexVec<PlaceId, Place>,
    transitions: IndexVec<TransitionId, Transition>,
    arcs: IndexVec<ArcId, Arc>,
}

impl From<NetDocument> for PetriNet {
    fn from(document: NetDocument) -> Self {
        let mut net = Self {
            id: document.id,
            places: document.places,
            transitions: document.transitions,
            arcs: document.arcs,
            ..Self::default()
        };
        net.reindex();
        net
    }
}

impl PetriNet {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    pub fn add_place(&mut self, mut place: Place) -> PlaceId {
        place.incoming.clear();
        place.outgoing.clear();
        let key = place.id.clone();
        let id = self.places.push(place);
        self.place_lookup.insert(key, id);
        id
    }

    pub fn add_transition(&mut self, mut transition: Transition) -> TransitionId {
        transition.incoming.clear();
        transition.outgoing.clear();
        let key = transition.id.clone();
        let id = self.transitions.push(transition);
        self.transition_lookup.insert(key, id);
        id
    }

    /// 添加弧并在两端节点登记.
    pub fn add_arc(
        &mut self,
        source: impl Into<NodeRef>,
        target: impl Into<NodeRef>,
    ) -> Result<ArcId, NetError> {
        let (source, target) = (source.into(), target.into());
        self.check_arc(source, target)?;
        let arc = self.arcs.push(Arc { source, target });
        self.register(arc, source, target);
        Ok(arc)
    }

    /// Like [`PetriNet::add_arc`], but reuses an identical existing arc.
    pub fn add_arc_once(
        &mut self,
        source: impl Into<NodeRef>,
        target: impl Into<NodeRef>,
    ) -> Result<ArcId, NetError> {
        let (source, target) = (source.into(), target.into());
        match self.find_arc(source, target) {
            Some(existing) => Ok(existing),
            None => self.add_arc(source, target),
        }
    }

    pub fn set_source(&mut self, arc: ArcId, source: impl Into<NodeRef>) -> Result<(), NetError> {
        let source = source.into();
        let current = *self.arcs.get(arc).ok_or(NetError::UnknownArc(arc))?;
        self.check_arc(source, current.target)?;
        self.unregister(arc, current.source, current.target);
        self.arcs[arc].source = source;
        self.register(arc, source, current.target);
        Ok(())
    }

    pub fn set_target(&mut self, arc: ArcId, target: impl Into<NodeRef>) -> Result<(), NetError> {
        let target = target.into();
        let current = *self.arcs.get(arc).ok_or(NetError::UnknownArc(arc))?;
        self.check_arc(current.source, target)?;
        self.unregister(arc, current.source, current.target);
        self.arcs[arc].target = target;
        self.register(arc, current.source, target);
        Ok(())
    }

    fn check_arc(&self, source: NodeRef, target: NodeRef) -> Result<(), NetError> {
        for node in [source, target] {
            if !self.contains(node) {
                return Err(NetError::UnknownNode(node));
            }
        }
        if !source.is_complement_of(target) {
            return Err(NetError::InvalidTopology {
                source_node: self.node_name(source).to_owned(),
                target: self.node_name(target).to_owned(),
            });
        }
        Ok(())
    }

    fn register(&mut self, arc: ArcId, source: NodeRef, target: NodeRef) {
        match source {
            NodeRef::Place(p) => self.places[p].outgoing.push(arc),
            NodeRef::Transition(t) => self.transitions[t].outgoing.push(arc),
        }
        match target {
            NodeRef::Place(p) => self.places[p].incoming.push(arc),
            NodeRef::Transition(t) => self.transitions[t].incoming.push(arc),
        }
    }

    fn unregister(&mut self, arc: ArcId, source: NodeRef, target: NodeRef) {
        match source {
            NodeRef::Place(p) => self.places[p].outgoing.retain(|a| *a != arc),
            NodeRef::Transition(t) => self.transitions[t].outgoing.retain(|a| *a != arc),
        }
        match target {
            NodeRef::Place(p) => self.places[p].incoming.retain(|a| *a != arc),
            NodeRef::Transition(t) => self.transitions[t].incoming.retain(|a| *a != arc),
        }
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Place(p) => p.index() < self.places.len(),
            NodeRef::Transition(t) => t.index() < self.transitions.len(),
        }
    }

    pub fn find_arc(&self, source: NodeRef, target: NodeRef) -> Option<ArcId> {
        if !self.contains(source) {
            return None;
        }
        self.source_arcs(source)
            .iter()
            .copied()
            .find(|arc| self.arcs[*arc].target == target)
    }

    pub fn arc(&self, arc: ArcId) -> &Arc {
        &self.arcs[arc]
    }

    pub fn arcs(&self) -> impl Iterator<Item = (ArcId, &Arc)> {
        self.arcs.iter_enumerated()
    }

    pub fn arcs_len(&self) -> usize {
        self.arcs.len()
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn place(&self, place: PlaceId) -> &Place {
        &self.places[place]
    }

    pub fn transition(&self, transition: TransitionId) -> &Transition {
        &self.transitions[transition]
    }

    pub fn transition_mut(&mut self, transition: TransitionId) -> &mut Transition {
        &mut self.transitions[transition]
    }

    pub fn place_by_id(&self, id: &str) -> Option<PlaceId> {
        self.place_lookup.get(id).copied()
    }

    pub fn transition_by_id(&self, id: &str) -> Option<TransitionId> {
        self.transition_lookup.get(id).copied()
    }

    pub fn node_name(&self, node: NodeRef) -> &str {
        match node {
            NodeRef::Place(p) => &self.places[p].id,
            NodeRef::Transition(t) => &self.transitions[t].id,
        }
    }

    pub fn source_arcs(&self, node: NodeRef) -> &[ArcId] {
        match node {
            NodeRef::Place(p) => self.places[p].source_arcs(),
            NodeRef::Transition(t) => self.transitions[t].source_arcs(),
        }
    }

    pub fn target_arcs(&self, node: NodeRef) -> &[ArcId] {
        match node {
            NodeRef::Place(p) => self.places[p].target_arcs(),
            NodeRef::Transition(t) => self.transitions[t].target_arcs(),
        }
    }

    /// 沿出弧的直接后继，总是另一类节点.
    pub fn successors(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.source_arcs(node).iter().map(|arc| self.arcs[*arc].target)
    }

    pub fn predecessors(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        self.target_arcs(node).iter().map(|arc| self.arcs[*arc].source)
    }

    /// 迁移的输入库所.
    pub fn preset(&self, transition: TransitionId) -> impl Iterator<Item = PlaceId> + '_ {
        self.predecessors(transition.into())
            .filter_map(NodeRef::as_place)
    }

    /// 迁移的输出库所.
    pub fn postset(&self, transition: TransitionId) -> impl Iterator<Item = PlaceId> + '_ {
        self.successors(transition.into())
            .filter_map(NodeRef::as_place)
    }

    pub fn marking(&self) -> Marking {
        Marking(self.places.iter().map(|p| p.markers).collect())
    }

    pub fn apply_marking(&mut self, marking: &Marking) {
        debug_assert_eq!(marking.len(), self.places.len());
        for (place, tokens) in marking.iter() {
            self.places[place].markers = *tokens;
        }
    }

    /// 节点与弧相同，忽略托肯数.
    pub fn eq_except_marking(&self, other: &PetriNet) -> bool {
        self.places.len() == other.places.len()
            && self.places.iter().all(|place| {
                other
                    .place_by_id(&place.id)
                    .is_some_and(|idx| other.places[idx].eq_except_marking(place))
            })
            && self.same_transitions(other)
            && self.arc_keys() == other.arc_keys()
    }

    fn same_transitions(&self, other: &PetriNet) -> bool {
        self.transitions.len() == other.transitions.len()
            && self.transitions.iter().all(|transition| {
                other
                    .transition_by_id(&transition.id)
                    .is_some_and(|idx| other.transitions[idx] == *transition)
            })
    }

    fn arc_keys(&self) -> BTreeSet<(bool, &str, &str)> {
        self.arcs
            .iter()
            .map(|arc| {
                (
                    matches!(arc.source, NodeRef::Place(_)),
                    self.node_name(arc.source),
                    self.node_name(arc.target),
                )
            })
            .collect()
    }

    /// 重建按标识符的查找表.
    pub fn reindex(&mut self) {
        self.place_lookup = self
            .places
            .iter_enumerated()
            .map(|(idx, p)| (p.id.clone(), idx))
            .collect();
        self.transition_lookup = self
            .transitions
            .iter_enumerated()
            .map(|(idx, t)| (t.id.clone(), idx))
            .collect();
    }

    /// Directed-edge description of the net, one `A -> B;` line per arc.
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph \"{}\" {{", escape_label(&self.id));
        let _ = writeln!(&mut dot, "    rankdir=LR;");

        for (idx, place) in self.places.iter_enumerated() {
            let mut label = format!("{}\\nmarkers: {}", escape_label(&place.id), place.markers);
            if let Some(origin) = place.origin() {
                let _ = write!(&mut label, "\\ninner of {}", escape_label(origin));
            }
            let _ = writeln!(
                &mut dot,
                "    place_{} [label=\"{}\", shape=circle];",
                idx.index(),
                label
            );
        }

        for (idx, transition) in self.transitions.iter_enumerated() {
            let context = transition
                .context
                .as_ref()
                .map(|c| escape_label(&c.to_string()))
                .unwrap_or_else(|| "no context".to_owned());
            let _ = writeln!(
                &mut dot,
                "    trans_{} [label=\"{}\\n{}\", shape=box];",
                idx.index(),
                escape_label(&transition.id),
                context
            );
        }

        for arc in self.arcs.iter() {
            let _ = writeln!(
                &mut dot,
                "    {} -> {};",
                dot_node(arc.source),
                dot_node(arc.target)
            );
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_dot())
    }
}

impl PartialEq for PetriNet {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.places.len() == other.places.len()
            && self.places.iter().all(|place| {
                other
                    .place_by_id(&place.id)
                    .is_some_and(|idx| other.places[idx] == *place)
            })
            && self.same_transitions(other)
            && self.arc_keys() == other.arc_keys()
    }
}

impl fmt::Debug for PetriNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PetriNet")
            .field("id", &self.id)
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("arcs", &self.arcs)
            .finish()
    }
}

fn dot_node(node: NodeRef) -> String {
    match node {
        NodeRef::Place(p) => format!("place_{}", p.index()),
        NodeRef::Transition(t) => format!("trans_{}", t.index()),
    }
}

pub(crate) fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::structure::{Context, TransitionKind};

    fn chain() -> (PetriNet, PlaceId, TransitionId, PlaceId) {
        let mut net = PetriNet::new("chain");
        let p0 = net.add_place(Place::new("p0", 1));
        let p1 = net.add_place(Place::new("p1", 0));
        let t0 = net.add_transition(Transition::with_context(
            "t0",
            Context::new(TransitionKind::App),
        ));
        net.add_arc(p0, t0).unwrap();
        net.add_arc(t0, p1).unwrap();
        (net, p0, t0, p1)
    }

    #[test]
    fn arcs_between_same_variants_are_rejected() {
        let (mut net, p0, t0, p1) = chain();
        let err = net.add_arc(p0, p1).unwrap_err();
        assert!(matches!(err, NetError::InvalidTopology { .. }));

        let t1 = net.add_transition(Transition::new("t1"));
        assert!(matches!(
            net.add_arc(t0, t1),
            Err(NetError::InvalidTopology { .. })
        ));
        assert_eq!(net.arcs_len(), 2);
    }

    #[test]
    fn arcs_register_with_both_endpoints() {
        let (net, p0, t0, p1) = chain();
        assert_eq!(net.place(p0).source_arcs().len(), 1);
        assert_eq!(net.transition(t0).target_arcs().len(), 1);
        assert_eq!(net.transition(t0).source_arcs().len(), 1);
        assert_eq!(net.place(p1).target_arcs().len(), 1);
        assert_eq!(net.preset(t0).collect::<Vec<_>>(), vec![p0]);
        assert_eq!(net.postset(t0).collect::<Vec<_>>(), vec![p1]);
    }

    #[test]
    fn repointing_revalidates_and_reregisters() {
        let (mut net, p0, t0, p1) = chain();
        let arc = net.find_arc(p0.into(), t0.into()).unwrap();

        assert!(matches!(
            net.set_target(arc, p1),
            Err(NetError::InvalidTopology { .. })
        ));

        net.set_source(arc, p1).unwrap();
        assert!(net.place(p0).source_arcs().is_empty());
        assert_eq!(net.place(p1).source_arcs(), &[arc]);
        assert_eq!(net.arc(arc).source(), NodeRef::Place(p1));
    }

    #[test]
    fn deep_copy_is_equal_but_independent() {
        let (net, p0, _, _) = chain();
        let mut copy = net.deep_copy();
        assert_eq!(copy, net);

        copy.places[p0].markers = 7;
        assert_eq!(net.place(p0).markers, 1);
        assert_ne!(copy, net);
        assert!(copy.eq_except_marking(&net));
    }

    #[test]
    fn equality_tolerates_insertion_order() {
        let (net, _, _, _) = chain();
        let mut other = PetriNet::new("chain");
        let t0 = other.add_transition(Transition::with_context(
            "t0",
            Context::new(TransitionKind::App),
        ));
        let p1 = other.add_place(Place::new("p1", 0));
        let p0 = other.add_place(Place::new("p0", 1));
        other.add_arc(t0, p1).unwrap();
        other.add_arc(p0, t0).unwrap();

        assert_eq!(net, other);
    }

    #[test]
    fn dot_lists_every_arc() {
        let (net, _, _, _) = chain();
        let dot = net.to_dot();
        assert!(dot.contains("place_0 -> trans_0;"));
        assert!(dot.contains("trans_0 -> place_1;"));
        assert!(dot.contains("markers: 1"));
    }
}
