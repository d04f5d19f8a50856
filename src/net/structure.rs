//! 网的静态结构元素：库所、迁移、上下文、弧与标识.
use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::ids::{ArcId, NodeRef, PlaceId};
use crate::net::index_vec::IndexVec;

pub type Weight = u64;

/// 节点登记的弧列表。路由网很稀疏，多数节点只有几条弧.
pub type ArcList = SmallVec<[ArcId; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaceKind {
    Plain,
    /// 展开时产生，`origin` 为被拆分迁移的标识符.
    Inner { origin: String },
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub markers: Weight,
    pub kind: PlaceKind,
    pub(crate) incoming: ArcList,
    pub(crate) outgoing: ArcList,
}

impl Place {
    pub fn new(id: impl Into<String>, markers: Weight) -> Self {
        Self {
            id: id.into(),
            markers,
            kind: PlaceKind::Plain,
            incoming: ArcList::new(),
            outgoing: ArcList::new(),
        }
    }

    pub fn new_inner(id: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            kind: PlaceKind::Inner {
                origin: origin.into(),
            },
            ..Self::new(id, 0)
        }
    }

    /// 以该库所为终点的弧.
    pub fn target_arcs(&self) -> &[ArcId] {
        &self.incoming
    }

    /// 以该库所为起点的弧.
    pub fn source_arcs(&self) -> &[ArcId] {
        &self.outgoing
    }

    pub fn is_inner(&self) -> bool {
        matches!(self.kind, PlaceKind::Inner { .. })
    }

    pub fn origin(&self) -> Option<&str> {
        match &self.kind {
            PlaceKind::Inner { origin } => Some(origin),
            PlaceKind::Plain => None,
        }
    }

    pub fn eq_except_marking(&self, other: &Place) -> bool {
        self.id == other.id && self.kind == other.kind
    }

    /// 不带弧登记的副本，用于在另一个网中重建.
    pub(crate) fn detached(&self) -> Self {
        Self {
            id: self.id.clone(),
            markers: self.markers,
            kind: self.kind.clone(),
            incoming: ArcList::new(),
            outgoing: ArcList::new(),
        }
    }
}

impl PartialEq for Place {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.markers == other.markers
    }
}

impl Eq for Place {}

impl fmt::Debug for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Place");
        s.field("id", &self.id).field("markers", &self.markers);
        if let Some(origin) = self.origin() {
            s.field("origin", &origin);
        }
        s.finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionKind {
    /// 数据处理步骤：会被展开，并推断擦除集.
    #[default]
    App,
    /// 结构性步骤：原样转发数据来源.
    Control,
}

/// 迁移上的数据上下文（读/写/擦除集与标签）.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub tags: BTreeSet<String>,
    pub read: BTreeSet<String>,
    pub write: BTreeSet<String>,
    pub erase: BTreeSet<String>,
    pub kind: TransitionKind,
}

impl Context {
    pub fn new(kind: TransitionKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn reads(&self, resource: &str) -> bool {
        self.read.contains(resource)
    }

    pub fn writes(&self, resource: &str) -> bool {
        self.write.contains(resource)
    }

    pub fn erases(&self, resource: &str) -> bool {
        self.erase.contains(resource)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} tags=[{}] read=[{}] write=[{}] erase=[{}]",
            self.kind,
            self.tags.iter().join(","),
            self.read.iter().join(","),
            self.write.iter().join(","),
            self.erase.iter().join(",")
        )
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    /// 仅在网组装过程中为 `None`.
    pub context: Option<Context>,
    pub(crate) incoming: ArcList,
    pub(crate) outgoing: ArcList,
}

impl Transition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context: None,
            incoming: ArcList::new(),
            outgoing: ArcList::new(),
        }
    }

    pub fn with_context(id: impl Into<String>, context: Context) -> Self {
        Self {
            context: Some(context),
            ..Self::new(id)
        }
    }

    pub fn target_arcs(&self) -> &[ArcId] {
        &self.incoming
    }

    pub fn source_arcs(&self) -> &[ArcId] {
        &self.outgoing
    }

    pub fn kind(&self) -> TransitionKind {
        self.context.as_ref().map(|c| c.kind).unwrap_or_default()
    }

    pub fn context_or_default(&mut self) -> &mut Context {
        self.context.get_or_insert_with(Context::default)
    }

    pub(crate) fn detached(&self) -> Self {
        Self {
            id: self.id.clone(),
            context: self.context.clone(),
            incoming: ArcList::new(),
            outgoing: ArcList::new(),
        }
    }
}

impl PartialEq for Transition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.context == other.context
    }
}

impl Eq for Transition {}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition").field(&self.id).finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arc {
    pub(crate) source: NodeRef,
    pub(crate) target: NodeRef,
}

impl Arc {
    pub fn source(&self) -> NodeRef {
        self.source
    }

    pub fn target(&self) -> NodeRef {
        self.target
    }
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -> {:?}", self.source, self.target)
    }
}

/// 按库所顺序记录的各库所托肯数.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marking(pub IndexVec<PlaceId, Weight>);

impl Marking {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self, place: PlaceId) -> Weight {
        self.0[place]
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, &Weight)> {
        self.0.iter_enumerated()
    }

    pub fn total(&self) -> Weight {
        self.0.iter().sum()
    }

    pub fn marked_places(&self) -> impl Iterator<Item = PlaceId> + '_ {
        self.iter()
            .filter(|(_, tokens)| **tokens > 0)
            .map(|(place, _)| place)
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, tokens) in self.iter().filter(|(_, t)| **t > 0) {
            map.entry(&place, tokens);
        }
        map.finish()
    }
}
