//! 库所、迁移与弧的强类型下标，以及指向任一节点的 `NodeRef`.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::index_vec::Idx;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl Idx for $name {
            fn index(self) -> usize {
                self.0 as usize
            }

            fn from_usize(idx: usize) -> Self {
                Self(idx as u32)
            }
        }
    };
}

define_id!(PlaceId, "p");
define_id!(TransitionId, "t");
define_id!(ArcId, "a");

/// 二部图中任一类节点的引用.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    Place(PlaceId),
    Transition(TransitionId),
}

impl NodeRef {
    /// 弧只能连接库所与迁移.
    pub fn is_complement_of(self, other: NodeRef) -> bool {
        !self.same_kind(other)
    }

    pub fn same_kind(self, other: NodeRef) -> bool {
        matches!(
            (self, other),
            (NodeRef::Place(_), NodeRef::Place(_))
                | (NodeRef::Transition(_), NodeRef::Transition(_))
        )
    }

    pub fn as_place(self) -> Option<PlaceId> {
        match self {
            NodeRef::Place(place) => Some(place),
            NodeRef::Transition(_) => None,
        }
    }

    pub fn as_transition(self) -> Option<TransitionId> {
        match self {
            NodeRef::Transition(transition) => Some(transition),
            NodeRef::Place(_) => None,
        }
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Place(place) => place.fmt(f),
            NodeRef::Transition(transition) => transition.fmt(f),
        }
    }
}

impl From<PlaceId> for NodeRef {
    fn from(value: PlaceId) -> Self {
        NodeRef::Place(value)
    }
}

impl From<TransitionId> for NodeRef {
    fn from(value: TransitionId) -> Self {
        NodeRef::Transition(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complement_requires_opposite_variants() {
        let p = NodeRef::Place(PlaceId::new(0));
        let q = NodeRef::Place(PlaceId::new(1));
        let t = NodeRef::Transition(TransitionId::new(0));

        assert!(p.is_complement_of(t));
        assert!(t.is_complement_of(p));
        assert!(!p.is_complement_of(q));
        assert!(!t.is_complement_of(t));
    }

    #[test]
    fn debug_uses_short_prefix() {
        assert_eq!(format!("{:?}", NodeRef::from(TransitionId::new(3))), "t3");
        assert_eq!(format!("{:?}", ArcId::new(7)), "a7");
    }
}
