//! # 路由 Petri 网（二分图模型）
//!
//! 库所集合 `P` 与迁移集合 `T` 以存储区方式保存，弧只记录端点下标：
//!
//! * 弧只能连接 `P × T` 或 `T × P`，同类节点之间建弧返回
//!   [`NetError::InvalidTopology`]；
//! * 每条弧同时登记在源节点的输出弧表与目标节点的输入弧表中，重新指向端点时
//!   重新校验并重新登记；
//! * 库所持有非负标记数，迁移持有读/写/擦除上下文 [`Context`]；
//! * 网的克隆即深拷贝，标识符保持不变，弧指向克隆后的节点。
//!
//! ## 示例
//!
//! ```rust
//! use ids_route_verifier::net::*;
//!
//! let mut net = PetriNet::new("demo");
//! let p0 = net.add_place(Place::new("p0", 1));
//! let p1 = net.add_place(Place::new("p1", 0));
//! let t0 = net.add_transition(Transition::with_context("t0", Context::new(TransitionKind::App)));
//!
//! net.add_arc(p0, t0).unwrap();
//! net.add_arc(t0, p1).unwrap();
//! assert!(net.add_arc(p0, p1).is_err());
//!
//! let copy = net.deep_copy();
//! assert_eq!(copy, net);
//! ```

pub mod core;
pub mod ids;
pub mod index_vec;
pub mod io;
pub mod structure;

pub use core::{NetError, PetriNet};
pub use ids::{ArcId, NodeRef, PlaceId, TransitionId};
pub use index_vec::{Idx, IndexVec};
pub use structure::{Arc, Context, Marking, Place, PlaceKind, Transition, TransitionKind, Weight};
