//! 路由网的执行语义：发生规则、可达步图、路径枚举与展开.
use thiserror::Error;

use crate::net::NetError;

pub mod firing;
pub mod paths;
pub mod reachability;
pub mod unfolding;

pub use firing::FireError;
pub use paths::{NetPath, PathSet};
pub use reachability::{NetArc, Step, StepGraph, StepGraphConfig};
pub use unfolding::{parallel_sets, unfold};

#[derive(Debug, Error)]
pub enum SimulationError {
    /// 探索达到配置的步数上限，结论不确定.
    #[error("state space exceeds {limit} steps ({explored} explored)")]
    StateSpaceUnbounded { limit: usize, explored: usize },
    #[error("path enumeration exceeds {limit} paths")]
    PathSpaceExceeded { limit: usize },
    #[error(transparent)]
    Net(#[from] NetError),
    #[error(transparent)]
    Fire(#[from] FireError),
}
