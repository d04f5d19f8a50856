//! 应用数据流路由的使用控制策略验证.
//!
//! 路由树被翻译成 Petri 网，穷举其可达步图与路径，再在路径集上对由策略规则
//! 生成的时序公式求值。

pub mod analysis;
pub mod config;
pub mod formula;
pub mod net;
pub mod options;
pub mod policy;
pub mod report;
pub mod route;
pub mod verify;

pub use config::VerifierConfig;
pub use report::{Outcome, VerificationReport};
pub use verify::{VerificationRequest, Verifier};
