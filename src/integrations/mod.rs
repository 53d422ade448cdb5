//! 外部集成：人工决定桥（HTTP 路由需 feature = "approval"）

pub mod decision;

#[cfg(feature = "approval")]
pub mod approval;

pub use decision::{decision_task, Decision};
