//! Hive - 异步多智能体会话续接与委派协议
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、调用上下文、挂起状态机、调用 harness、构建器
//! - **delegation**: 委派请求 / 完成回调与按地址投递的出站通道
//! - **integrations**: 人工决定桥（HTTP 路由需 `approval` feature）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 对话消息模型与按 (session, agent) 划分的会话存储
//! - **react**: 推理引擎边界、Planner、工具循环
//! - **session**: New / Existing 任务到 (历史, prompt) 的续接
//! - **task**: 任务消息格式、校验后的信封与分发
//! - **tools**: 工具注册表、执行器与协议工具（审批 / 委派 / 回报）

pub mod config;
pub mod core;
pub mod delegation;
pub mod integrations;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod session;
pub mod task;
pub mod tools;

pub use crate::core::{AgentBuilder, InvocationHarness, InvocationOutcome};
