//! 推理引擎边界
//!
//! harness 只依赖这个 trait：给定历史与 prompt，返回更新后的历史；
//! session_id、委派方与停止信号经由 InvocationContext 传入传出，工具也写同一个上下文。

use async_trait::async_trait;

use crate::core::{AgentError, InvocationContext};
use crate::memory::Message;

#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// 运行推理直到给出最终回复，或上下文中出现停止信号
    async fn run(
        &self,
        history: Vec<Message>,
        prompt: &str,
        ctx: &mut InvocationContext,
    ) -> Result<Vec<Message>, AgentError>;
}
