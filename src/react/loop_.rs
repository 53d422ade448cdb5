//! 工具循环推理引擎
//!
//! Plan -> Act (Tool) -> Observe -> 下一轮 Plan，直到 LLM 给出最终回复或达到最大步数。
//! 每次工具调用后检查上下文：出现停止信号（挂起或交还）立即结束，不再继续推理。
//! 挂起时历史的最后两条是 assistant 的 toolUse 与该调用的临时结果；恢复时后者会被真正的结果替换。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{AgentError, InvocationContext};
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::react::planner::{Planner, PlannerOutput};
use crate::react::ReasoningEngine;
use crate::tools::{tool_call_schema_json, ToolExecutor};

/// 单次调用内默认最大推理步数，防止死循环
pub const DEFAULT_MAX_STEPS: usize = 20;

pub struct ToolLoopEngine {
    planner: Planner,
    executor: ToolExecutor,
    max_steps: usize,
}

impl ToolLoopEngine {
    /// system prompt 由基础 prompt、可用工具 schema 与调用格式拼成
    pub fn new(
        llm: Arc<dyn LlmClient>,
        base_prompt: &str,
        executor: ToolExecutor,
        max_steps: usize,
    ) -> Self {
        let system = format!(
            "{}\n\n## Available tools\n{}\n\n## Tool call format\nTo call a tool, reply with a single JSON object matching:\n{}\nOtherwise reply with plain text.",
            base_prompt,
            executor.registry().to_schema_json(),
            tool_call_schema_json()
        );
        Self {
            planner: Planner::new(llm, system),
            executor,
            max_steps: max_steps.max(1),
        }
    }

    pub fn system_prompt(&self) -> &str {
        self.planner.system_prompt()
    }
}

#[async_trait]
impl ReasoningEngine for ToolLoopEngine {
    async fn run(
        &self,
        mut history: Vec<Message>,
        prompt: &str,
        ctx: &mut InvocationContext,
    ) -> Result<Vec<Message>, AgentError> {
        history.push(Message::user(prompt));

        for step in 0..self.max_steps {
            match self.planner.plan(&history).await {
                Ok(PlannerOutput::Response(text)) => {
                    tracing::info!("Agent finished after {} step(s)", step + 1);
                    history.push(Message::assistant(text));
                    return Ok(history);
                }
                Ok(PlannerOutput::ToolCall(tc)) => {
                    let (request, call) = tc.into_tool_use();
                    tracing::info!("Step {}: calling tool {} ({})", step, call.name, call.tool_use_id);
                    history.push(request);
                    let result = self.executor.execute(&call, ctx).await;
                    history.push(Message::tool_results(vec![result]));
                    if ctx.should_stop() {
                        tracing::info!("Tool {} requested stop, ending reasoning", call.name);
                        return Ok(history);
                    }
                }
                Err(AgentError::InvalidToolCall { output, detail }) => {
                    tracing::warn!("Could not parse LLM output: {}", detail);
                    history.push(Message::assistant(output));
                    history.push(Message::user(
                        "Your last reply was not valid. Reply with plain text or exactly one JSON tool call.",
                    ));
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!("Reached max steps ({}), stopping", self.max_steps);
        Ok(history)
    }
}
