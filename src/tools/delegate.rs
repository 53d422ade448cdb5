//! 委派工具：把任务交给另一个 agent，并挂起等待它的回调
//!
//! 工具名、描述、目标地址来自配置（例如 evaluator_agent → 评估 agent 的收件箱）。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::{InvocationContext, WaitKind};
use crate::delegation::{delegation_request, Outbox};
use crate::memory::ToolUse;
use crate::tools::registry::{parse_args, schema_of};
use crate::tools::Tool;

#[derive(Deserialize, JsonSchema)]
struct DelegateArgs {
    /// The task or content to hand over to the other agent.
    content: String,
}

pub struct DelegateTool {
    name: String,
    description: String,
    destination: String,
    waiting_on: WaitKind,
    outbox: Arc<dyn Outbox>,
}

impl DelegateTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        destination: impl Into<String>,
        outbox: Arc<dyn Outbox>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            destination: destination.into(),
            waiting_on: WaitKind::Delegation,
            outbox,
        }
    }

    /// 评估类委派（记录为 Evaluation 等待）
    pub fn evaluation(mut self) -> Self {
        self.waiting_on = WaitKind::Evaluation;
        self
    }
}

#[async_trait]
impl Tool for DelegateTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<DelegateArgs>()
    }

    async fn execute(&self, call: &ToolUse, ctx: &mut InvocationContext) -> Result<String, String> {
        let args: DelegateArgs = parse_args(call)?;
        let message = delegation_request(ctx, &call.tool_use_id, &self.name, args.content);
        self.outbox
            .send(&self.destination, &message)
            .await
            .map_err(|e| e.to_string())?;
        tracing::info!(
            "Delegated {} to {} for session {}",
            call.tool_use_id,
            self.destination,
            ctx.session_id()
        );
        ctx.request_suspend(call.tool_use_id.clone(), self.waiting_on);
        Ok(format!(
            "Requested {} and waiting for response",
            self.name
        ))
    }
}
