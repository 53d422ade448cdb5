//! 结果回报工具：被委派的 agent 用它把结果交还委派方
//!
//! 向 parent.callback_address 发 Existing 回调（tool_use_id = parent.tool_use_id），
//! 然后结束本次推理；本 agent 的会话随之进入 DONE。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::InvocationContext;
use crate::delegation::{completion_callback, Outbox};
use crate::memory::{ToolStatus, ToolUse};
use crate::tools::registry::{parse_args, schema_of};
use crate::tools::Tool;

pub const DEFAULT_REPORT_TOOL: &str = "report_result";

#[derive(Deserialize, JsonSchema)]
struct ReportArgs {
    /// Result to hand back to the agent that requested this task.
    result: String,
}

pub struct ReportTool {
    name: String,
    outbox: Arc<dyn Outbox>,
}

impl ReportTool {
    pub fn new(name: impl Into<String>, outbox: Arc<dyn Outbox>) -> Self {
        Self {
            name: name.into(),
            outbox,
        }
    }
}

#[async_trait]
impl Tool for ReportTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Report back the results to the agent that requested this task"
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<ReportArgs>()
    }

    async fn execute(&self, call: &ToolUse, ctx: &mut InvocationContext) -> Result<String, String> {
        let args: ReportArgs = parse_args(call)?;
        let parent = ctx
            .parent()
            .ok_or_else(|| "No requester to report to: this session has no parent".to_string())?;
        let out = completion_callback(parent, ToolStatus::Success, args.result);
        self.outbox
            .send(&out.destination, &out.message)
            .await
            .map_err(|e| e.to_string())?;
        tracing::info!(
            "Reported result for {} to {}",
            parent.tool_use_id,
            out.destination
        );
        ctx.request_handoff();
        Ok("Reported results to the requester".to_string())
    }
}
