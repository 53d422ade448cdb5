//! Echo 工具（测试用，立即返回，不挂起）

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::InvocationContext;
use crate::memory::ToolUse;
use crate::tools::registry::{parse_args, schema_of};
use crate::tools::Tool;

#[derive(Deserialize, JsonSchema)]
struct EchoArgs {
    /// 要回显的文本
    #[serde(default)]
    text: Option<String>,
}

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo text (for testing). Args: {\"text\": \"message\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<EchoArgs>()
    }

    async fn execute(&self, call: &ToolUse, _ctx: &mut InvocationContext) -> Result<String, String> {
        let args: EchoArgs = parse_args(call)?;
        Ok(args.text.unwrap_or_else(|| "(empty)".to_string()))
    }
}
