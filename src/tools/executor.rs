//! 工具执行器
//!
//! 持有 ToolRegistry 与全局超时。失败、超时与未知工具都不向上抛错，
//! 而是转成 status=error 的 ToolResult 交还推理引擎，由它决定如何继续。
//! 每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::InvocationContext;
use crate::memory::{ToolResult, ToolUse};
use crate::tools::ToolRegistry;

pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_timeout(registry: ToolRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// 执行一次工具调用，结果总是一个 ToolResult
    pub async fn execute(&self, call: &ToolUse, ctx: &mut InvocationContext) -> ToolResult {
        let start = Instant::now();
        let (result, outcome) = match self.registry.get(&call.name) {
            None => (Err(format!("Unknown tool: {}", call.name)), "unknown"),
            Some(tool) => match timeout(self.timeout, tool.execute(call, ctx)).await {
                Ok(Ok(text)) => (Ok(text), "ok"),
                Ok(Err(e)) => (Err(e), "error"),
                Err(_) => (
                    Err(format!("Tool {} timed out after {:?}", call.name, self.timeout)),
                    "timeout",
                ),
            },
        };

        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": call.name,
            "tool_use_id": call.tool_use_id,
            "session_id": ctx.session_id().as_str(),
            "ok": result.is_ok(),
            "outcome": outcome,
            "suspend_requested": ctx.is_suspend_requested(),
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&call.input),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(text) => ToolResult::success(call.tool_use_id.clone(), text),
            Err(e) => {
                tracing::warn!("Tool {} failed: {}", call.name, e);
                ToolResult::error(call.tool_use_id.clone(), e)
            }
        }
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
