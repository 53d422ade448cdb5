//! 工具调用 JSON Schema 生成（schemars）
//!
//! 拼入 system prompt，约束 LLM 输出 `{"tool": "...", "args": {...}}`。

use schemars::{schema_for, JsonSchema};

/// 工具调用格式（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，如 echo、human_approval、evaluator_agent
    pub tool: String,
    /// 工具参数，按各工具的 parameters schema 填写
    pub args: serde_json::Value,
    /// 可选：调用前的简短思考，会随工具调用一起保存到历史
    pub thought: Option<String>,
}

pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
