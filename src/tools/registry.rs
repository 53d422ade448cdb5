//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / execute），由 ToolRegistry 按名注册与查找。
//! execute 拿到本次调用的 InvocationContext：发起外部异步动作的工具在这里请求挂起。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::InvocationContext;
use crate::memory::ToolUse;

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（用于 JSON 中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认不限参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行工具；Ok 为结果文本，Err 为失败原因（由执行器转为失败的 ToolResult）
    async fn execute(&self, call: &ToolUse, ctx: &mut InvocationContext) -> Result<String, String>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// 已注册工具名（排序后）
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// 工具 schema JSON，拼入 system prompt
    pub fn to_schema_json(&self) -> String {
        let mut tools: Vec<(&String, &Arc<dyn Tool>)> = self.tools.iter().collect();
        tools.sort_by(|a, b| a.0.cmp(b.0));
        let tools: Vec<Value> = tools
            .into_iter()
            .map(|(name, tool)| {
                serde_json::json!({
                    "name": name,
                    "description": tool.description(),
                    "parameters": tool.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }
}

/// 用 schemars 为参数结构体生成 schema
pub fn schema_of<T: schemars::JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null)
}

/// 把 ToolUse.input 反序列化为参数结构体
pub fn parse_args<T: serde::de::DeserializeOwned>(call: &ToolUse) -> Result<T, String> {
    serde_json::from_value(call.input.clone())
        .map_err(|e| format!("Invalid arguments for {}: {}", call.name, e))
}
