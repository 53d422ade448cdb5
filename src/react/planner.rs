//! Planner：向 LLM 要下一步，并把回复分成工具调用或最终回复
//!
//! LLM 以 `{"tool": "...", "args": {...}, "thought": "..."}` 表达工具调用，
//! 可以裹在 ```json 围栏里，也可以夹在说明文字中间；不是工具调用的文本即视为最终回复。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{Message, ToolUse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
    #[serde(default)]
    pub thought: Option<String>,
}

impl ToolCall {
    /// 分配 tool_use_id，得到写入历史的 assistant 消息与待执行的调用
    pub fn into_tool_use(self) -> (Message, ToolUse) {
        let call = ToolUse::new(self.tool, self.args);
        (Message::tool_use(self.thought, call.clone()), call)
    }
}

#[derive(Debug, Clone)]
pub enum PlannerOutput {
    Response(String),
    ToolCall(ToolCall),
}

/// ```json 围栏中的内容
fn fenced_json(text: &str) -> Option<&str> {
    let start = text.find("```json")?;
    let body = &text[start + "```json".len()..];
    Some(match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    })
}

/// 第一个 `{` 到最后一个 `}`
fn inline_json(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let close = text.rfind('}')?;
    (open < close).then(|| &text[open..=close])
}

fn into_output(call: ToolCall, text: &str) -> PlannerOutput {
    if call.tool.trim().is_empty() {
        PlannerOutput::Response(text.to_string())
    } else {
        PlannerOutput::ToolCall(call)
    }
}

/// 解析 LLM 输出
///
/// ```json 围栏里的内容必须是合法的工具调用，否则返回 JsonParseError，由工具循环提示 LLM 重试。
/// 没有围栏时，只有带字符串 `tool` 键的 JSON 对象才算工具调用；
/// 其余文本（包括正文里的花括号）都是最终回复。`tool` 为空也按回复处理。
pub fn parse_llm_output(output: &str) -> Result<PlannerOutput, AgentError> {
    let text = output.trim();

    if let Some(fenced) = fenced_json(text) {
        let call: ToolCall = serde_json::from_str(fenced)
            .map_err(|e| AgentError::JsonParseError(format!("{}: {}", e, fenced)))?;
        return Ok(into_output(call, text));
    }

    let Some(candidate) = inline_json(text) else {
        return Ok(PlannerOutput::Response(text.to_string()));
    };
    let value: serde_json::Value = match serde_json::from_str(candidate) {
        Ok(v) => v,
        Err(_) => return Ok(PlannerOutput::Response(text.to_string())),
    };
    if !value.get("tool").is_some_and(|t| t.is_string()) {
        return Ok(PlannerOutput::Response(text.to_string()));
    }
    let call: ToolCall = serde_json::from_value(value)
        .map_err(|e| AgentError::JsonParseError(format!("{}: {}", e, candidate)))?;
    Ok(into_output(call, text))
}

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub async fn plan(&self, history: &[Message]) -> Result<PlannerOutput, AgentError> {
        let output = self
            .llm
            .complete(&self.system_prompt, history)
            .await
            .map_err(AgentError::LlmError)?;
        tracing::debug!(
            "LLM replied ({} chars), tokens so far: {:?}",
            output.len(),
            self.llm.token_usage()
        );
        parse_llm_output(&output).map_err(|e| match e {
            AgentError::JsonParseError(detail) => AgentError::InvalidToolCall { output, detail },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::memory::ContentBlock;

    #[test]
    fn test_plain_text_is_response() {
        match parse_llm_output("  All done.\n").unwrap() {
            PlannerOutput::Response(r) => assert_eq!(r, "All done."),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_fenced_tool_call_with_preamble() {
        let out = "Sending for review\n```json\n{\"tool\": \"evaluator_agent\", \"args\": {\"content\": \"post\"}}\n```";
        match parse_llm_output(out).unwrap() {
            PlannerOutput::ToolCall(tc) => {
                assert_eq!(tc.tool, "evaluator_agent");
                assert_eq!(tc.args["content"], "post");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_empty_tool_name_is_response() {
        assert!(matches!(
            parse_llm_output(r#"{"tool": "", "args": {}}"#).unwrap(),
            PlannerOutput::Response(_)
        ));
    }

    #[test]
    fn test_into_tool_use_keeps_thought_and_id() {
        let tc = ToolCall {
            tool: "human_approval".into(),
            args: serde_json::json!({"content": "post"}),
            thought: Some("needs sign-off".into()),
        };
        let (msg, call) = tc.into_tool_use();
        assert!(!call.tool_use_id.is_empty());
        assert_eq!(msg.tool_uses().next().map(|u| &u.tool_use_id), Some(&call.tool_use_id));
        assert!(matches!(&msg.content[0], ContentBlock::Text(t) if t == "needs sign-off"));
    }

    #[test]
    fn test_prose_with_braces_is_response() {
        let out = "Post ready: Rent a rainbow unicorn {limited offer}!";
        match parse_llm_output(out).unwrap() {
            PlannerOutput::Response(r) => assert_eq!(r, out),
            other => panic!("unexpected: {other:?}"),
        }
        // 合法 JSON 但没有 tool 键，同样是回复
        assert!(matches!(
            parse_llm_output(r#"Summary: {"likes": 3}"#).unwrap(),
            PlannerOutput::Response(_)
        ));
    }

    #[test]
    fn test_inline_tool_call_without_fence() {
        let out = r#"Asking first {"tool": "human_approval", "args": {"content": "post"}}"#;
        match parse_llm_output(out).unwrap() {
            PlannerOutput::ToolCall(tc) => assert_eq!(tc.tool, "human_approval"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_broken_fenced_json_surfaces_raw_output() {
        let raw = "```json\n{tool: nope}\n```";
        let planner = Planner::new(Arc::new(MockLlmClient::scripted(vec![raw])), "system");
        match planner.plan(&[Message::user("hi")]).await {
            Err(AgentError::InvalidToolCall { output, .. }) => assert_eq!(output, raw),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
