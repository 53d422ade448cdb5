//! 对话消息模型
//!
//! Message 的 content 为内容块数组：纯文本、Agent 发起的工具调用（toolUse）、
//! 外部返回的工具结果（toolResult）。序列化格式与任务消息中的 body 一致，
//! 因此恢复时可以把入站的 tool-result 块原样作为一条 user 消息追加。

use serde::{Deserialize, Serialize};

/// 消息角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// 工具执行状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// 工具结果中的文本片段：`{"text": "..."}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultText {
    pub text: String,
}

/// 工具结果：tool_use_id 指向被解决的那一次工具调用
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    #[serde(rename = "toolUseId")]
    pub tool_use_id: String,
    pub status: ToolStatus,
    #[serde(default)]
    pub content: Vec<ResultText>,
}

impl ToolResult {
    pub fn success(tool_use_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            status: ToolStatus::Success,
            content: vec![ResultText { text: text.into() }],
        }
    }

    pub fn error(tool_use_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            status: ToolStatus::Error,
            content: vec![ResultText { text: text.into() }],
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// 拼接全部文本片段
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Agent 发起的一次工具调用
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    #[serde(rename = "toolUseId")]
    pub tool_use_id: String,
    pub name: String,
    #[serde(default)]
    pub input: serde_json::Value,
}

impl ToolUse {
    /// 生成新的 tool_use_id
    pub fn new(name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            tool_use_id: format!("tooluse_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            input,
        }
    }
}

/// 内容块，外部标签格式：`{"text": ..}` / `{"toolUse": {..}}` / `{"toolResult": {..}}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentBlock {
    Text(String),
    ToolUse(ToolUse),
    ToolResult(ToolResult),
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text(content.into())],
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::Text(content.into())],
        }
    }

    /// 由工具结果组成的 user 消息（恢复时追加的那一条）
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: Role::User,
            content: results.into_iter().map(ContentBlock::ToolResult).collect(),
        }
    }

    /// assistant 发起工具调用，可附带一段思考文本
    pub fn tool_use(thought: Option<String>, tool_use: ToolUse) -> Self {
        let mut content = Vec::with_capacity(2);
        if let Some(t) = thought.filter(|t| !t.trim().is_empty()) {
            content.push(ContentBlock::Text(t));
        }
        content.push(ContentBlock::ToolUse(tool_use));
        Self {
            role: Role::Assistant,
            content,
        }
    }

    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUse> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolUse(t) => Some(t),
            _ => None,
        })
    }

    pub fn tool_result_blocks(&self) -> impl Iterator<Item = &ToolResult> {
        self.content.iter().filter_map(|b| match b {
            ContentBlock::ToolResult(r) => Some(r),
            _ => None,
        })
    }

    /// 渲染为纯文本，供只接受文本的 LLM 后端使用
    pub fn render_text(&self) -> String {
        self.content
            .iter()
            .map(|b| match b {
                ContentBlock::Text(t) => t.clone(),
                ContentBlock::ToolUse(t) => serde_json::json!({
                    "tool": t.name,
                    "args": t.input,
                })
                .to_string(),
                ContentBlock::ToolResult(r) => {
                    let status = match r.status {
                        ToolStatus::Success => "success",
                        ToolStatus::Error => "error",
                    };
                    format!("Tool result [{}] ({}): {}", r.tool_use_id, status, r.text())
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
