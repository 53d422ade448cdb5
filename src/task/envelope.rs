//! 任务信封
//!
//! 入站 / 出站任务消息的线上格式（TaskMessage）与校验后的强类型信封（TaskEnvelope）。
//! 线上格式：`{type: "new"|"existing", body, session_id?, parent?, toolName?}`。
//! 委派请求与完成回调复用同一格式，只是投递到不同的地址。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::ValidationError;
use crate::memory::ToolResult;

/// 会话 ID：一经分配不可变，沿整条委派链原样传递
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 生成全局唯一的新会话 ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// 委派方记录：谁委派了任务、完成后回报到哪里、回报解决的是哪一次工具调用
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRecord {
    pub agent_name: String,
    pub session_id: SessionId,
    #[serde(alias = "callback_sqs")]
    pub callback_address: String,
    pub tool_use_id: String,
    /// 委派方调用的工具名；回调时写入 toolName
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

/// New 任务的 body：`{"task": "..."}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaskBody {
    pub task: String,
}

/// 线上任务消息（入站与出站同形）
///
/// 字段保持宽松（均为可选 / 原始 JSON），校验在转换为 TaskEnvelope 时完成。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRecord>,
    #[serde(rename = "toolName", default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl TaskMessage {
    /// 类型标签的字符串形式；缺失或非字符串时为 None
    pub fn kind_str(&self) -> Option<&str> {
        self.kind.as_ref().and_then(|v| v.as_str())
    }
}

/// 校验后的任务信封：两种变体，构造即校验
#[derive(Clone, Debug, PartialEq)]
pub enum TaskEnvelope {
    /// 新任务：task 为非空文本，parent 存在时复用其 session_id
    New {
        task: String,
        parent: Option<ParentRecord>,
    },
    /// 已有会话的恢复：携带一个或多个工具结果
    Existing {
        session_id: SessionId,
        tool_results: Vec<ToolResult>,
        tool_name: Option<String>,
        parent: Option<ParentRecord>,
    },
}

impl TaskEnvelope {
    pub fn parent(&self) -> Option<&ParentRecord> {
        match self {
            TaskEnvelope::New { parent, .. } | TaskEnvelope::Existing { parent, .. } => {
                parent.as_ref()
            }
        }
    }

    /// 校验 New 任务的字段
    pub fn new_from_message(msg: TaskMessage) -> Result<Self, ValidationError> {
        let body = msg.body.ok_or(ValidationError::MissingBody)?;
        if body.is_null() {
            return Err(ValidationError::MissingBody);
        }
        let task = body
            .get("task")
            .and_then(|t| t.as_str())
            .filter(|t| !t.trim().is_empty())
            .ok_or(ValidationError::MissingTask)?
            .to_string();
        if let Some(p) = &msg.parent {
            if p.session_id.as_str().is_empty() {
                return Err(ValidationError::MissingParentSessionId);
            }
        }
        Ok(TaskEnvelope::New {
            task,
            parent: msg.parent,
        })
    }

    /// 校验 Existing 任务的字段；body 可为数组或单个 toolResult 块
    pub fn existing_from_message(msg: TaskMessage) -> Result<Self, ValidationError> {
        let session_id = msg
            .session_id
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingSessionId)?;
        let body = msg.body.ok_or(ValidationError::MissingBody)?;
        let tool_results = parse_tool_results(body)?;
        Ok(TaskEnvelope::Existing {
            session_id: SessionId::new(session_id),
            tool_results,
            tool_name: msg.tool_name,
            parent: msg.parent,
        })
    }
}

/// body 的两种形态：`[{"toolResult": ..}, ..]` 或 `{"toolResult": ..}`
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<ToolResultBlock>),
    One(ToolResultBlock),
}

#[derive(Deserialize, Serialize)]
struct ToolResultBlock {
    #[serde(rename = "toolResult")]
    tool_result: ToolResult,
}

fn parse_tool_results(body: serde_json::Value) -> Result<Vec<ToolResult>, ValidationError> {
    if body.is_null() {
        return Err(ValidationError::MissingBody);
    }
    let parsed: OneOrMany = serde_json::from_value(body)
        .map_err(|e| ValidationError::InvalidToolResults(e.to_string()))?;
    let results: Vec<ToolResult> = match parsed {
        OneOrMany::Many(v) => v.into_iter().map(|b| b.tool_result).collect(),
        OneOrMany::One(b) => vec![b.tool_result],
    };
    if results.is_empty() {
        return Err(ValidationError::InvalidToolResults(
            "at least one tool result is required".to_string(),
        ));
    }
    Ok(results)
}

impl From<TaskEnvelope> for TaskMessage {
    fn from(env: TaskEnvelope) -> Self {
        match env {
            TaskEnvelope::New { task, parent } => TaskMessage {
                kind: Some(serde_json::json!("new")),
                body: serde_json::to_value(NewTaskBody { task }).ok(),
                session_id: None,
                parent,
                tool_name: None,
            },
            TaskEnvelope::Existing {
                session_id,
                tool_results,
                tool_name,
                parent,
            } => {
                let blocks: Vec<ToolResultBlock> = tool_results
                    .into_iter()
                    .map(|tool_result| ToolResultBlock { tool_result })
                    .collect();
                TaskMessage {
                    kind: Some(serde_json::json!("existing")),
                    body: serde_json::to_value(blocks).ok(),
                    session_id: Some(session_id.to_string()),
                    parent,
                    tool_name,
                }
            }
        }
    }
}
