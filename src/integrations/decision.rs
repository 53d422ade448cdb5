//! 人工决定 → Existing 任务
//!
//! 决定以单个 ToolResult 的形式送回挂起的 agent：status = success，content = [{text: decision}]，
//! toolName 固定为 human_approval。

use crate::memory::ToolResult;
use crate::task::{SessionId, TaskEnvelope, TaskMessage};
use crate::tools::HUMAN_APPROVAL_TOOL;

/// 审批链接对应的两种决定
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Denied,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Denied => "denied",
        }
    }
}

/// 构造恢复挂起会话的任务消息
pub fn decision_task(session_id: &str, tool_use_id: &str, decision: &str) -> TaskMessage {
    TaskMessage::from(TaskEnvelope::Existing {
        session_id: SessionId::new(session_id),
        tool_results: vec![ToolResult::success(tool_use_id, decision)],
        tool_name: Some(HUMAN_APPROVAL_TOOL.to_string()),
        parent: None,
    })
}
