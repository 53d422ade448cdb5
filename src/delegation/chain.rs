//! 委派 / 回调链
//!
//! 委派：发出 New 任务，parent 携带委派方身份、同一 session_id、回调地址与待解决的 tool_use_id。
//! 回调：被委派方完成后向 parent.callback_address 发 Existing 任务，
//! 其中唯一的 ToolResult.tool_use_id 等于 parent.tool_use_id。
//! 每一环同一时间只支持一个未完成的委派调用。

use crate::core::InvocationContext;
use crate::memory::{ResultText, ToolResult, ToolStatus};
use crate::task::{ParentRecord, TaskEnvelope, TaskMessage};

/// 带目标地址的出站任务
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundTask {
    pub destination: String,
    pub message: TaskMessage,
}

/// 构造委派请求（New 任务）
pub fn delegation_request(
    ctx: &InvocationContext,
    tool_use_id: &str,
    tool_name: &str,
    task: impl Into<String>,
) -> TaskMessage {
    TaskMessage::from(TaskEnvelope::New {
        task: task.into(),
        parent: Some(ctx.delegation_parent(tool_use_id, tool_name)),
    })
}

/// 构造完成回调（Existing 任务），发往 parent.callback_address
pub fn completion_callback(
    parent: &ParentRecord,
    status: ToolStatus,
    text: impl Into<String>,
) -> OutboundTask {
    let result = ToolResult {
        tool_use_id: parent.tool_use_id.clone(),
        status,
        content: vec![ResultText { text: text.into() }],
    };
    let message = TaskMessage::from(TaskEnvelope::Existing {
        session_id: parent.session_id.clone(),
        tool_results: vec![result],
        tool_name: parent.tool_name.clone(),
        parent: None,
    });
    OutboundTask {
        destination: parent.callback_address.clone(),
        message,
    }
}
