//! 人工审批工具
//!
//! 发送一条带 approve / deny 链接的审批通知，成功后请求挂起（等待人工决定）。
//! 通知失败不挂起，转为失败结果交还推理引擎。
//! 链接格式：`{endpoint}approve/{session_id}?toolUseId={id}` / `{endpoint}deny/{session_id}?toolUseId={id}`。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{InvocationContext, WaitKind};
use crate::memory::ToolUse;
use crate::task::SessionId;
use crate::tools::registry::{parse_args, schema_of};
use crate::tools::Tool;

pub const HUMAN_APPROVAL_TOOL: &str = "human_approval";

/// 一次审批请求（通知内容）
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApprovalRequest {
    pub subject: String,
    pub content: String,
    pub session_id: String,
    pub tool_use_id: String,
    pub approve_url: String,
    pub deny_url: String,
}

impl ApprovalRequest {
    pub fn new(endpoint: &str, session_id: &SessionId, tool_use_id: &str, content: &str) -> Self {
        Self {
            subject: "Content Approval Request".to_string(),
            content: content.to_string(),
            session_id: session_id.to_string(),
            tool_use_id: tool_use_id.to_string(),
            approve_url: format!("{endpoint}approve/{session_id}?toolUseId={tool_use_id}"),
            deny_url: format!("{endpoint}deny/{session_id}?toolUseId={tool_use_id}"),
        }
    }

    /// 纯文本正文
    pub fn text(&self) -> String {
        format!(
            "Content Approval Request\n\nThe following content has been generated and requires your approval:\n\n{}\n\nTo approve: {}\nTo deny: {}\n",
            self.content, self.approve_url, self.deny_url
        )
    }
}

/// 审批通知通道
#[async_trait]
pub trait ApprovalNotifier: Send + Sync {
    async fn notify(&self, request: &ApprovalRequest) -> Result<(), String>;
}

/// 只写日志的通知（本地运行 / 未配置通知地址时）
pub struct LogNotifier;

#[async_trait]
impl ApprovalNotifier for LogNotifier {
    async fn notify(&self, request: &ApprovalRequest) -> Result<(), String> {
        tracing::info!(
            session_id = %request.session_id,
            approve = %request.approve_url,
            deny = %request.deny_url,
            "Approval requested"
        );
        Ok(())
    }
}

/// Webhook 通知：把 ApprovalRequest 以 JSON POST 到配置的地址
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ApprovalNotifier for WebhookNotifier {
    async fn notify(&self, request: &ApprovalRequest) -> Result<(), String> {
        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "subject": request.subject,
                "text": request.text(),
                "request": request,
            }))
            .send()
            .await
            .map_err(|e| format!("Error sending approval request: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("Approval notification rejected: {}", resp.status()));
        }
        Ok(())
    }
}

#[derive(Deserialize, JsonSchema)]
struct ApprovalArgs {
    /// Content or decision that needs to be approved by the human.
    content: String,
}

pub struct HumanApprovalTool {
    endpoint: String,
    notifier: Arc<dyn ApprovalNotifier>,
}

impl HumanApprovalTool {
    /// endpoint 为审批桥的基础地址（以 / 结尾）
    pub fn new(endpoint: impl Into<String>, notifier: Arc<dyn ApprovalNotifier>) -> Self {
        Self {
            endpoint: endpoint.into(),
            notifier,
        }
    }
}

#[async_trait]
impl Tool for HumanApprovalTool {
    fn name(&self) -> &str {
        HUMAN_APPROVAL_TOOL
    }

    fn description(&self) -> &str {
        "Request approval from a human for the content generated or critical decisions."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<ApprovalArgs>()
    }

    async fn execute(&self, call: &ToolUse, ctx: &mut InvocationContext) -> Result<String, String> {
        let args: ApprovalArgs = parse_args(call)?;
        let request = ApprovalRequest::new(
            &self.endpoint,
            ctx.session_id(),
            &call.tool_use_id,
            &args.content,
        );
        self.notifier.notify(&request).await?;
        ctx.request_suspend(call.tool_use_id.clone(), WaitKind::HumanApproval);
        Ok("An approval request has been sent successfully".to_string())
    }
}
