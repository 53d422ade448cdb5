//! 工具箱：注册表、执行器，以及会触发挂起 / 交还的协议工具

pub mod delegate;
pub mod echo;
pub mod executor;
pub mod human_approval;
pub mod registry;
pub mod report;
pub mod schema;

pub use delegate::DelegateTool;
pub use echo::EchoTool;
pub use executor::ToolExecutor;
pub use human_approval::{
    ApprovalNotifier, ApprovalRequest, HumanApprovalTool, LogNotifier, WebhookNotifier,
    HUMAN_APPROVAL_TOOL,
};
pub use registry::{Tool, ToolRegistry};
pub use report::{ReportTool, DEFAULT_REPORT_TOOL};
pub use schema::tool_call_schema_json;
