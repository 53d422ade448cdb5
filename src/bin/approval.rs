//! Hive 人工审批桥
//!
//! 接收审批链接（approve / deny）与 POST /decision，转成 Existing 任务投递到 agent 收件箱。
//!
//! 配置: [bridge] listen、agent_inbox（或 HIVE__BRIDGE__LISTEN / HIVE__BRIDGE__AGENT_INBOX）
//!
//! 启动: cargo run --bin hive-approval --features approval

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use hive::config::load_config;
use hive::delegation::HttpOutbox;
use hive::integrations::approval::{create_router, ApprovalBridgeState};
use hive::observability;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path).context("Failed to load config")?;

    let outbox = HttpOutbox::new(Duration::from_secs(config.tools.tool_timeout_secs))
        .context("Failed to create outbox")?;
    let state = Arc::new(ApprovalBridgeState {
        outbox: Arc::new(outbox),
        agent_inbox: config.bridge.agent_inbox.clone(),
    });
    let app = create_router(state);

    let addr: std::net::SocketAddr = config
        .bridge
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.bridge.listen))?;
    tracing::info!("Hive approval bridge listening on http://{}", addr);
    tracing::info!("Decisions are delivered to {}", config.bridge.agent_inbox);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
