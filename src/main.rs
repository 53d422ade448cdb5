//! Hive 单次调用 worker
//!
//! 从 stdin 读取一条任务消息，为配置中的 agent 跑一次调用（续接 → 推理 → 挂起或完成 → 保存），
//! 把结果摘要以 JSON 写到 stdout。进程本身无状态，状态全部在会话存储中。
//!
//! 用法: echo '{"type":"new","body":{"task":"..."}}' | hive [config.toml]

use std::path::PathBuf;

use anyhow::Context;
use hive::config::load_config;
use hive::{observability, AgentBuilder};
use tokio::io::AsyncReadExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path).context("Failed to load config")?;
    let retention = config.store.retention();
    if config.store.backend == "memory" {
        anyhow::bail!(
            "store.backend = \"memory\" cannot carry suspended sessions between invocations, use sqlite"
        );
    }

    let harness = AgentBuilder::new(config)
        .build()
        .context("Failed to build agent")?;

    if let Err(e) = harness.purge_expired(retention).await {
        tracing::warn!("Retention purge failed: {}", e);
    }

    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .context("Failed to read task message from stdin")?;

    let outcome = harness
        .handle(&raw)
        .await
        .context("Invocation failed")?;

    let summary = serde_json::json!({
        "agent": harness.agent().name,
        "session_id": outcome.session_id.as_str(),
        "phase": outcome.phase,
        "messages": outcome.message_count,
        "version": outcome.version,
    });
    println!("{}", summary);
    Ok(())
}
