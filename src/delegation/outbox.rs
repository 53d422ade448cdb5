//! 出站投递：按地址把任务消息送到目标 agent 的收件箱
//!
//! - InMemoryTaskQueue：每个地址一个 mpsc 通道（进程内多 agent / 测试）
//! - HttpOutbox：把任务消息以 JSON POST 到目标 URL

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use crate::core::QueueError;
use crate::task::TaskMessage;

/// 出站投递接口
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send(&self, destination: &str, message: &TaskMessage) -> Result<(), QueueError>;
}

/// 内存任务队列：一个地址对应一个收件箱
#[derive(Default)]
pub struct InMemoryTaskQueue {
    mailboxes: RwLock<HashMap<String, mpsc::UnboundedSender<TaskMessage>>>,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册地址并返回其收件端；重复注册会替换旧的收件箱
    pub async fn register(&self, address: impl Into<String>) -> mpsc::UnboundedReceiver<TaskMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.mailboxes.write().await.insert(address.into(), tx);
        rx
    }
}

#[async_trait]
impl Outbox for InMemoryTaskQueue {
    async fn send(&self, destination: &str, message: &TaskMessage) -> Result<(), QueueError> {
        let mailboxes = self.mailboxes.read().await;
        let tx = mailboxes
            .get(destination)
            .ok_or_else(|| QueueError::UnknownDestination(destination.to_string()))?;
        tx.send(message.clone())
            .map_err(|_| QueueError::Closed(destination.to_string()))?;
        tracing::debug!("Queued task for {}", destination);
        Ok(())
    }
}

/// HTTP 出站：destination 即目标 URL
pub struct HttpOutbox {
    client: reqwest::Client,
}

impl HttpOutbox {
    pub fn new(timeout: Duration) -> Result<Self, QueueError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueueError::Delivery {
                destination: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Outbox for HttpOutbox {
    async fn send(&self, destination: &str, message: &TaskMessage) -> Result<(), QueueError> {
        let delivery = |reason: String| QueueError::Delivery {
            destination: destination.to_string(),
            reason,
        };
        let resp = self
            .client
            .post(destination)
            .json(message)
            .send()
            .await
            .map_err(|e| delivery(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(delivery(format!("{}: {}", status, text)));
        }
        tracing::info!("Delivered task to {}", destination);
        Ok(())
    }
}
