//! 会话存储抽象层
//!
//! 以 (session_id, agent_name) 为键保存每个 agent 独立的消息历史与委派指针。
//! 同一 session_id 在一条委派链上的多个 agent 之间共享，但各自的历史互不覆盖。
//! 记录带 version：保存时版本不符返回 Conflict，避免并发投递静默覆盖彼此追加的历史。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::{SessionPhase, StoreError};
use crate::memory::Message;
use crate::task::{ParentRecord, SessionId};

/// 存储键
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub session_id: SessionId,
    pub agent_name: String,
}

impl RecordKey {
    pub fn new(session_id: SessionId, agent_name: impl Into<String>) -> Self {
        Self {
            session_id,
            agent_name: agent_name.into(),
        }
    }
}

/// 会话记录
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub session_id: SessionId,
    pub agent_name: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRecord>,
    pub state: SessionPhase,
    /// 读取时的版本；新记录为 0
    #[serde(default)]
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(key: RecordKey) -> Self {
        Self {
            session_id: key.session_id,
            agent_name: key.agent_name,
            messages: Vec::new(),
            parent: None,
            state: SessionPhase::Done,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.session_id.clone(), self.agent_name.clone())
    }
}

/// 会话存储接口
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// 读取记录；未命中返回 None
    async fn load(&self, key: &RecordKey) -> Result<Option<ConversationRecord>, StoreError>;

    /// 写入记录（首次创建或原地更新），返回新版本号
    ///
    /// record.version 必须等于存储中的当前版本（不存在时为 0），否则返回 Conflict。
    async fn save(&self, record: &ConversationRecord) -> Result<u64, StoreError>;

    /// 删除 updated_at 早于 cutoff 的 DONE 记录；SUSPENDED 记录永不清理
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;

    /// 当前记录数
    async fn len(&self) -> Result<usize, StoreError>;
}

/// 内存会话存储
#[derive(Default)]
pub struct InMemoryConversationStore {
    records: RwLock<HashMap<RecordKey, ConversationRecord>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, key: &RecordKey) -> Result<Option<ConversationRecord>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn save(&self, record: &ConversationRecord) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let key = record.key();
        let found = records.get(&key).map(|r| r.version).unwrap_or(0);
        if found != record.version {
            return Err(StoreError::Conflict {
                session_id: key.session_id.to_string(),
                agent_name: key.agent_name,
                expected: record.version,
                found,
            });
        }
        let mut stored = record.clone();
        stored.version = found + 1;
        stored.updated_at = Utc::now();
        records.insert(key, stored);
        Ok(found + 1)
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !(r.state.is_terminal() && r.updated_at < cutoff));
        Ok(before - records.len())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }
}

/// 创建会话存储
///
/// sqlite 打不开时直接报错，不回退到内存：单次调用的进程退出后内存记录随之丢失，
/// 挂起的会话在下一次恢复时会被当成存储未命中从头开始。
pub fn create_conversation_store(
    backend: &str,
    path: Option<&std::path::Path>,
) -> Result<Arc<dyn ConversationStore>, StoreError> {
    match backend {
        "sqlite" => {
            let p = path.ok_or_else(|| {
                StoreError::Backend("sqlite store requires store.path".to_string())
            })?;
            let store = crate::memory::SqliteConversationStore::open(p)?;
            tracing::info!("Using sqlite conversation store: {:?}", p);
            Ok(Arc::new(store))
        }
        "memory" => {
            tracing::warn!("Using in-memory conversation store, records do not outlive this process");
            Ok(Arc::new(InMemoryConversationStore::new()))
        }
        other => Err(StoreError::Backend(format!(
            "Unknown store backend: {}",
            other
        ))),
    }
}
