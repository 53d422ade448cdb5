//! SQLite 会话存储（rusqlite，同步连接放在 spawn_blocking 中执行）
//!
//! 一行一个 (session_id, agent_name)，完整记录以 JSON 保存；
//! terminal / updated_at 单独成列，供保留策略清理使用。

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::StoreError;
use crate::memory::store::{ConversationRecord, ConversationStore, RecordKey};

pub struct SqliteConversationStore {
    conn: Arc<Mutex<Connection>>,
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl SqliteConversationStore {
    /// 打开（不存在则创建）数据库文件并初始化表
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(e.to_string()))?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// 内存数据库（测试用）
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS conversations (
                session_id TEXT NOT NULL,
                agent_name TEXT NOT NULL,
                record TEXT NOT NULL,
                terminal INTEGER NOT NULL,
                version INTEGER NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (session_id, agent_name)
            );
            CREATE INDEX IF NOT EXISTS idx_conversations_updated ON conversations(updated_at);",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("sqlite connection poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn load(&self, key: &RecordKey) -> Result<Option<ConversationRecord>, StoreError> {
        let session_id = key.session_id.to_string();
        let agent_name = key.agent_name.clone();
        self.with_conn(move |conn| {
            let row: Option<(String, i64)> = conn
                .query_row(
                    "SELECT record, version FROM conversations WHERE session_id = ?1 AND agent_name = ?2",
                    params![session_id, agent_name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            match row {
                Some((json, version)) => {
                    let mut record: ConversationRecord = serde_json::from_str(&json)?;
                    record.version = version as u64;
                    Ok(Some(record))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn save(&self, record: &ConversationRecord) -> Result<u64, StoreError> {
        let mut stored = record.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let found: u64 = tx
                .query_row(
                    "SELECT version FROM conversations WHERE session_id = ?1 AND agent_name = ?2",
                    params![stored.session_id.as_str(), stored.agent_name],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?
                .map(|v| v as u64)
                .unwrap_or(0);
            if found != stored.version {
                return Err(StoreError::Conflict {
                    session_id: stored.session_id.to_string(),
                    agent_name: stored.agent_name.clone(),
                    expected: stored.version,
                    found,
                });
            }
            let next = found + 1;
            stored.version = next;
            stored.updated_at = Utc::now();
            let json = serde_json::to_string(&stored)?;
            tx.execute(
                "INSERT INTO conversations (session_id, agent_name, record, terminal, version, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(session_id, agent_name) DO UPDATE SET
                    record = excluded.record,
                    terminal = excluded.terminal,
                    version = excluded.version,
                    updated_at = excluded.updated_at",
                params![
                    stored.session_id.as_str(),
                    stored.agent_name,
                    json,
                    stored.state.is_terminal() as i64,
                    next as i64,
                    timestamp(stored.updated_at),
                ],
            )?;
            tx.commit()?;
            Ok(next)
        })
        .await
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff = timestamp(cutoff);
        self.with_conn(move |conn| {
            let n = conn.execute(
                "DELETE FROM conversations WHERE terminal = 1 AND updated_at < ?1",
                params![cutoff],
            )?;
            Ok(n)
        })
        .await
    }

    async fn len(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
            Ok(n as usize)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SessionPhase, WaitKind};
    use crate::memory::{Message, ToolResult};
    use crate::task::{ParentRecord, SessionId};
    use tempfile::TempDir;

    fn record(session: &str, agent: &str) -> ConversationRecord {
        ConversationRecord::new(RecordKey::new(SessionId::from(session), agent))
    }

    #[tokio::test]
    async fn test_sqlite_roundtrip_with_parent() {
        let dir = TempDir::new().unwrap();
        let store = SqliteConversationStore::open(dir.path().join("hive.db")).unwrap();

        let mut rec = record("S", "evaluator-agent");
        rec.messages.push(Message::user("evaluate this"));
        rec.messages.push(Message::tool_results(vec![ToolResult::success("T", "ok")]));
        rec.parent = Some(ParentRecord {
            agent_name: "post-generator-agent".into(),
            session_id: SessionId::from("S"),
            callback_address: "mem://post-generator".into(),
            tool_use_id: "T0".into(),
            tool_name: Some("evaluator_agent".into()),
        });
        rec.state = SessionPhase::Suspended {
            tool_use_id: "T".into(),
            waiting_on: WaitKind::Evaluation,
        };
        assert_eq!(store.save(&rec).await.unwrap(), 1);

        let loaded = store.load(&rec.key()).await.unwrap().unwrap();
        assert_eq!(loaded.messages, rec.messages);
        assert_eq!(loaded.parent, rec.parent);
        assert_eq!(loaded.state, rec.state);
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_sqlite_conflict_and_purge() {
        let store = SqliteConversationStore::open_in_memory().unwrap();
        let rec = record("S", "a");
        store.save(&rec).await.unwrap();
        // 未重新读取，版本仍为 0
        assert!(matches!(
            store.save(&rec).await,
            Err(StoreError::Conflict { expected: 0, found: 1, .. })
        ));

        let mut waiting = record("S2", "a");
        waiting.state = SessionPhase::Suspended {
            tool_use_id: "T".into(),
            waiting_on: WaitKind::Delegation,
        };
        store.save(&waiting).await.unwrap();

        let purged = store
            .purge_expired(Utc::now() + chrono::Duration::seconds(5))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.len().await.unwrap(), 1);
    }
}
