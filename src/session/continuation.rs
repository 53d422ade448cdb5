//! 会话续接引擎
//!
//! 根据分发结果推导出交给推理引擎的 (session_id, 消息历史, prompt)：
//! - New：有 parent 则沿用 parent.session_id，否则生成新 ID；历史为空，prompt 为任务原文。
//! - Existing：读取本 agent 在该会话下的记录；历史多于 1 条时丢弃最后一条
//!   （本 agent 自己挂起时的那一轮），追加一条由入站工具结果组成的 user 消息，prompt 为 "Continue"。
//!   历史不足 2 条（含未命中）时从空历史开始，prompt 仍为 "Continue"。
//! - 无法识别的 type：新会话 + 通用问候语。

use std::sync::Arc;

use crate::core::{AgentIdentity, StoreError};
use crate::memory::{ConversationStore, Message, RecordKey, ToolResult};
use crate::task::{Dispatch, ParentRecord, SessionId, TaskEnvelope};

/// 恢复时使用的固定 prompt：带着更新后的工具结果继续，而不是一句新的用户输入
pub const CONTINUE_PROMPT: &str = "Continue";

/// 无法识别任务类型时的回退 prompt
pub const GREETING_PROMPT: &str = "Hello, how can you help?";

/// 续接结果：推理引擎的输入
#[derive(Clone, Debug, PartialEq)]
pub struct Continuation {
    pub session_id: SessionId,
    pub history: Vec<Message>,
    pub prompt: String,
    /// 本 agent 的委派方（存储中的优先，其次是入站消息携带的）
    pub parent: Option<ParentRecord>,
    /// 读取到的存储版本；保存时用于冲突检测
    pub version: u64,
    /// 入站为 Existing（恢复）任务
    pub resumed: bool,
}

/// 会话续接引擎：持有存储与本 agent 身份
pub struct ContinuationEngine {
    store: Arc<dyn ConversationStore>,
    agent: AgentIdentity,
}

impl ContinuationEngine {
    pub fn new(store: Arc<dyn ConversationStore>, agent: AgentIdentity) -> Self {
        Self { store, agent }
    }

    pub fn agent(&self) -> &AgentIdentity {
        &self.agent
    }

    fn key(&self, session_id: &SessionId) -> RecordKey {
        RecordKey::new(session_id.clone(), self.agent.name.clone())
    }

    pub async fn prepare(&self, dispatch: Dispatch) -> Result<Continuation, StoreError> {
        match dispatch {
            Dispatch::Task(TaskEnvelope::New { task, parent }) => self.prepare_new(task, parent).await,
            Dispatch::Task(TaskEnvelope::Existing {
                session_id,
                tool_results,
                tool_name,
                parent,
            }) => {
                self.prepare_existing(session_id, tool_results, tool_name, parent)
                    .await
            }
            Dispatch::Unrecognized { kind, parent } => {
                let session_id = SessionId::generate();
                tracing::info!(
                    "Unrecognized task type {}, starting fresh session {}",
                    kind,
                    session_id
                );
                Ok(Continuation {
                    session_id,
                    history: Vec::new(),
                    prompt: GREETING_PROMPT.to_string(),
                    parent,
                    version: 0,
                    resumed: false,
                })
            }
        }
    }

    async fn prepare_new(
        &self,
        task: String,
        parent: Option<ParentRecord>,
    ) -> Result<Continuation, StoreError> {
        let (session_id, version) = match &parent {
            Some(p) => {
                tracing::info!("Reusing parent session_id: {}", p.session_id);
                // 同一会话可能再次委派给本 agent：历史重新开始，但要沿用已有记录的版本
                let version = self
                    .store
                    .load(&self.key(&p.session_id))
                    .await?
                    .map(|r| r.version)
                    .unwrap_or(0);
                (p.session_id.clone(), version)
            }
            None => {
                let id = SessionId::generate();
                tracing::info!("New session_id: {}", id);
                (id, 0)
            }
        };
        Ok(Continuation {
            session_id,
            history: Vec::new(),
            prompt: task,
            parent,
            version,
            resumed: false,
        })
    }

    async fn prepare_existing(
        &self,
        session_id: SessionId,
        tool_results: Vec<ToolResult>,
        tool_name: Option<String>,
        envelope_parent: Option<ParentRecord>,
    ) -> Result<Continuation, StoreError> {
        tracing::info!("Using existing session_id: {}", session_id);
        let record = self.store.load(&self.key(&session_id)).await?;
        let version = record.as_ref().map(|r| r.version).unwrap_or(0);

        let Some(record) = record else {
            tracing::warn!(
                "No record for session {} / agent {}, starting a new conversation",
                session_id,
                self.agent.name
            );
            return Ok(Continuation {
                session_id,
                history: Vec::new(),
                prompt: CONTINUE_PROMPT.to_string(),
                parent: envelope_parent,
                version,
                resumed: true,
            });
        };

        tracing::info!(
            "Loaded {} messages from agent memory of {} for session_id: {}",
            record.messages.len(),
            self.agent.name,
            session_id
        );

        let ids: Vec<&str> = tool_results.iter().map(|r| r.tool_use_id.as_str()).collect();
        if !record.state.is_suspended() {
            tracing::warn!(
                "Session {} is not suspended ({:?}), resuming anyway",
                session_id,
                record.state
            );
        } else if !record.state.matches_resume(&ids) {
            tracing::warn!(
                "Tool results {:?} do not match the pending call of session {}",
                ids,
                session_id
            );
        }

        let parent = record.parent.or(envelope_parent);
        let mut messages = record.messages;
        let history = if messages.len() > 1 {
            messages.pop();
            tracing::info!(
                "Appending {} tool result(s) from {} to messages",
                tool_results.len(),
                tool_name.as_deref().unwrap_or("unknown tool")
            );
            messages.push(Message::tool_results(tool_results));
            messages
        } else {
            tracing::warn!("No messages found in agent memory, starting a new conversation");
            Vec::new()
        };

        Ok(Continuation {
            session_id,
            history,
            prompt: CONTINUE_PROMPT.to_string(),
            parent,
            version,
            resumed: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SessionPhase, WaitKind};
    use crate::memory::{ConversationRecord, InMemoryConversationStore, ToolResult, ToolUse};
    use crate::task::Dispatcher;

    const AGENT: &str = "post-generator-agent";

    fn engine(store: Arc<dyn ConversationStore>) -> ContinuationEngine {
        ContinuationEngine::new(store, AgentIdentity::new(AGENT, "mem://post-generator"))
    }

    fn parent(session: &str) -> ParentRecord {
        ParentRecord {
            agent_name: "root".into(),
            session_id: SessionId::from(session),
            callback_address: "mem://root".into(),
            tool_use_id: "T0".into(),
            tool_name: None,
        }
    }

    /// 存储 3 条消息：任务、assistant 的 toolUse、挂起时的占位结果
    async fn seed_suspended(store: &Arc<dyn ConversationStore>, session: &str) -> ConversationRecord {
        let call = ToolUse::new("human_approval", serde_json::json!({"content": "post"}));
        let mut rec = ConversationRecord::new(RecordKey::new(SessionId::from(session), AGENT));
        rec.messages = vec![
            Message::user("Write a post about rainbow unicorns"),
            Message::tool_use(None, call.clone()),
            Message::tool_results(vec![ToolResult::success(&call.tool_use_id, "email sent")]),
        ];
        rec.state = SessionPhase::Suspended {
            tool_use_id: call.tool_use_id.clone(),
            waiting_on: WaitKind::HumanApproval,
        };
        store.save(&rec).await.unwrap();
        store.load(&rec.key()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_new_task_without_parent_gets_unique_session() {
        let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let e = engine(store);
        let d = Dispatcher::default();
        let raw = r#"{"type":"new","body":{"task":"Write a post about rainbow unicorns"}}"#;
        let a = e.prepare(d.parse(raw).unwrap()).await.unwrap();
        let b = e.prepare(d.parse(raw).unwrap()).await.unwrap();
        assert_ne!(a.session_id, b.session_id);
        assert!(a.history.is_empty());
        assert_eq!(a.prompt, "Write a post about rainbow unicorns");
        assert_eq!(a.version, 0);
    }

    #[tokio::test]
    async fn test_new_task_with_parent_reuses_session() {
        let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let e = engine(store);
        let c = e
            .prepare(Dispatch::Task(TaskEnvelope::New {
                task: "evaluate".into(),
                parent: Some(parent("S")),
            }))
            .await
            .unwrap();
        assert_eq!(c.session_id, SessionId::from("S"));
        assert_eq!(c.parent, Some(parent("S")));
        assert!(c.history.is_empty());
    }

    #[tokio::test]
    async fn test_scenario_b_resume_replaces_pending_turn() {
        let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let stored = seed_suspended(&store, "S").await;
        let e = engine(store);
        let raw = r#"{"type":"existing","session_id":"S","body":[{"toolResult":{"toolUseId":"abc","status":"success","content":[{"text":"approved"}]}}]}"#;
        let c = e.prepare(Dispatcher::default().parse(raw).unwrap()).await.unwrap();

        assert_eq!(c.prompt, CONTINUE_PROMPT);
        assert_eq!(c.history.len(), 3);
        assert_eq!(&c.history[..2], &stored.messages[..2]);
        assert_eq!(
            c.history[2],
            Message::tool_results(vec![ToolResult::success("abc", "approved")])
        );
        assert_eq!(c.version, stored.version);
        assert!(c.resumed);
    }

    #[tokio::test]
    async fn test_resume_with_short_history_starts_empty() {
        let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let mut rec = ConversationRecord::new(RecordKey::new(SessionId::from("S"), AGENT));
        rec.messages.push(Message::user("only one"));
        store.save(&rec).await.unwrap();
        let e = engine(store);

        let c = e
            .prepare(Dispatch::Task(TaskEnvelope::Existing {
                session_id: SessionId::from("S"),
                tool_results: vec![ToolResult::success("abc", "approved")],
                tool_name: None,
                parent: None,
            }))
            .await
            .unwrap();
        assert!(c.history.is_empty());
        assert_eq!(c.prompt, CONTINUE_PROMPT);
        assert_eq!(c.version, 1);
    }

    #[tokio::test]
    async fn test_resume_store_miss_keeps_supplied_parent() {
        let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let e = engine(store);
        let c = e
            .prepare(Dispatch::Task(TaskEnvelope::Existing {
                session_id: SessionId::from("missing"),
                tool_results: vec![ToolResult::success("abc", "approved")],
                tool_name: None,
                parent: Some(parent("missing")),
            }))
            .await
            .unwrap();
        assert!(c.history.is_empty());
        assert_eq!(c.prompt, CONTINUE_PROMPT);
        assert_eq!(c.parent, Some(parent("missing")));
    }

    #[tokio::test]
    async fn test_resume_prefers_stored_parent() {
        let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let mut rec = seed_suspended(&store, "S").await;
        rec.parent = Some(parent("S"));
        store.save(&rec).await.unwrap();
        let e = engine(store);

        let mut other = parent("S");
        other.agent_name = "someone-else".into();
        let c = e
            .prepare(Dispatch::Task(TaskEnvelope::Existing {
                session_id: SessionId::from("S"),
                tool_results: vec![ToolResult::success("abc", "approved")],
                tool_name: None,
                parent: Some(other),
            }))
            .await
            .unwrap();
        assert_eq!(c.parent, Some(parent("S")));
    }

    #[tokio::test]
    async fn test_unrecognized_type_uses_greeting() {
        let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let e = engine(store);
        let c = e
            .prepare(Dispatch::Unrecognized {
                kind: "ping".into(),
                parent: None,
            })
            .await
            .unwrap();
        assert_eq!(c.prompt, GREETING_PROMPT);
        assert!(c.history.is_empty());
    }
}
