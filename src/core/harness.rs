//! 调用 harness：一条入站消息 = 一次顺序执行的调用
//!
//! 解析 → 续接（历史 + prompt）→ 推理（RUNNING）→ 根据停止信号得出 SUSPENDED / DONE → 保存记录。
//! 同一进程内对同一 (session, agent) 的调用按到达顺序串行；跨进程的并发投递由存储版本号检测，
//! 冲突时本次调用失败，交给外部传输重投。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use crate::core::{AgentError, AgentIdentity, InvocationContext, SessionPhase, StoreError};
use crate::memory::{ConversationRecord, ConversationStore, RecordKey};
use crate::react::ReasoningEngine;
use crate::session::ContinuationEngine;
use crate::task::{Dispatch, Dispatcher, SessionId, TaskEnvelope, TaskMessage};

/// 一次调用的结果
#[derive(Clone, Debug, PartialEq)]
pub struct InvocationOutcome {
    pub session_id: SessionId,
    pub phase: SessionPhase,
    /// 保存的消息条数
    pub message_count: usize,
    /// 保存后的记录版本
    pub version: u64,
}

type KeyLock = Arc<tokio::sync::Mutex<()>>;

pub struct InvocationHarness {
    agent: AgentIdentity,
    dispatcher: Dispatcher,
    continuation: ContinuationEngine,
    store: Arc<dyn ConversationStore>,
    engine: Arc<dyn ReasoningEngine>,
    locks: Mutex<HashMap<RecordKey, KeyLock>>,
}

impl InvocationHarness {
    pub fn new(
        agent: AgentIdentity,
        dispatcher: Dispatcher,
        store: Arc<dyn ConversationStore>,
        engine: Arc<dyn ReasoningEngine>,
    ) -> Self {
        Self {
            continuation: ContinuationEngine::new(store.clone(), agent.clone()),
            agent,
            dispatcher,
            store,
            engine,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn agent(&self) -> &AgentIdentity {
        &self.agent
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// 处理原始 JSON 文本
    pub async fn handle(&self, raw: &str) -> Result<InvocationOutcome, AgentError> {
        let dispatch = self.dispatcher.parse(raw)?;
        self.run(dispatch).await
    }

    /// 处理已反序列化的任务消息（进程内队列）
    pub async fn handle_message(&self, msg: TaskMessage) -> Result<InvocationOutcome, AgentError> {
        let dispatch = self.dispatcher.dispatch(msg)?;
        self.run(dispatch).await
    }

    async fn run(&self, dispatch: Dispatch) -> Result<InvocationOutcome, AgentError> {
        // 新生成的 session_id 不可能有并发调用，只对已知会话加锁
        let known = match &dispatch {
            Dispatch::Task(TaskEnvelope::Existing { session_id, .. }) => Some(session_id.clone()),
            Dispatch::Task(TaskEnvelope::New {
                parent: Some(p), ..
            }) => Some(p.session_id.clone()),
            _ => None,
        };
        let lock = known.map(|s| self.lock_for(RecordKey::new(s, self.agent.name.clone())));
        let _guard = match &lock {
            Some(l) => Some(l.clone().lock_owned().await),
            None => None,
        };

        let result = self.run_locked(dispatch).await;

        drop(_guard);
        drop(lock);
        self.release_idle_locks();

        if let Err(e) = &result {
            tracing::error!("Invocation failed for agent {}: {}", self.agent.name, e);
        }
        result
    }

    async fn run_locked(&self, dispatch: Dispatch) -> Result<InvocationOutcome, AgentError> {
        let continuation = self.continuation.prepare(dispatch).await?;
        let session_id = continuation.session_id.clone();

        let mut ctx = InvocationContext::new(
            self.agent.clone(),
            session_id.clone(),
            continuation.parent.clone(),
        );
        let phase = SessionPhase::start();
        tracing::info!(
            "Running agent {} for session {} with {} messages",
            self.agent.name,
            session_id,
            continuation.history.len()
        );

        let messages = self
            .engine
            .run(continuation.history, &continuation.prompt, &mut ctx)
            .await?;

        let phase = phase.after_reasoning(ctx.stop_signal());
        if phase.is_suspended() {
            tracing::info!("Agent needs to wait for tool result. Saving state and sleeping.");
        }
        if ctx.leaves_parent_waiting() {
            tracing::warn!(
                "Agent {} finished session {} without reporting back to parent {}, parent stays suspended",
                self.agent.name,
                session_id,
                continuation.parent.as_ref().map(|p| p.agent_name.as_str()).unwrap_or_default()
            );
        }

        let mut record =
            ConversationRecord::new(RecordKey::new(session_id.clone(), self.agent.name.clone()));
        record.messages = messages;
        record.parent = continuation.parent;
        record.state = phase.clone();
        record.version = continuation.version;

        let version = self.store.save(&record).await?;
        tracing::info!(
            "Saved {} messages to agent memory for session_id {}",
            record.messages.len(),
            session_id
        );

        Ok(InvocationOutcome {
            session_id,
            phase,
            message_count: record.messages.len(),
            version,
        })
    }

    /// 清理保留期之外的 DONE 记录
    pub async fn purge_expired(&self, retention: Duration) -> Result<usize, StoreError> {
        let retention = chrono::Duration::from_std(retention)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let purged = self.store.purge_expired(Utc::now() - retention).await?;
        if purged > 0 {
            tracing::info!("Purged {} expired conversation records", purged);
        }
        Ok(purged)
    }

    fn lock_for(&self, key: RecordKey) -> KeyLock {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(key).or_default().clone()
    }

    fn release_idle_locks(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, l| Arc::strong_count(l) > 1);
    }
}
