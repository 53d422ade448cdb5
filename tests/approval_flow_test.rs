//! 人工审批流程集成测试（SQLite 存储）
//!
//! 审批请求挂起会话，人工决定经由 decision_task 恢复。
//! 同时记录目前的已知行为：同一条恢复消息重放两次会追加两次结果。

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hive::config::AppConfig;
    use hive::core::{
        AgentError, InvocationContext, SessionPhase, StoreError, WaitKind,
    };
    use hive::delegation::InMemoryTaskQueue;
    use hive::integrations::{decision_task, Decision};
    use hive::llm::MockLlmClient;
    use hive::memory::{
        ConversationRecord, ConversationStore, Message, RecordKey, SqliteConversationStore,
    };
    use hive::react::ReasoningEngine;
    use hive::task::SessionId;
    use hive::{AgentBuilder, InvocationHarness};
    use tempfile::TempDir;

    const AGENT: &str = "post-generator-agent";

    fn harness(store: Arc<dyn ConversationStore>, script: Vec<&str>) -> InvocationHarness {
        let mut cfg = AppConfig::default();
        cfg.agent.name = AGENT.into();
        cfg.agent.callback_address = "mem://post-generator".into();
        cfg.tools.approval.endpoint = Some("https://bridge.example.com/".into());
        AgentBuilder::new(cfg)
            .with_store(store)
            .with_outbox(Arc::new(InMemoryTaskQueue::new()))
            .with_llm(Arc::new(MockLlmClient::scripted(script)))
            .build()
            .unwrap()
    }

    fn pending_of(phase: &SessionPhase) -> String {
        match phase {
            SessionPhase::Suspended {
                tool_use_id,
                waiting_on: WaitKind::HumanApproval,
            } => tool_use_id.clone(),
            other => panic!("expected approval wait, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_approval_suspends_and_decision_resumes() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn ConversationStore> =
            Arc::new(SqliteConversationStore::open(dir.path().join("hive.db")).unwrap());
        let h = harness(
            store.clone(),
            vec![
                r#"{"tool": "human_approval", "args": {"content": "Rent a rainbow unicorn today!"}}"#,
                "Approved, publishing now.",
            ],
        );

        let first = h
            .handle(r#"{"type":"new","body":{"task":"Write a post about rainbow unicorns"}}"#)
            .await
            .unwrap();
        let pending = pending_of(&first.phase);
        assert_eq!(first.message_count, 3);

        let resume = decision_task(first.session_id.as_str(), &pending, Decision::Approved.as_str());
        let second = h.handle_message(resume).await.unwrap();
        assert_eq!(second.phase, SessionPhase::Done);

        let record = store
            .load(&RecordKey::new(first.session_id, AGENT))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.messages.len(), 5);
        let result: Vec<_> = record.messages[2].tool_result_blocks().collect();
        assert_eq!(result[0].tool_use_id, pending);
        assert_eq!(result[0].text(), "approved");
        assert_eq!(record.version, 2);
    }

    /// 已知的非幂等行为：重放同一条恢复消息会把结果再追加一次
    #[tokio::test]
    async fn test_replayed_resume_appends_twice() {
        let store: Arc<dyn ConversationStore> =
            Arc::new(SqliteConversationStore::open_in_memory().unwrap());
        let h = harness(
            store.clone(),
            vec![
                r#"{"tool": "human_approval", "args": {"content": "post"}}"#,
                "Published.",
                "Published again.",
            ],
        );

        let first = h
            .handle(r#"{"type":"new","body":{"task":"Write a post"}}"#)
            .await
            .unwrap();
        let pending = pending_of(&first.phase);
        let resume = decision_task(first.session_id.as_str(), &pending, "approved");

        h.handle_message(resume.clone()).await.unwrap();
        h.handle_message(resume).await.unwrap();

        let record = store
            .load(&RecordKey::new(first.session_id, AGENT))
            .await
            .unwrap()
            .unwrap();
        let copies = record
            .messages
            .iter()
            .flat_map(|m| m.tool_result_blocks())
            .filter(|r| r.tool_use_id == pending)
            .count();
        assert_eq!(copies, 2, "replay is not deduplicated");
        assert_eq!(record.version, 3);
    }

    #[tokio::test]
    async fn test_concurrent_resumes_are_serialized_in_process() {
        let store: Arc<dyn ConversationStore> =
            Arc::new(SqliteConversationStore::open_in_memory().unwrap());
        let h = Arc::new(harness(
            store.clone(),
            vec![
                r#"{"tool": "human_approval", "args": {"content": "post"}}"#,
                "first",
                "second",
            ],
        ));
        let first = h
            .handle(r#"{"type":"new","body":{"task":"Write a post"}}"#)
            .await
            .unwrap();
        let pending = pending_of(&first.phase);
        let resume = decision_task(first.session_id.as_str(), &pending, "approved");

        let (a, b) = tokio::join!(
            h.handle_message(resume.clone()),
            h.handle_message(resume)
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
        let record = store
            .load(&RecordKey::new(first.session_id, AGENT))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.version, 3);
    }

    /// 推理期间另一个写入者抢先更新了同一条记录
    struct RacingEngine {
        store: Arc<dyn ConversationStore>,
    }

    #[async_trait::async_trait]
    impl ReasoningEngine for RacingEngine {
        async fn run(
            &self,
            mut history: Vec<Message>,
            prompt: &str,
            ctx: &mut InvocationContext,
        ) -> Result<Vec<Message>, AgentError> {
            let key = RecordKey::new(ctx.session_id().clone(), AGENT);
            if let Some(other) = self.store.load(&key).await? {
                self.store.save(&other).await?;
            }
            history.push(Message::user(prompt));
            history.push(Message::assistant("done"));
            Ok(history)
        }
    }

    #[tokio::test]
    async fn test_concurrent_writer_fails_invocation_with_conflict() {
        let store: Arc<dyn ConversationStore> =
            Arc::new(SqliteConversationStore::open_in_memory().unwrap());
        let mut seeded = ConversationRecord::new(RecordKey::new(SessionId::from("S"), AGENT));
        seeded.messages = vec![Message::user("a"), Message::assistant("b")];
        store.save(&seeded).await.unwrap();

        let mut cfg = AppConfig::default();
        cfg.agent.name = AGENT.into();
        let h = AgentBuilder::new(cfg)
            .with_store(store.clone())
            .with_engine(Arc::new(RacingEngine {
                store: store.clone(),
            }))
            .build()
            .unwrap();

        let err = h
            .handle_message(decision_task("S", "T", "approved"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::Store(StoreError::Conflict {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }
}
