//! Agent 构建器：从配置组装一个可处理任务消息的 InvocationHarness
//!
//! 存储、出站通道、LLM、审批通知都可以显式注入（测试 / 进程内多 agent），
//! 未注入时按配置创建。

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::core::{AgentError, InvocationHarness};
use crate::delegation::{HttpOutbox, Outbox};
use crate::llm::{create_llm_client, LlmClient};
use crate::memory::{create_conversation_store, ConversationStore};
use crate::react::{ReasoningEngine, ToolLoopEngine};
use crate::task::Dispatcher;
use crate::tools::{
    ApprovalNotifier, DelegateTool, EchoTool, HumanApprovalTool, LogNotifier, ReportTool,
    ToolExecutor, ToolRegistry, WebhookNotifier,
};

pub struct AgentBuilder {
    config: AppConfig,
    store: Option<Arc<dyn ConversationStore>>,
    outbox: Option<Arc<dyn Outbox>>,
    llm: Option<Arc<dyn LlmClient>>,
    notifier: Option<Arc<dyn ApprovalNotifier>>,
    engine: Option<Arc<dyn ReasoningEngine>>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: None,
            outbox: None,
            llm: None,
            notifier: None,
            engine: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_outbox(mut self, outbox: Arc<dyn Outbox>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ApprovalNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// 直接指定推理引擎（跳过工具循环的组装）
    pub fn with_engine(mut self, engine: Arc<dyn ReasoningEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    fn outbox(&self) -> Result<Arc<dyn Outbox>, AgentError> {
        if let Some(o) = &self.outbox {
            return Ok(o.clone());
        }
        let timeout = Duration::from_secs(self.config.tools.tool_timeout_secs);
        Ok(Arc::new(HttpOutbox::new(timeout)?))
    }

    fn notifier(&self) -> Result<Arc<dyn ApprovalNotifier>, AgentError> {
        if let Some(n) = &self.notifier {
            return Ok(n.clone());
        }
        match &self.config.tools.approval.notify_url {
            Some(url) => {
                let timeout = Duration::from_secs(self.config.tools.tool_timeout_secs);
                let n = WebhookNotifier::new(url.clone(), timeout).map_err(AgentError::ConfigError)?;
                Ok(Arc::new(n))
            }
            None => Ok(Arc::new(LogNotifier)),
        }
    }

    /// 按配置注册工具
    pub fn build_tools(&self) -> Result<ToolRegistry, AgentError> {
        let tools = &self.config.tools;
        let outbox = self.outbox()?;
        let mut registry = ToolRegistry::new();

        if tools.echo {
            registry.register(EchoTool);
        }
        if let Some(endpoint) = &tools.approval.endpoint {
            registry.register(HumanApprovalTool::new(endpoint.clone(), self.notifier()?));
        }
        for d in &tools.delegates {
            let tool = DelegateTool::new(
                d.name.clone(),
                d.description.clone(),
                d.destination.clone(),
                outbox.clone(),
            );
            registry.register(if d.evaluation { tool.evaluation() } else { tool });
        }
        if !tools.report_tool.is_empty() {
            registry.register(ReportTool::new(tools.report_tool.clone(), outbox));
        }

        tracing::info!("Registered tools: {:?}", registry.tool_names());
        Ok(registry)
    }

    pub fn build(self) -> Result<InvocationHarness, AgentError> {
        let store = match &self.store {
            Some(s) => s.clone(),
            None => create_conversation_store(
                &self.config.store.backend,
                self.config.store.path.as_deref(),
            )?,
        };

        let engine = match &self.engine {
            Some(e) => e.clone(),
            None => {
                let llm = self
                    .llm
                    .clone()
                    .unwrap_or_else(|| create_llm_client(&self.config.llm));
                let executor =
                    ToolExecutor::new(self.build_tools()?, self.config.tools.tool_timeout_secs);
                Arc::new(ToolLoopEngine::new(
                    llm,
                    &self.config.agent.resolve_system_prompt(),
                    executor,
                    self.config.agent.max_steps,
                )) as Arc<dyn ReasoningEngine>
            }
        };

        Ok(InvocationHarness::new(
            self.config.agent.identity(),
            Dispatcher::new(self.config.dispatch.strict_task_types),
            store,
            engine,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, DelegateEntry};
    use crate::delegation::InMemoryTaskQueue;

    #[test]
    fn test_tools_follow_config() {
        let mut cfg = AppConfig::default();
        cfg.tools.approval.endpoint = Some("http://bridge/".into());
        cfg.tools.delegates.push(DelegateEntry {
            name: "evaluator_agent".into(),
            description: "evaluate".into(),
            destination: "mem://evaluator".into(),
            evaluation: true,
        });
        let b = AgentBuilder::new(cfg).with_outbox(Arc::new(InMemoryTaskQueue::new()));
        let names = b.build_tools().unwrap().tool_names();
        assert_eq!(
            names,
            vec!["echo", "evaluator_agent", "human_approval", "report_result"]
        );
    }

    #[test]
    fn test_no_approval_endpoint_means_no_approval_tool() {
        let b = AgentBuilder::new(AppConfig::default())
            .with_outbox(Arc::new(InMemoryTaskQueue::new()));
        let names = b.build_tools().unwrap().tool_names();
        assert!(!names.contains(&"human_approval".to_string()));
    }

    #[test]
    fn test_build_fails_when_store_cannot_open() {
        let dir = tempfile::TempDir::new().unwrap();
        let not_a_dir = dir.path().join("plain-file");
        std::fs::write(&not_a_dir, b"x").unwrap();

        let mut cfg = AppConfig::default();
        cfg.store.path = Some(not_a_dir.join("hive.db"));
        let result = AgentBuilder::new(cfg)
            .with_outbox(Arc::new(InMemoryTaskQueue::new()))
            .build();
        assert!(matches!(result, Err(AgentError::Store(_))));
    }
}
