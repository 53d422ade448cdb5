//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按顺序返回预设的回复；脚本用完后回显最后一条 user 消息的文本（作为最终回复）。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<String>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次返回给定的回复
    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _system: &str, messages: &[Message]) -> Result<String, String> {
        let next = self
            .script
            .lock()
            .map_err(|_| "mock script poisoned".to_string())?
            .pop_front();
        if let Some(reply) = next {
            return Ok(reply);
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.render_text())
            .unwrap_or_else(|| "(no input)".to_string());
        Ok(format!("Echo from Mock: {}", last_user))
    }
}
