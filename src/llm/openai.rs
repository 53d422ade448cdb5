//! OpenAI 兼容端点上的 LlmClient
//!
//! 对话历史里的 toolUse / toolResult 块先渲染成文本再发送，
//! 工具调用的识别留给 Planner。单次请求受 `[llm] timeout_secs` 限制。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::config::LlmSection;
use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// 进程内累计的 token 用量
#[derive(Debug, Default)]
pub struct TokenUsage {
    prompt: AtomicU64,
    completion: AtomicU64,
}

impl TokenUsage {
    fn record(&self, prompt: u32, completion: u32) {
        self.prompt.fetch_add(prompt as u64, Ordering::Relaxed);
        self.completion.fetch_add(completion as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> (u64, u64, u64) {
        let p = self.prompt.load(Ordering::Relaxed);
        let c = self.completion.load(Ordering::Relaxed);
        (p, c, p + c)
    }
}

pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
    usage: TokenUsage,
}

impl OpenAiClient {
    /// api_key 未配置时读取 OPENAI_API_KEY
    pub fn from_config(cfg: &LlmSection) -> Self {
        let api_key = cfg
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("No API key configured for LLM provider, requests will likely fail");
        }

        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = &cfg.base_url {
            config = config.with_api_base(url);
        }

        Self {
            client: Client::with_config(config),
            model: cfg.model.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs.max(1)),
            usage: TokenUsage::default(),
        }
    }
}

fn request_message(m: &Message) -> Result<ChatCompletionRequestMessage, String> {
    let text = m.render_text();
    let msg: ChatCompletionRequestMessage = match m.role {
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(text)
            .build()
            .map_err(|e| e.to_string())?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(text)
            .build()
            .map_err(|e| e.to_string())?
            .into(),
    };
    Ok(msg)
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<String, String> {
        let mut request_messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(messages.len() + 1);
        request_messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| e.to_string())?
                .into(),
        );
        for m in messages {
            request_messages.push(request_message(m)?);
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .build()
            .map_err(|e| e.to_string())?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| format!("LLM request timed out after {:?}", self.timeout))?
            .map_err(|e| e.to_string())?;

        if let Some(u) = &response.usage {
            self.usage.record(u.prompt_tokens, u.completion_tokens);
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| "LLM returned no content".to_string())
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.snapshot()
    }
}
