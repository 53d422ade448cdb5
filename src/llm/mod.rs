//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::LlmSection;

pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::LlmClient;

/// 按配置创建 LLM 客户端；provider 未知时回退到 Mock
pub fn create_llm_client(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    match cfg.provider.as_str() {
        "openai" => {
            tracing::info!("Using OpenAI-compatible LLM: {}", cfg.model);
            Arc::new(OpenAiClient::from_config(cfg))
        }
        "mock" => Arc::new(MockLlmClient::new()),
        other => {
            tracing::warn!("Unknown LLM provider {}, using mock", other);
            Arc::new(MockLlmClient::new())
        }
    }
}
