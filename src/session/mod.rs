//! 会话续接：New / Existing 任务到 (历史, prompt) 的推导

pub mod continuation;

pub use continuation::{Continuation, ContinuationEngine, CONTINUE_PROMPT, GREETING_PROMPT};
