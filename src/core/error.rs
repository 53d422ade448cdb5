//! 错误类型
//!
//! - ValidationError：入站任务消息校验失败（直接失败，依赖外部传输的重投 / 死信策略）
//! - StoreError：会话存储读写失败
//! - QueueError：出站消息投递失败
//! - AgentError：单次调用级别的汇总错误

use thiserror::Error;

/// 任务消息校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Malformed task message: {0}")]
    Malformed(String),

    #[error("Task type is not specified")]
    MissingType,

    #[error("Task type is not supported, must be `new` or `existing`: {0}")]
    UnsupportedType(String),

    #[error("Task body is not specified")]
    MissingBody,

    #[error("Task description is not specified")]
    MissingTask,

    #[error("Session ID is not specified")]
    MissingSessionId,

    #[error("Session ID is not specified in parent")]
    MissingParentSessionId,

    #[error("Tool result body is invalid: {0}")]
    InvalidToolResults(String),
}

/// 会话存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 乐观锁冲突：读取后记录已被其他调用改写
    #[error("Concurrent update on session {session_id} / agent {agent_name}: expected version {expected}, found {found}")]
    Conflict {
        session_id: String,
        agent_name: String,
        expected: u64,
        found: u64,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// 出站投递错误
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Unknown destination: {0}")]
    UnknownDestination(String),

    #[error("Mailbox closed: {0}")]
    Closed(String),

    #[error("Delivery to {destination} failed: {reason}")]
    Delivery { destination: String, reason: String },
}

/// 单次调用过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    /// LLM 回复看起来是工具调用但无法解析
    #[error("Invalid tool call: {detail}")]
    InvalidToolCall { output: String, detail: String },

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}
