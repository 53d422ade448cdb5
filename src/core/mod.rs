//! 核心层：错误类型、单次调用上下文、挂起状态机、调用 harness 与构建器

pub mod builder;
pub mod context;
pub mod error;
pub mod harness;
pub mod state;

pub use builder::AgentBuilder;
pub use context::{AgentIdentity, InvocationContext, StopSignal, WaitKind};
pub use error::{AgentError, QueueError, StoreError, ValidationError};
pub use harness::{InvocationHarness, InvocationOutcome};
pub use state::SessionPhase;
