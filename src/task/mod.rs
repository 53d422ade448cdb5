//! 任务层：入站任务消息的线上格式、强类型信封与分发

pub mod dispatcher;
pub mod envelope;

pub use dispatcher::{Dispatch, Dispatcher};
pub use envelope::{NewTaskBody, ParentRecord, SessionId, TaskEnvelope, TaskMessage};
