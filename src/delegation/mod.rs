//! 委派层：委派请求 / 完成回调的构造，以及按地址投递的出站通道

pub mod chain;
pub mod outbox;

pub use chain::{completion_callback, delegation_request, OutboundTask};
pub use outbox::{HttpOutbox, InMemoryTaskQueue, Outbox};
