//! 记忆层：对话消息模型与按 (session, agent) 划分的会话存储

pub mod conversation;
pub mod sqlite;
pub mod store;

pub use conversation::{ContentBlock, Message, ResultText, Role, ToolResult, ToolStatus, ToolUse};
pub use sqlite::SqliteConversationStore;
pub use store::{
    create_conversation_store, ConversationRecord, ConversationStore, InMemoryConversationStore,
    RecordKey,
};
