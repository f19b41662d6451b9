//! 记忆层：普通聊天的短期对话历史

pub mod conversation;

pub use conversation::{ConversationMemory, Message, Role};
