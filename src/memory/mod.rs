//! 记忆层：会话记录（短期）与单次运行的中间步骤（中期）

pub mod conversation;
pub mod working;

pub use conversation::{Conversation, Message, Role};
pub use working::{IntermediateStep, WorkingMemory};
