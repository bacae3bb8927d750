//! Conversation stores
//!
//! Both adapters route every mutation through the domain thread methods, so
//! lifecycle and history rules hold regardless of backend.

mod json_dir;
mod memory;

pub use json_dir::JsonDirConversationRepository;
pub use memory::InMemoryConversationRepository;
