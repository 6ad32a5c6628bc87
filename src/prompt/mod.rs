pub mod builder;
pub mod screening;

pub use builder::{ChatMessage, ChatRequest, PromptBuilder, Role};
pub use screening::{find_sensitive, rejection_message, SENSITIVE_KEYWORDS};
