pub mod chat;

pub use chat::{ChatBackend, ChatGateway};
