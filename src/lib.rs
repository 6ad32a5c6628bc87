pub mod api;
pub mod client;
pub mod core;
pub mod gateway;
pub mod generators;
pub mod prompt;
pub mod stream;
pub mod templates;

// Re-export commonly used types
pub use client::{DocumentSession, GenerationClient, GenerationOutcome, HttpTransport};
pub use crate::core::{AppConfig, GenerationError, GenerationResult};
pub use generators::{print_view, PdfGenerator};
pub use stream::{delta_stream, SseDecoder};
pub use templates::{DocumentTemplate, FormData, TemplateRegistry};
