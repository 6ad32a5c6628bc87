pub mod catalog;
pub mod registry;
pub mod template_models;

pub use registry::{TemplateRegistry, NOT_FOUND_MESSAGE};
pub use template_models::*;
