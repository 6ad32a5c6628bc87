use thiserror::Error;

/// Failures surfaced while requesting or streaming a generated document.
///
/// Cancellation is deliberately absent: an aborted stream ends with
/// [`crate::client::GenerationOutcome::Cancelled`] instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<String> },

    #[error("follow-up instruction is empty")]
    EmptyInstruction,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("service failure ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed event stream: {0}")]
    Framing(String),
}

impl GenerationError {
    /// Localized text shown to the person filling the form.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Validation { missing } => validation_message(missing),
            GenerationError::EmptyInstruction => "请输入修改意见".to_string(),
            GenerationError::RateLimited(_) => "请求过于频繁，请稍后再试".to_string(),
            GenerationError::QuotaExhausted(_) => "服务额度已用完，请联系管理员".to_string(),
            GenerationError::Service { message, .. } if !message.is_empty() => message.clone(),
            _ => "生成失败，请稍后重试".to_string(),
        }
    }

    /// Rate limiting, quota and any other service or network fault.
    pub fn is_generic_failure(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited(_)
                | GenerationError::QuotaExhausted(_)
                | GenerationError::Service { .. }
                | GenerationError::Transport(_)
                | GenerationError::Framing(_)
        )
    }
}

/// Aggregates missing field labels into one message.
pub fn validation_message(missing: &[String]) -> String {
    format!("以下字段为必填：{}", missing.join("、"))
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Transport(err.to_string())
    }
}

/// Violations of the template catalog invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("duplicate template id: {0}")]
    DuplicateTemplate(String),

    #[error("template {template}: duplicate field name {field}")]
    DuplicateField { template: String, field: String },

    #[error("template {template}: select field {field} has no options")]
    EmptyOptions { template: String, field: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Typst compilation failed: {0}")]
    Compile(String),

    #[error("template rendering failed: {0}")]
    Render(#[from] minijinja::Error),
}

pub type GenerationResult<T> = Result<T, GenerationError>;
