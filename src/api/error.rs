use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;

use crate::core::{ExportError, GenerationError};

pub const MISSING_PARAMS_MESSAGE: &str = "缺少必要参数";
pub const RATE_LIMITED_MESSAGE: &str = "请求过于频繁，请稍后再试";
pub const QUOTA_MESSAGE: &str = "服务额度已用完";
pub const UPSTREAM_MESSAGE: &str = "AI生成服务暂时不可用";

#[derive(Debug)]
pub struct ApiError {
    message: String,
    status_code: StatusCode,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status_code: StatusCode) -> Self {
        ApiError {
            message: message.into(),
            status_code,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::NOT_FOUND)
    }

    pub fn too_many_requests() -> Self {
        Self::new(RATE_LIMITED_MESSAGE, StatusCode::TOO_MANY_REQUESTS)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code).json(serde_json::json!({
            "error": self.message,
            "status": self.status_code.as_u16()
        }))
    }

    fn status_code(&self) -> StatusCode {
        self.status_code
    }
}

/// Upstream failures are reported with fixed messages; details only go to the log.
impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::RateLimited(_) => ApiError::too_many_requests(),
            GenerationError::QuotaExhausted(_) => ApiError::new(QUOTA_MESSAGE, StatusCode::PAYMENT_REQUIRED),
            GenerationError::Validation { .. } => ApiError::bad_request(MISSING_PARAMS_MESSAGE),
            GenerationError::EmptyInstruction => ApiError::bad_request(err.user_message()),
            GenerationError::Service { .. } | GenerationError::Transport(_) | GenerationError::Framing(_) => {
                tracing::error!(error = %err, "generation upstream failed");
                ApiError::internal_server_error(UPSTREAM_MESSAGE)
            }
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        ApiError::internal_server_error(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
