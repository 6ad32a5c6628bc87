use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::core::{GenerationError, GenerationResult};
use crate::stream::ByteStream;
use crate::templates::{DocumentTemplate, FormData};

/// One submission to the generation service. A new value is built for
/// every generate or follow-up action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub document_type: String,
    pub document_name: String,
    pub form_data: FormData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_request: Option<String>,
}

impl GenerationRequest {
    pub fn initial(template: &DocumentTemplate, form: &FormData) -> Self {
        GenerationRequest {
            document_type: template.id.clone(),
            document_name: template.name.clone(),
            form_data: form.clone(),
            existing_document: None,
            follow_up_request: None,
        }
    }

    pub fn follow_up(template: &DocumentTemplate, form: &FormData, existing: &str, instruction: &str) -> Self {
        GenerationRequest {
            existing_document: Some(existing.to_string()),
            follow_up_request: Some(instruction.to_string()),
            ..Self::initial(template, form)
        }
    }
}

/// Issues a generation request and yields the response body.
///
/// `Ok(None)` means `cancel` fired before the response arrived.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    async fn open(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> GenerationResult<Option<ByteStream>>;
}

/// Error body returned by the service on failure.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

pub(crate) fn status_error(status: StatusCode, body: &str) -> GenerationError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.or(parsed.error).unwrap_or_default();

    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited(message),
        StatusCode::PAYMENT_REQUIRED => GenerationError::QuotaExhausted(message),
        _ => GenerationError::Service {
            status: status.as_u16(),
            message,
        },
    }
}

/// POSTs JSON to the service's generate endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        HttpTransport {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl GenerationTransport for HttpTransport {
    async fn open(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> GenerationResult<Option<ByteStream>> {
        let mut builder = self.http.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::info!(document_type = %request.document_type, follow_up = request.follow_up_request.is_some(), "requesting generation");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            response = builder.send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        Ok(Some(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(GenerationError::from))
                .boxed(),
        ))
    }
}
