use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use std::time::Duration;

use crate::core::{GatewayConfig, GenerationError, GenerationResult};
use crate::prompt::ChatRequest;
use crate::stream::ByteStream;

/// Opens a streaming chat completion and returns the raw event-stream body.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn open_stream(&self, request: &ChatRequest) -> GenerationResult<ByteStream>;
}

/// Client for the upstream streaming chat-completions endpoint.
pub struct ChatGateway {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    idle_timeout: Duration,
}

impl ChatGateway {
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(ChatGateway {
            http,
            url: config.url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ChatBackend for ChatGateway {
    async fn open_stream(&self, request: &ChatRequest) -> GenerationResult<ByteStream> {
        let api_key = self.api_key.as_deref().ok_or_else(|| GenerationError::Service {
            status: 500,
            message: "gateway api key is not configured".to_string(),
        })?;

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_upstream_status(status, body));
        }

        Ok(idle_limited(response.bytes_stream(), self.idle_timeout))
    }
}

/// Ends `body` with a transport error once it stays silent for `idle`.
/// A slow but steady body may run for any length of time.
fn idle_limited<S, E>(body: S, idle: Duration) -> ByteStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<GenerationError> + Send + 'static,
{
    futures::stream::unfold(Some(body.boxed()), move |state| async move {
        let mut body = state?;
        match tokio::time::timeout(idle, body.next()).await {
            Ok(Some(chunk)) => Some((chunk.map_err(Into::into), Some(body))),
            Ok(None) => None,
            Err(_) => {
                tracing::warn!(idle_ms = idle.as_millis() as u64, "AI gateway stream stalled");
                let err = GenerationError::Transport(format!("no data received for {}ms", idle.as_millis()));
                Some((Err(err), None))
            }
        }
    })
    .boxed()
}

fn map_upstream_status(status: StatusCode, body: String) -> GenerationError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited(body),
        StatusCode::PAYMENT_REQUIRED => GenerationError::QuotaExhausted(body),
        _ => {
            tracing::warn!(status = status.as_u16(), body = %body, "AI gateway error");
            GenerationError::Service {
                status: status.as_u16(),
                message: body,
            }
        }
    }
}
