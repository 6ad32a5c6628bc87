use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::state::{GenerationOutcome, StreamSnapshot};
use super::transport::{GenerationRequest, GenerationTransport};
use crate::core::{GenerationError, GenerationResult};
use crate::stream::{delta_stream, DeltaStream, DEFAULT_MAX_PENDING_BYTES};
use crate::templates::{DocumentTemplate, FormData};

/// Drives one generation stream at a time and publishes the growing text.
///
/// Deltas are applied strictly in arrival order, so every published
/// snapshot holds a prefix of the final document.
pub struct GenerationClient<T> {
    transport: T,
    max_pending: usize,
    state: watch::Sender<StreamSnapshot>,
}

impl<T: GenerationTransport> GenerationClient<T> {
    pub fn new(transport: T) -> Self {
        let (state, _) = watch::channel(StreamSnapshot::default());
        GenerationClient {
            transport,
            max_pending: DEFAULT_MAX_PENDING_BYTES,
            state,
        }
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<StreamSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        self.state.borrow().clone()
    }

    /// Drops the published text, e.g. when the user starts over.
    pub fn reset(&self) {
        self.state.send_replace(StreamSnapshot::default());
    }

    /// Validates, then opens a first-generation request and returns its
    /// lazy delta sequence. `Ok(None)` when cancelled before the response.
    pub async fn stream_generate(
        &self,
        template: &DocumentTemplate,
        form: &FormData,
        cancel: &CancellationToken,
    ) -> GenerationResult<Option<DeltaStream>> {
        let missing = template.missing_labels(form);
        if !missing.is_empty() {
            return Err(GenerationError::Validation { missing });
        }

        self.open(&GenerationRequest::initial(template, form), cancel).await
    }

    /// Opens a rewrite request carrying the previous draft and the
    /// instruction.
    pub async fn stream_follow_up(
        &self,
        template: &DocumentTemplate,
        form: &FormData,
        existing: &str,
        instruction: &str,
        cancel: &CancellationToken,
    ) -> GenerationResult<Option<DeltaStream>> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(GenerationError::EmptyInstruction);
        }

        let request = GenerationRequest::follow_up(template, form, existing, instruction);
        self.open(&request, cancel).await
    }

    pub async fn generate(
        &self,
        template: &DocumentTemplate,
        form: &FormData,
        cancel: &CancellationToken,
    ) -> GenerationResult<GenerationOutcome> {
        let missing = template.missing_labels(form);
        if !missing.is_empty() {
            return Err(GenerationError::Validation { missing });
        }

        self.state.send_replace(StreamSnapshot {
            text: String::new(),
            generating: true,
        });

        let opened = self.stream_generate(template, form, cancel).await;
        self.run(opened, cancel).await
    }

    /// Rewrites `existing` per `instruction`. The published text is cleared
    /// once the service accepts the request, before the first new delta.
    pub async fn follow_up(
        &self,
        template: &DocumentTemplate,
        form: &FormData,
        existing: &str,
        instruction: &str,
        cancel: &CancellationToken,
    ) -> GenerationResult<GenerationOutcome> {
        if instruction.trim().is_empty() {
            return Err(GenerationError::EmptyInstruction);
        }

        self.state.send_modify(|s| s.generating = true);

        let opened = self.stream_follow_up(template, form, existing, instruction, cancel).await;
        if let Ok(Some(_)) = &opened {
            self.state.send_modify(|s| s.text.clear());
        }
        self.run(opened, cancel).await
    }

    async fn open(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> GenerationResult<Option<DeltaStream>> {
        let body = self.transport.open(request, cancel).await?;
        Ok(body.map(|bytes| delta_stream(bytes, cancel.clone(), self.max_pending)))
    }

    async fn run(
        &self,
        opened: GenerationResult<Option<DeltaStream>>,
        cancel: &CancellationToken,
    ) -> GenerationResult<GenerationOutcome> {
        let result = match opened {
            Ok(Some(deltas)) => self.accumulate(deltas, cancel).await,
            Ok(None) => Ok(GenerationOutcome::Cancelled(self.snapshot().text)),
            Err(e) => Err(e),
        };

        self.state.send_modify(|s| s.generating = false);

        match &result {
            Ok(GenerationOutcome::Completed(text)) => {
                tracing::info!(chars = text.chars().count(), "generation completed")
            }
            Ok(GenerationOutcome::Cancelled(_)) => tracing::info!("generation cancelled"),
            Err(e) => tracing::warn!(error = %e, "generation failed"),
        }

        result
    }

    async fn accumulate(
        &self,
        mut deltas: DeltaStream,
        cancel: &CancellationToken,
    ) -> GenerationResult<GenerationOutcome> {
        while let Some(delta) = deltas.next().await {
            let delta = delta?;
            self.state.send_modify(|s| s.text.push_str(&delta));
        }

        let text = self.snapshot().text;
        if cancel.is_cancelled() {
            Ok(GenerationOutcome::Cancelled(text))
        } else {
            Ok(GenerationOutcome::Completed(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::MockGenerationTransport;
    use crate::stream::ByteStream;
    use crate::templates::TemplateRegistry;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn frames(parts: &[&str]) -> ByteStream {
        let mut body: Vec<Result<Bytes, GenerationError>> = parts
            .iter()
            .map(|p| {
                let line = format!(
                    "data: {}\n",
                    serde_json::json!({ "choices": [{ "delta": { "content": p } }] })
                );
                Ok(Bytes::from(line))
            })
            .collect();
        body.push(Ok(Bytes::from_static(b"data: [DONE]\n")));
        futures::stream::iter(body).boxed()
    }

    /// Yields to the scheduler before each chunk so observers see every update.
    fn yielding(body: ByteStream) -> ByteStream {
        body.then(|chunk| async move {
            tokio::task::yield_now().await;
            chunk
        })
        .boxed()
    }

    fn defense() -> &'static DocumentTemplate {
        TemplateRegistry::builtin().find("defense-statement").unwrap()
    }

    fn complete_form() -> FormData {
        defense()
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| (f.name.clone(), "内容".to_string()))
            .collect()
    }

    #[tokio::test]
    async fn missing_fields_fail_before_any_request() {
        let mut transport = MockGenerationTransport::new();
        transport.expect_open().never();

        let client = GenerationClient::new(transport);
        let err = client
            .generate(defense(), &FormData::new(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err, GenerationError::Validation { missing: defense().required_labels() });
        assert_eq!(client.snapshot(), StreamSnapshot::default());
    }

    #[tokio::test]
    async fn generate_accumulates_deltas_in_order() {
        let mut transport = MockGenerationTransport::new();
        transport
            .expect_open()
            .withf(|req, _| req.existing_document.is_none() && req.document_type == "defense-statement")
            .times(1)
            .returning(|_, _| Ok(Some(frames(&["答辩", "状", "正文"]))));

        let client = GenerationClient::new(transport);
        let mut updates = client.subscribe();
        let outcome = client
            .generate(defense(), &complete_form(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, GenerationOutcome::Completed("答辩状正文".into()));
        assert!(updates.has_changed().unwrap());
        let last = updates.borrow_and_update().clone();
        assert_eq!(last, StreamSnapshot { text: "答辩状正文".into(), generating: false });
    }

    #[tokio::test]
    async fn every_published_text_is_a_prefix_of_the_final_text() {
        let mut transport = MockGenerationTransport::new();
        transport
            .expect_open()
            .returning(|_, _| Ok(Some(frames(&["一、", "二、", "三、"]))));

        let client = GenerationClient::new(transport);
        let mut updates = client.subscribe();
        let observer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while updates.changed().await.is_ok() {
                seen.push(updates.borrow_and_update().text.clone());
            }
            seen
        });

        let outcome = client
            .generate(defense(), &complete_form(), &CancellationToken::new())
            .await
            .unwrap();
        drop(client);

        let seen = observer.await.unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|t| outcome.text().starts_with(t.as_str())));
    }

    #[tokio::test]
    async fn follow_up_clears_previous_text_before_new_deltas() {
        let mut transport = MockGenerationTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_open()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Some(frames(&["旧稿"]))));
        transport
            .expect_open()
            .withf(|req, _| {
                req.existing_document.as_deref() == Some("旧稿")
                    && req.follow_up_request.as_deref() == Some("删除第二条")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Some(yielding(frames(&["新", "稿"])))));

        let client = GenerationClient::new(transport);
        let cancel = CancellationToken::new();
        let first = client.generate(defense(), &complete_form(), &cancel).await.unwrap();
        assert_eq!(first.text(), "旧稿");

        let mut updates = client.subscribe();
        let observer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while updates.changed().await.is_ok() {
                seen.push(updates.borrow_and_update().text.clone());
            }
            seen
        });

        let outcome = client
            .follow_up(defense(), &complete_form(), first.text(), "  删除第二条 ", &cancel)
            .await
            .unwrap();
        assert_eq!(outcome, GenerationOutcome::Completed("新稿".into()));
        drop(client);

        let seen = observer.await.unwrap();
        let first_new = seen.iter().position(|t| t.starts_with('新')).unwrap();
        assert!(seen[..first_new].iter().any(String::is_empty));
        for text in &seen[first_new..] {
            assert!("新稿".starts_with(text.as_str()), "stale text published: {text}");
        }
        assert!(seen.iter().all(|t| !t.starts_with("旧稿新")));
    }

    #[tokio::test]
    async fn failed_follow_up_keeps_previous_text() {
        let mut transport = MockGenerationTransport::new();
        transport
            .expect_open()
            .returning(|_, _| Err(GenerationError::QuotaExhausted(String::new())));

        let client = GenerationClient::new(transport);
        client.state.send_replace(StreamSnapshot { text: "草稿".into(), generating: false });

        let err = client
            .follow_up(defense(), &complete_form(), "草稿", "改", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_generic_failure());
        assert_eq!(client.snapshot(), StreamSnapshot { text: "草稿".into(), generating: false });
    }

    #[tokio::test]
    async fn blank_instruction_is_rejected() {
        let mut transport = MockGenerationTransport::new();
        transport.expect_open().never();

        let client = GenerationClient::new(transport);
        let err = client
            .follow_up(defense(), &complete_form(), "草稿", "   ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::EmptyInstruction);
    }

    #[tokio::test]
    async fn cancellation_ends_without_error() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut transport = MockGenerationTransport::new();
        transport.expect_open().returning(|_, _| Ok(Some(frames(&["不会出现"]))));

        let client = GenerationClient::new(transport);
        let outcome = client.generate(defense(), &complete_form(), &cancel).await.unwrap();

        assert_eq!(outcome, GenerationOutcome::Cancelled(String::new()));
        assert!(!client.snapshot().generating);
    }

    #[tokio::test]
    async fn stream_generate_returns_raw_delta_sequence() {
        let mut transport = MockGenerationTransport::new();
        transport.expect_open().returning(|_, _| Ok(Some(frames(&["甲", "乙"]))));

        let client = GenerationClient::new(transport);
        let deltas = client
            .stream_generate(defense(), &complete_form(), &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        let collected: Vec<_> = deltas.collect().await;
        assert_eq!(collected, vec![Ok("甲".to_string()), Ok("乙".to_string())]);
        assert_eq!(client.snapshot(), StreamSnapshot::default());
    }
}
