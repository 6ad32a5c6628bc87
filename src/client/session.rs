use tokio_util::sync::CancellationToken;

use super::generation::GenerationClient;
use super::state::GenerationOutcome;
use super::transport::GenerationTransport;
use crate::core::GenerationResult;
use crate::templates::{DocumentTemplate, FormData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Form,
    Result,
}

/// Headless form/result workflow for one document template.
pub struct DocumentSession<T> {
    client: GenerationClient<T>,
    template: DocumentTemplate,
    form: FormData,
    step: Step,
    document: String,
}

impl<T: GenerationTransport> DocumentSession<T> {
    pub fn new(client: GenerationClient<T>, template: DocumentTemplate) -> Self {
        DocumentSession {
            client,
            template,
            form: FormData::new(),
            step: Step::Form,
            document: String::new(),
        }
    }

    pub fn client(&self) -> &GenerationClient<T> {
        &self.client
    }

    pub fn template(&self) -> &DocumentTemplate {
        &self.template
    }

    pub fn form(&self) -> &FormData {
        &self.form
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// Latest complete or partial document.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Replaces one value; every other field is left untouched.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.form.set_field(name, value);
    }

    /// Validates and generates. Moves to `Result` as soon as any text is
    /// available; a failure sends the user back to the form.
    pub async fn submit(&mut self, cancel: &CancellationToken) -> GenerationResult<GenerationOutcome> {
        let result = self.client.generate(&self.template, &self.form, cancel).await;

        match &result {
            Ok(outcome) if outcome.is_cancelled() && outcome.text().is_empty() => {}
            Ok(outcome) => {
                self.document = outcome.text().to_string();
                self.step = Step::Result;
            }
            Err(e) if e.is_generic_failure() => self.step = Step::Form,
            Err(_) => {}
        }

        result
    }

    /// Rewrites the current document. The session stays on `Result` whatever
    /// the outcome; the previous draft survives a failed request.
    pub async fn revise(
        &mut self,
        instruction: &str,
        cancel: &CancellationToken,
    ) -> GenerationResult<GenerationOutcome> {
        let outcome = self
            .client
            .follow_up(&self.template, &self.form, &self.document, instruction, cancel)
            .await?;

        self.document = outcome.text().to_string();
        Ok(outcome)
    }

    /// Returns to the form with the entered values kept and the generated
    /// document discarded.
    pub fn back_to_form(&mut self) {
        self.step = Step::Form;
        self.document.clear();
        self.client.reset();
    }
}
