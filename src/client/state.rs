/// What observers see of the active generation: the text accumulated so far
/// and whether a stream is still running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSnapshot {
    pub text: String,
    pub generating: bool,
}

/// How a stream ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed(String),
    /// Aborted by the caller; carries the text received before the abort.
    Cancelled(String),
}

impl GenerationOutcome {
    pub fn text(&self) -> &str {
        match self {
            GenerationOutcome::Completed(text) | GenerationOutcome::Cancelled(text) => text,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerationOutcome::Cancelled(_))
    }
}
