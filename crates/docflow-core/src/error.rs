//! Error taxonomy and retry classification.
//!
//! Every fallible operation in the pipeline returns a [`DocflowError`], tagged
//! with an [`ErrorKind`]. The engine uses `kind()`/`is_retryable()` to decide
//! whether a failed stage attempt should be retried.

use std::collections::HashMap;

/// The exhaustive set of error kinds the pipeline can classify a failure as.
///
/// Only `TransientExternal` is retryable; every other kind halts the
/// pipeline for the document after the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TransientExternal,
    ModelOutput,
    SchemaValidation,
    SchemaRegistry,
    PipelineState,
    Storage,
    Configuration,
    Ingestion,
    Extraction,
    Chunking,
    Embedding,
}

impl ErrorKind {
    /// The snake_case string recorded on `pipeline_runs.error_type` and on metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransientExternal => "transient_external",
            ErrorKind::ModelOutput => "model_output",
            ErrorKind::SchemaValidation => "schema_validation",
            ErrorKind::SchemaRegistry => "schema_registry",
            ErrorKind::PipelineState => "pipeline_state",
            ErrorKind::Storage => "storage",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Ingestion => "ingestion",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Chunking => "chunking",
            ErrorKind::Embedding => "embedding",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::TransientExternal)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error carrying a classification, a human message, and optional structured details.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct DocflowError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DocflowError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    pub fn with_details(mut self, details: HashMap<String, String>) -> Self {
        self.details = details;
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// `error_message` as persisted on a `pipeline_runs` row: truncated to 1000 chars.
    pub fn truncated_message(&self) -> String {
        if self.message.len() <= 1000 {
            self.message.clone()
        } else {
            self.message.chars().take(1000).collect()
        }
    }

    pub fn transient_external(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientExternal, message)
    }

    pub fn model_output(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModelOutput, message)
    }

    pub fn schema_validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaValidation, message)
    }

    pub fn schema_registry(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaRegistry, message)
    }

    pub fn pipeline_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PipelineState, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn ingestion(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Ingestion, message)
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Extraction, message)
    }

    pub fn chunking(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Chunking, message)
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Embedding, message)
    }
}

impl From<sqlx::Error> for DocflowError {
    fn from(e: sqlx::Error) -> Self {
        DocflowError::storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DocflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_external_is_retryable() {
        assert!(ErrorKind::TransientExternal.is_retryable());
        for kind in [
            ErrorKind::ModelOutput,
            ErrorKind::SchemaValidation,
            ErrorKind::SchemaRegistry,
            ErrorKind::PipelineState,
            ErrorKind::Storage,
            ErrorKind::Configuration,
            ErrorKind::Ingestion,
            ErrorKind::Extraction,
            ErrorKind::Chunking,
            ErrorKind::Embedding,
        ] {
            assert!(!kind.is_retryable());
        }
    }

    #[test]
    fn error_type_strings_are_snake_case() {
        assert_eq!(ErrorKind::TransientExternal.as_str(), "transient_external");
        assert_eq!(ErrorKind::ModelOutput.as_str(), "model_output");
        assert_eq!(ErrorKind::SchemaRegistry.as_str(), "schema_registry");
    }

    #[test]
    fn message_truncates_to_1000_chars() {
        let long = "x".repeat(2000);
        let err = DocflowError::model_output(long);
        assert_eq!(err.truncated_message().chars().count(), 1000);
    }
}
