//! Error types for the summarization crate.

use thiserror::Error;

/// Result type alias using the summarization error type.
pub type Result<T> = std::result::Result<T, SummarizeError>;

/// Error type for language detection and summarization.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// No summarizer is configured for the detected language.
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// A strategy was invoked before its model resource was installed.
    #[error("Resource not ready: {0}")]
    ResourceNotReady(String),

    /// The model or classifier produced no usable output.
    #[error("Inference error: {0}")]
    Inference(String),

    /// The input text cannot be processed (empty, whitespace only).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tokenizer failed to encode or decode.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Model files could not be located or loaded.
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Invalid configuration (bad strategy name, missing model id, etc.).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SummarizeError {
    /// Returns true if re-running the same request cannot succeed without
    /// operator intervention or different input.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedLanguage(_)
                | Self::ResourceNotReady(_)
                | Self::InvalidInput(_)
                | Self::Tokenizer(_)
                | Self::Inference(_)
                | Self::Config(_)
        )
    }
}

impl From<tokenizers::Error> for SummarizeError {
    fn from(err: tokenizers::Error) -> Self {
        SummarizeError::Tokenizer(err.to_string())
    }
}

impl From<serde_json::Error> for SummarizeError {
    fn from(err: serde_json::Error) -> Self {
        SummarizeError::ModelLoad(format!("invalid model config: {}", err))
    }
}
