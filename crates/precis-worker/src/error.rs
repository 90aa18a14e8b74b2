//! Error types for the worker crate.

use thiserror::Error;

/// Result type alias using the worker error type.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Error type for fetching, orchestration and queued jobs.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Article could not be fetched; a later attempt may succeed.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Article was reached but refused by the server, too large or empty.
    #[error("Article rejected: {0}")]
    Rejected(String),

    /// URL is malformed or uses a scheme other than http/https.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Language detection or summarization failed.
    #[error(transparent)]
    Summarize(#[from] precis_summarize::SummarizeError),

    /// Persisting the summary failed.
    #[error("Store error: {0}")]
    Store(#[from] precis_store::StoreError),

    /// A blocking task panicked or was cancelled, or the queue is closed.
    #[error("Task error: {0}")]
    Task(String),
}

impl WorkerError {
    /// Create a fetch error.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create an error for an article that will not become fetchable on retry.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Whether re-running the job from scratch may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(_) => true,
            Self::Summarize(e) => !e.is_permanent(),
            Self::Store(e) => e.is_retryable(),
            Self::Rejected(_) | Self::InvalidUrl(_) | Self::Task(_) => false,
        }
    }
}

impl From<tokio::task::JoinError> for WorkerError {
    fn from(err: tokio::task::JoinError) -> Self {
        WorkerError::Task(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use precis_store::StoreError;
    use precis_summarize::SummarizeError;

    #[test]
    fn test_retry_classification() {
        assert!(WorkerError::fetch("timeout").is_retryable());
        assert!(!WorkerError::rejected("HTTP 404").is_retryable());
        assert!(!WorkerError::from(SummarizeError::Tokenizer("encode".into())).is_retryable());
        assert!(WorkerError::from(SummarizeError::ModelLoad("missing".into())).is_retryable());
        assert!(!WorkerError::from(SummarizeError::UnsupportedLanguage("xx".into())).is_retryable());
        assert!(!WorkerError::from(SummarizeError::InvalidInput("empty".into())).is_retryable());
        assert!(!WorkerError::from(StoreError::NotFound("Summary 1".into())).is_retryable());
        assert!(!WorkerError::Task("panicked".into()).is_retryable());
        assert!(!WorkerError::InvalidUrl("ftp://example.com".into()).is_retryable());
    }

    #[test]
    fn test_summarize_error_display_is_transparent() {
        let err = WorkerError::from(SummarizeError::UnsupportedLanguage("de".into()));
        assert_eq!(err.to_string(), "Unsupported language: de");
    }
}
