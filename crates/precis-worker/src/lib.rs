//! Background summarization for Precis.
//!
//! - [`HttpArticleFetcher`] downloads an article and extracts its text.
//! - [`SummaryOrchestrator`] runs fetch, language detection, summarization
//!   and persistence for one record.
//! - [`TaskQueue`] executes `generate_summary` jobs on a worker pool with
//!   retries for transient failures.

pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod queue;

pub use error::{Result, WorkerError};
pub use fetch::{
    ArticleFetcher, FetchOptions, HttpArticleFetcher, extract_article_text, parse_article_url,
};
pub use orchestrator::{
    DetachedWriter, SummaryOrchestrator, SummaryOutcome, SummaryWriter, TextSummary,
};
pub use queue::{JobHandle, JobReport, QueueConfig, SummaryJob, TASK_NAME, TaskQueue};
