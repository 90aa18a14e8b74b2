//! The summarization unit of work: fetch, detect, summarize, persist.

use std::sync::Arc;

use async_trait::async_trait;
use precis_store::SummaryStore;
use precis_summarize::{LanguageCode, LanguageDetector, Strategy, SummarizerRegistry};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, WorkerError};
use crate::fetch::ArticleFetcher;

/// Destination for finished summaries.
#[async_trait]
pub trait SummaryWriter: Send + Sync {
    /// Overwrite the summary of record `record_id`.
    async fn update_summary(&self, record_id: i64, summary: &str) -> Result<()>;
}

#[async_trait]
impl SummaryWriter for Arc<SummaryStore> {
    async fn update_summary(&self, record_id: i64, summary: &str) -> Result<()> {
        let store = Arc::clone(self);
        let summary = summary.to_string();
        tokio::task::spawn_blocking(move || {
            SummaryStore::update_summary(&store, record_id, &summary)
        })
        .await??;
        Ok(())
    }
}

/// Writer for orchestrators that only summarize; every write is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedWriter;

#[async_trait]
impl SummaryWriter for DetachedWriter {
    async fn update_summary(&self, record_id: i64, _summary: &str) -> Result<()> {
        Err(WorkerError::Task(format!(
            "cannot store summary for record {}: no store attached",
            record_id
        )))
    }
}

/// Language, strategy and summary of one text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSummary {
    pub language: LanguageCode,
    pub strategy: Strategy,
    pub summary: String,
}

/// Result of a completed summarization job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryOutcome {
    pub record_id: i64,
    pub language: LanguageCode,
    pub strategy: Strategy,
    pub summary: String,
}

/// Runs one summarization job end to end.
///
/// Holds no per-request state; one instance serves every job. The summary is
/// written only after summarization succeeds, so a failed run leaves the
/// record untouched.
#[derive(Clone)]
pub struct SummaryOrchestrator {
    fetcher: Arc<dyn ArticleFetcher>,
    detector: Arc<LanguageDetector>,
    registry: Arc<SummarizerRegistry>,
    writer: Arc<dyn SummaryWriter>,
}

impl SummaryOrchestrator {
    pub fn new(
        fetcher: Arc<dyn ArticleFetcher>,
        detector: Arc<LanguageDetector>,
        registry: Arc<SummarizerRegistry>,
        writer: Arc<dyn SummaryWriter>,
    ) -> Self {
        Self {
            fetcher,
            detector,
            registry,
            writer,
        }
    }

    pub fn registry(&self) -> &Arc<SummarizerRegistry> {
        &self.registry
    }

    /// Fetch `url`, summarize it and store the summary on `record_id`.
    pub async fn run(&self, record_id: i64, url: &str) -> Result<SummaryOutcome> {
        debug!(record_id, url, "Fetching article");
        let text = self.fetcher.fetch_article_text(url).await?;

        let TextSummary {
            language,
            strategy,
            summary,
        } = self.summarize_text(text).await?;

        self.writer.update_summary(record_id, &summary).await?;
        info!(
            record_id,
            language = %language,
            strategy = %strategy,
            "Summary stored"
        );

        Ok(SummaryOutcome {
            record_id,
            language,
            strategy,
            summary,
        })
    }

    /// Entry point for the `generate_summary` task.
    pub async fn generate_summary_for(&self, record_id: i64, url: &str) -> Result<SummaryOutcome> {
        self.run(record_id, url).await
    }

    /// Fetch `url` and summarize it without persisting anything.
    pub async fn summarize_url(&self, url: &str) -> Result<TextSummary> {
        let text = self.fetcher.fetch_article_text(url).await?;
        self.summarize_text(text).await
    }

    /// Detect the language of `text` and summarize it, without fetching or
    /// persisting anything.
    pub async fn summarize_text(&self, text: impl Into<String>) -> Result<TextSummary> {
        let text = text.into();

        let detector = Arc::clone(&self.detector);
        let (text, language) = tokio::task::spawn_blocking(move || {
            let language = detector.detect(&text)?;
            Ok::<_, precis_summarize::SummarizeError>((text, language))
        })
        .await??;
        debug!(language = %language, "Language detected");

        let registry = Arc::clone(&self.registry);
        let lang = language.clone();
        let (strategy, summary) = tokio::task::spawn_blocking(move || {
            let summarizer = registry.get_summarizer(&lang)?;
            let summary = summarizer.summarize(&text)?;
            Ok::<_, precis_summarize::SummarizeError>((summarizer.strategy(), summary))
        })
        .await??;
        debug!(language = %language, strategy = %strategy, "Text summarized");

        Ok(TextSummary {
            language,
            strategy,
            summary,
        })
    }
}

impl std::fmt::Debug for SummaryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryOrchestrator")
            .field("languages", &self.registry.languages())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use precis_summarize::testing::{ENGLISH_ARTICLE, FixtureLoader, RUSSIAN_ARTICLE};
    use precis_summarize::{DetectorSpec, SummarizeError, default_table};

    struct StaticFetcher(&'static str);

    #[async_trait]
    impl ArticleFetcher for StaticFetcher {
        async fn fetch_article_text(&self, _url: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn orchestrator(text: &'static str, store: Arc<SummaryStore>) -> SummaryOrchestrator {
        let loader = Arc::new(FixtureLoader::new().with_summary_tokens(4));
        let detector = LanguageDetector::new(DetectorSpec::new("fixture"), loader.clone());
        let registry = SummarizerRegistry::new(default_table(), loader);
        SummaryOrchestrator::new(
            Arc::new(StaticFetcher(text)),
            Arc::new(detector),
            Arc::new(registry),
            Arc::new(store),
        )
    }

    #[tokio::test]
    async fn test_store_writer_updates_record() {
        let store = Arc::new(SummaryStore::open_in_memory().unwrap());
        let record = store.create_placeholder("https://example.com/a").unwrap();

        let writer: Arc<dyn SummaryWriter> = Arc::new(store.clone());
        writer.update_summary(record.id, "short").await.unwrap();
        assert_eq!(store.get(record.id).unwrap().unwrap().summary, "short");

        let err = writer.update_summary(record.id + 1, "x").await.unwrap_err();
        assert!(matches!(err, WorkerError::Store(_)));
    }

    #[tokio::test]
    async fn test_detached_orchestrator_summarizes_but_refuses_runs() {
        let loader = Arc::new(FixtureLoader::new().with_summary_tokens(4));
        let detector = LanguageDetector::new(DetectorSpec::new("fixture"), loader.clone());
        let orchestrator = SummaryOrchestrator::new(
            Arc::new(StaticFetcher(ENGLISH_ARTICLE)),
            Arc::new(detector),
            Arc::new(SummarizerRegistry::new(default_table(), loader)),
            Arc::new(DetachedWriter),
        );

        let summary = orchestrator
            .summarize_url("https://example.com/en")
            .await
            .unwrap();
        assert_eq!(summary.summary, "the city council approved");

        let err = orchestrator
            .run(1, "https://example.com/en")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Task(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_run_stores_summary() {
        let store = Arc::new(SummaryStore::open_in_memory().unwrap());
        let record = store.create_placeholder("https://example.com/en").unwrap();

        let outcome = orchestrator(ENGLISH_ARTICLE, store.clone())
            .run(record.id, &record.url)
            .await
            .unwrap();

        assert_eq!(outcome.language, LanguageCode::new("en"));
        assert_eq!(outcome.strategy, Strategy::Pipeline);
        assert_eq!(outcome.summary, "the city council approved");
        assert_eq!(
            store.get(record.id).unwrap().unwrap().summary,
            outcome.summary
        );
    }

    #[tokio::test]
    async fn test_summarize_text_russian() {
        let store = Arc::new(SummaryStore::open_in_memory().unwrap());
        let summary = orchestrator(RUSSIAN_ARTICLE, store)
            .summarize_text(RUSSIAN_ARTICLE)
            .await
            .unwrap();
        assert_eq!(summary.language, LanguageCode::new("ru"));
        assert_eq!(summary.strategy, Strategy::Generative);
        assert_eq!(summary.summary, "городской совет во вторник");
    }

    #[tokio::test]
    async fn test_summarize_url_does_not_persist() {
        let store = Arc::new(SummaryStore::open_in_memory().unwrap());
        let record = store.create_placeholder("https://example.com/en").unwrap();

        let summary = orchestrator(ENGLISH_ARTICLE, store.clone())
            .summarize_url(&record.url)
            .await
            .unwrap();

        assert_eq!(summary.summary, "the city council approved");
        assert!(store.get(record.id).unwrap().unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_missing_record_surfaces_store_error() {
        let store = Arc::new(SummaryStore::open_in_memory().unwrap());
        let err = orchestrator(ENGLISH_ARTICLE, store)
            .run(99, "https://example.com/en")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Store(_)));
    }

    #[tokio::test]
    async fn test_blank_text_is_invalid_input() {
        let store = Arc::new(SummaryStore::open_in_memory().unwrap());
        let err = orchestrator("   ", store).summarize_text("   ").await.unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Summarize(SummarizeError::InvalidInput(_))
        ));
    }
}
