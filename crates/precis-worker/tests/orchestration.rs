//! End-to-end orchestration tests with fixture models and recording
//! collaborators.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use precis_summarize::testing::{ENGLISH_ARTICLE, FixtureLoader, LOREM_IPSUM, RUSSIAN_ARTICLE};
use precis_summarize::{
    DetectorSpec, LanguageCode, LanguageDetector, Strategy, SummarizeError, SummarizerRegistry,
    SummarizerSpec, default_table,
};
use precis_worker::{
    ArticleFetcher, QueueConfig, SummaryJob, SummaryOrchestrator, SummaryWriter, TaskQueue,
    WorkerError,
};
use tokio::sync::Mutex;

struct FixedFetcher {
    text: Option<&'static str>,
    calls: AtomicUsize,
}

impl FixedFetcher {
    fn ok(text: &'static str) -> Arc<Self> {
        Arc::new(Self {
            text: Some(text),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            text: None,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ArticleFetcher for FixedFetcher {
    async fn fetch_article_text(&self, url: &str) -> precis_worker::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.text {
            Some(text) => Ok(text.to_string()),
            None => Err(WorkerError::fetch(format!("{} returned HTTP 503", url))),
        }
    }
}

#[derive(Default)]
struct RecordingWriter {
    writes: Mutex<Vec<(i64, String)>>,
}

#[async_trait]
impl SummaryWriter for RecordingWriter {
    async fn update_summary(&self, record_id: i64, summary: &str) -> precis_worker::Result<()> {
        self.writes.lock().await.push((record_id, summary.to_string()));
        Ok(())
    }
}

fn orchestrator(
    fetcher: Arc<FixedFetcher>,
    writer: Arc<RecordingWriter>,
    table: HashMap<LanguageCode, SummarizerSpec>,
) -> (SummaryOrchestrator, Arc<FixtureLoader>) {
    let loader = Arc::new(FixtureLoader::new().with_summary_tokens(6));
    let detector = LanguageDetector::new(DetectorSpec::new("fixture"), loader.clone());
    let registry = SummarizerRegistry::new(table, loader.clone());
    let orchestrator =
        SummaryOrchestrator::new(fetcher, Arc::new(detector), Arc::new(registry), writer);
    (orchestrator, loader)
}

#[tokio::test]
async fn run_persists_exactly_once() {
    let fetcher = FixedFetcher::ok(ENGLISH_ARTICLE);
    let writer = Arc::new(RecordingWriter::default());
    let (orchestrator, _) = orchestrator(fetcher.clone(), writer.clone(), default_table());

    let outcome = orchestrator
        .run(42, "https://example.com/news")
        .await
        .unwrap();

    assert_eq!(outcome.record_id, 42);
    assert_eq!(outcome.language.as_str(), "en");
    assert_eq!(outcome.strategy, Strategy::Pipeline);
    assert_eq!(outcome.summary, "the city council approved a new");

    let writes = writer.writes.lock().await;
    assert_eq!(*writes, vec![(42, outcome.summary.clone())]);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn run_summarizes_lorem_ipsum_into_record() {
    let fetcher = FixedFetcher::ok(LOREM_IPSUM);
    let writer = Arc::new(RecordingWriter::default());
    let (orchestrator, loader) = orchestrator(fetcher, writer.clone(), default_table());

    let outcome = orchestrator
        .run(42, "https://example.com/lorem")
        .await
        .unwrap();

    assert_eq!(outcome.record_id, 42);
    assert_eq!(outcome.language.as_str(), "en");
    assert_eq!(outcome.strategy, Strategy::Pipeline);
    assert!(outcome.summary.starts_with("lorem ipsum dolor sit amet"));
    assert!(outcome.summary.len() < LOREM_IPSUM.len());

    let writes = writer.writes.lock().await;
    assert_eq!(*writes, vec![(42, outcome.summary.clone())]);
    assert_eq!(loader.detector_loads(), 1);
    assert_eq!(loader.summarizer_loads(), 1);
}

#[tokio::test]
async fn fetch_failure_persists_nothing() {
    let fetcher = FixedFetcher::failing();
    let writer = Arc::new(RecordingWriter::default());
    let (orchestrator, loader) = orchestrator(fetcher, writer.clone(), default_table());

    let err = orchestrator
        .generate_summary_for(42, "https://example.com/down")
        .await
        .unwrap_err();

    assert!(matches!(err, WorkerError::Fetch(_)));
    assert!(writer.writes.lock().await.is_empty());
    assert_eq!(loader.detector_loads(), 0);
    assert_eq!(loader.summarizer_loads(), 0);
}

#[tokio::test]
async fn unsupported_language_persists_nothing() {
    let table = HashMap::from([(
        LanguageCode::new("en"),
        SummarizerSpec::new("fixture-en"),
    )]);
    let writer = Arc::new(RecordingWriter::default());
    let (orchestrator, loader) = orchestrator(FixedFetcher::ok(RUSSIAN_ARTICLE), writer.clone(), table);

    let err = orchestrator.run(7, "https://example.ru/news").await.unwrap_err();

    assert!(matches!(
        err,
        WorkerError::Summarize(SummarizeError::UnsupportedLanguage(ref lang)) if lang == "ru"
    ));
    assert!(!err.is_retryable());
    assert!(writer.writes.lock().await.is_empty());
    assert_eq!(loader.summarizer_loads(), 0);
}

#[tokio::test]
async fn summarizer_is_reused_across_runs() {
    let writer = Arc::new(RecordingWriter::default());
    let (orchestrator, loader) =
        orchestrator(FixedFetcher::ok(ENGLISH_ARTICLE), writer.clone(), default_table());

    let first = orchestrator.run(1, "https://example.com/1").await.unwrap();
    let second = orchestrator.run(2, "https://example.com/2").await.unwrap();

    assert_eq!(first.summary, second.summary);
    assert_eq!(loader.detector_loads(), 1);
    assert_eq!(loader.summarizer_loads(), 1);
    assert_eq!(orchestrator.registry().constructed(), 1);
    assert_eq!(writer.writes.lock().await.len(), 2);
}

#[tokio::test]
async fn queued_job_recovers_from_transient_model_load_failure() {
    let writer = Arc::new(RecordingWriter::default());
    let loader = Arc::new(FixtureLoader::new().fail_once("en"));
    let detector = LanguageDetector::new(DetectorSpec::new("fixture"), loader.clone());
    let registry = SummarizerRegistry::new(default_table(), loader.clone());
    let orchestrator = SummaryOrchestrator::new(
        FixedFetcher::ok(ENGLISH_ARTICLE),
        Arc::new(detector),
        Arc::new(registry),
        writer.clone(),
    );
    let queue = TaskQueue::start(
        orchestrator,
        QueueConfig::default().with_initial_backoff(std::time::Duration::from_millis(1)),
    );

    let report = queue
        .submit(SummaryJob::new(42, "https://example.com/news"))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    queue.shutdown().await;

    assert_eq!(report.attempts, 2);
    assert_eq!(report.outcome.unwrap().record_id, 42);
    assert_eq!(loader.summarizer_loads(), 1);
    assert_eq!(writer.writes.lock().await.len(), 1);
}
