//! In-process task queue for `generate_summary` jobs.
//!
//! A fixed pool of workers pulls jobs from a bounded channel and runs each
//! through the [`SummaryOrchestrator`]. Retryable failures are re-run from
//! scratch with exponential backoff; permanent ones are reported immediately.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Result, WorkerError};
use crate::orchestrator::{SummaryOrchestrator, SummaryOutcome};

/// Name of the summarization task.
pub const TASK_NAME: &str = "generate_summary";

/// Worker pool and retry settings.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Number of concurrent workers.
    pub concurrency: usize,
    /// Jobs that may wait in the channel before `submit` blocks.
    pub capacity: usize,
    /// Attempts per job, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each later retry.
    pub initial_backoff: Duration,
    /// Upper bound for the retry delay.
    pub max_backoff: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            capacity: 64,
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl QueueConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Arguments of a `generate_summary` task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryJob {
    pub record_id: i64,
    pub url: String,
}

impl SummaryJob {
    pub fn new(record_id: i64, url: impl Into<String>) -> Self {
        Self {
            record_id,
            url: url.into(),
        }
    }
}

/// Final state of a job.
#[derive(Debug)]
pub struct JobReport {
    pub job: SummaryJob,
    /// Attempts made, including the first.
    pub attempts: u32,
    pub outcome: Result<SummaryOutcome>,
}

/// Handle to a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    record_id: i64,
    rx: oneshot::Receiver<JobReport>,
}

impl JobHandle {
    pub fn record_id(&self) -> i64 {
        self.record_id
    }

    /// Wait for the job to finish.
    pub async fn wait(self) -> Result<JobReport> {
        self.rx.await.map_err(|_| {
            WorkerError::Task(format!("job for record {} was dropped", self.record_id))
        })
    }
}

struct Envelope {
    job: SummaryJob,
    reply: oneshot::Sender<JobReport>,
}

/// A running pool of summarization workers.
pub struct TaskQueue {
    sender: mpsc::Sender<Envelope>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskQueue {
    /// Spawn `config.concurrency` workers on the current runtime.
    pub fn start(orchestrator: SummaryOrchestrator, config: QueueConfig) -> Self {
        let concurrency = config.concurrency.max(1);
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let orchestrator = Arc::new(orchestrator);
        let config = Arc::new(config);

        let workers = (0..concurrency)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    Arc::clone(&receiver),
                    Arc::clone(&orchestrator),
                    Arc::clone(&config),
                ))
            })
            .collect();

        info!(concurrency, "Task queue started");
        Self { sender, workers }
    }

    /// Queue a job. Waits while the channel is full.
    pub async fn submit(&self, job: SummaryJob) -> Result<JobHandle> {
        let (reply, rx) = oneshot::channel();
        let record_id = job.record_id;
        self.sender
            .send(Envelope { job, reply })
            .await
            .map_err(|_| WorkerError::Task("task queue is shut down".to_string()))?;
        debug!(record_id, "Job queued");
        Ok(JobHandle { record_id, rx })
    }

    /// Queue a task by name.
    pub async fn dispatch(&self, task: &str, record_id: i64, url: &str) -> Result<JobHandle> {
        if task != TASK_NAME {
            return Err(WorkerError::Task(format!("unknown task '{}'", task)));
        }
        self.submit(SummaryJob::new(record_id, url)).await
    }

    /// Stop accepting jobs and wait for queued and in-flight jobs to finish.
    pub async fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("Worker task failed: {}", e);
            }
        }
        info!("Task queue stopped");
    }
}

async fn worker_loop(
    worker: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Envelope>>>,
    orchestrator: Arc<SummaryOrchestrator>,
    config: Arc<QueueConfig>,
) {
    loop {
        let envelope = receiver.lock().await.recv().await;
        let Some(Envelope { job, reply }) = envelope else {
            break;
        };

        let report = run_with_retry(&orchestrator, &config, job).await;
        match &report.outcome {
            Ok(_) => info!(
                worker,
                record_id = report.job.record_id,
                attempts = report.attempts,
                "Job completed"
            ),
            Err(e) => error!(
                worker,
                record_id = report.job.record_id,
                attempts = report.attempts,
                "Job failed: {}",
                e
            ),
        }
        // Submitter may have stopped waiting.
        let _ = reply.send(report);
    }
    debug!(worker, "Worker exiting");
}

async fn run_with_retry(
    orchestrator: &SummaryOrchestrator,
    config: &QueueConfig,
    job: SummaryJob,
) -> JobReport {
    let max_attempts = config.max_attempts.max(1);
    let mut attempts = 0;
    loop {
        attempts += 1;
        let outcome = orchestrator
            .generate_summary_for(job.record_id, &job.url)
            .await;

        match outcome {
            Err(e) if e.is_retryable() && attempts < max_attempts => {
                let delay = config.backoff(attempts);
                warn!(
                    record_id = job.record_id,
                    attempt = attempts,
                    ?delay,
                    "Retrying after error: {}",
                    e
                );
                tokio::time::sleep(delay).await;
            }
            outcome => {
                return JobReport {
                    job,
                    attempts,
                    outcome,
                };
            }
        }
    }
}
