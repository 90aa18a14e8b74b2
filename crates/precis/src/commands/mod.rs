//! CLI command handlers.

pub mod config;
pub mod delete;
pub mod detect;
pub mod edit;
pub mod list;
pub mod retry;
pub mod show;
pub mod submit;
pub mod summarize;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use console::{Style, style};
use precis_config::{LoadedConfig, PrecisConfig};
use precis_store::{SummaryRecord, SummaryStore};
use precis_worker::{SummaryOrchestrator, TASK_NAME, TaskQueue};

use crate::app;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Config file passed with `--config`.
    pub config_file: Option<PathBuf>,
    /// Resolved configuration and where it came from.
    pub loaded: LoadedConfig,
}

impl Context {
    pub fn config(&self) -> &PrecisConfig {
        &self.loaded.config
    }
}

/// Read the input text from a positional argument or `--file`.
pub(crate) fn read_input(text: Option<String>, file: Option<&Path>) -> Result<String> {
    match (text, file) {
        (_, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        (Some(text), None) => Ok(text),
        (None, None) => anyhow::bail!("Provide the input as an argument or with --file"),
    }
}

/// Run the summarization task for `record` through the queue and print the
/// updated record.
pub(crate) async fn run_job(
    ctx: &Context,
    store: Arc<SummaryStore>,
    orchestrator: SummaryOrchestrator,
    record: &SummaryRecord,
) -> Result<()> {
    let queue = TaskQueue::start(orchestrator, app::queue_config(ctx.config()));
    let handle = queue.dispatch(TASK_NAME, record.id, &record.url).await?;
    let report = handle.wait().await?;
    queue.shutdown().await;

    let outcome = report.outcome.with_context(|| {
        format!(
            "Summarization of record {} failed after {} attempt(s); the record is left pending",
            record.id, report.attempts
        )
    })?;

    let updated = store
        .get(record.id)?
        .ok_or_else(|| anyhow::anyhow!("Record {} disappeared", record.id))?;

    if ctx.json_output {
        let value = serde_json::json!({
            "record": updated,
            "language": outcome.language,
            "strategy": outcome.strategy,
            "attempts": report.attempts,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let dim = Style::new().dim();
        println!("{} {}", dim.apply_to("Language:"), outcome.language);
        println!("{} {}", dim.apply_to("Strategy:"), outcome.strategy);
        if ctx.verbose {
            println!("{} {}", dim.apply_to("Attempts:"), report.attempts);
        }
        println!();
        print_record(&updated);
    }
    Ok(())
}

/// Print one record in human-readable form.
pub(crate) fn print_record(record: &SummaryRecord) {
    let dim = Style::new().dim();
    println!("{}", style(format!("Record {}", record.id)).bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!("{} {}", dim.apply_to("URL:    "), record.url);
    println!(
        "{} {}",
        dim.apply_to("Created:"),
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    if record.is_pending() {
        println!("{}", dim.apply_to("(summary pending)"));
    } else {
        println!("{}", record.summary);
    }
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
