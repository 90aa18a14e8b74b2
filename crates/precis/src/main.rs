//! Precis - article language detection and summarization
//!
//! Main entry point for the Precis CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

mod app;
mod commands;

use commands::{config, delete, detect, edit, list, retry, show, submit, summarize};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Precis - article language detection and summarization
#[derive(Parser)]
#[command(name = "precis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Load this config file on top of the discovered ones
    #[arg(long, global = true, env = "PRECIS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect the language of a text
    Detect(detect::DetectArgs),

    /// Summarize an article or text file without storing it
    Summarize(summarize::SummarizeArgs),

    /// Create a record for a URL and summarize it through the task queue
    Submit(submit::SubmitArgs),

    /// Re-run summarization for an existing record
    Retry(retry::RetryArgs),

    /// Show a stored record
    Show(show::ShowArgs),

    /// List stored records
    List(list::ListArgs),

    /// Replace the URL or summary of a stored record
    Edit(edit::EditArgs),

    /// Delete a stored record
    Delete(delete::DeleteArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = precis_config::load_config_with_options(precis_config::LoadOptions {
        file: cli.config.as_deref(),
        ..Default::default()
    })?;

    // Console (human-readable, stderr) + optional rotating JSON file
    let filter = if cli.verbose {
        "precis=debug,precis_summarize=debug,precis_worker=debug,precis_store=debug,precis_config=debug,info"
    } else {
        "precis=info,precis_summarize=info,precis_worker=info,precis_store=warn,warn"
    };

    let logging = loaded.config.logging();
    let (file_layer, _guard) = if logging.file {
        let log_dir = logging
            .dir
            .clone()
            .or_else(|| precis_config::xdg_config_dir().map(|d| d.join("logs")))
            .unwrap_or_else(|| PathBuf::from("logs"));
        let file_appender = tracing_appender::rolling::daily(&log_dir, "precis.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(tracing_subscriber::EnvFilter::new(
                "precis=trace,precis_summarize=trace,precis_worker=trace,precis_store=trace,precis_config=trace,info",
            ));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    if !loaded.env_overrides.is_empty() {
        tracing::debug!(overrides = ?loaded.env_overrides, "Environment overrides applied");
    }

    // Create context for commands
    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_file: cli.config,
        loaded,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Detect(args) => detect::run(args, &ctx).await,
        Commands::Summarize(args) => summarize::run(args, &ctx).await,
        Commands::Submit(args) => submit::run(args, &ctx).await,
        Commands::Retry(args) => retry::run(args, &ctx).await,
        Commands::Show(args) => show::run(args, &ctx).await,
        Commands::List(args) => list::run(args, &ctx).await,
        Commands::Edit(args) => edit::run(args, &ctx).await,
        Commands::Delete(args) => delete::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
