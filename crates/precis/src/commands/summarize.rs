//! Summarize command - one-off summary without a stored record.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use precis_worker::DetachedWriter;

use super::{Context, read_input};
use crate::app;

/// Arguments for the summarize command.
#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Article URL to fetch and summarize
    #[arg(required_unless_present = "file")]
    pub url: Option<String>,

    /// Summarize the text of a local file instead
    #[arg(short, long, conflicts_with = "url")]
    pub file: Option<PathBuf>,
}

/// Run the summarize command.
pub async fn run(args: SummarizeArgs, ctx: &Context) -> Result<()> {
    let orchestrator = app::build_orchestrator(ctx.config(), Arc::new(DetachedWriter))?;

    let summary = match args.file {
        Some(path) => {
            let text = read_input(None, Some(&path))?;
            orchestrator.summarize_text(text).await?
        }
        None => {
            let url = read_input(args.url, None)?;
            orchestrator.summarize_url(&url).await?
        }
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let dim = Style::new().dim();
        println!("{} {}", dim.apply_to("Language:"), summary.language);
        println!("{} {}", dim.apply_to("Strategy:"), summary.strategy);
        println!();
        println!("{}", style("Summary").bold());
        println!("{}", dim.apply_to("─".repeat(50)));
        println!("{}", summary.summary);
    }
    Ok(())
}
