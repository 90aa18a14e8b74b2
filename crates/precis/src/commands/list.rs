//! List command - page through stored records.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::{Context, truncate};
use crate::app;

/// Arguments for the list command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Maximum records to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Records to skip (newest first)
    #[arg(short, long, default_value = "0")]
    pub offset: usize,
}

/// Run the list command.
pub async fn run(args: ListArgs, ctx: &Context) -> Result<()> {
    let store = app::open_store(ctx.config())?;
    let records = store.list(args.limit, args.offset)?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", style("Summaries").bold());
    println!("{}", dim.apply_to("─".repeat(50)));

    if records.is_empty() {
        println!("{}", dim.apply_to("No records found"));
        return Ok(());
    }

    for record in &records {
        let status = if record.is_pending() {
            Style::new().yellow().apply_to("pending")
        } else {
            Style::new().green().apply_to("done   ")
        };
        println!(
            "{} {} {} {}",
            dim.apply_to(format!("[{:>5}]", record.id)),
            dim.apply_to(record.created_at.format("%Y-%m-%d %H:%M")),
            status,
            record.url
        );
        if ctx.verbose && !record.is_pending() {
            println!("        {}", truncate(&record.summary, 70));
        }
    }

    let total = store.count()?;
    let shown = args.offset + records.len();
    if total > shown {
        println!();
        println!(
            "{}",
            dim.apply_to(format!("... and {} more (use --offset {})", total - shown, shown))
        );
    }
    Ok(())
}
