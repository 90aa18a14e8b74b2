//! Edit command - replace the URL or summary of a stored record.

use anyhow::Result;
use clap::{ArgGroup, Args};
use console::Style;

use super::{Context, print_record};
use crate::app;

/// Arguments for the edit command.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("changes").required(true).multiple(true).args(["url", "summary"])))]
pub struct EditArgs {
    /// Record ID
    #[arg(value_parser = clap::value_parser!(i64).range(1..))]
    pub id: i64,

    /// New article URL (http or https)
    #[arg(long)]
    pub url: Option<String>,

    /// New summary text
    #[arg(long)]
    pub summary: Option<String>,
}

/// Run the edit command.
pub async fn run(args: EditArgs, ctx: &Context) -> Result<()> {
    let url = args
        .url
        .as_deref()
        .map(precis_worker::parse_article_url)
        .transpose()?;

    let store = app::open_store(ctx.config())?;
    let current = store
        .get(args.id)?
        .ok_or_else(|| anyhow::anyhow!("Record {} not found", args.id))?;

    let url = url.map_or(current.url, |u| u.to_string());
    let summary = args.summary.unwrap_or(current.summary);
    let record = store.update(args.id, &url, &summary)?;
    tracing::info!(record_id = record.id, "Record edited");

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        let green = Style::new().green();
        println!("{} Record {} updated\n", green.apply_to("✓"), record.id);
        print_record(&record);
    }
    Ok(())
}
