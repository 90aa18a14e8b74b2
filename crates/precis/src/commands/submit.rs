//! Submit command - store a URL and summarize it through the task queue.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use super::{Context, run_job};
use crate::app;

/// Arguments for the submit command.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Article URL (http or https)
    pub url: String,
}

/// Run the submit command.
pub async fn run(args: SubmitArgs, ctx: &Context) -> Result<()> {
    let url = precis_worker::parse_article_url(&args.url)?;

    let store = app::open_store(ctx.config())?;
    let orchestrator = app::build_orchestrator(ctx.config(), Arc::new(store.clone()))?;
    let record = store.create_placeholder(url.as_str())?;
    tracing::info!(record_id = record.id, url = %record.url, "Record created");

    run_job(ctx, store, orchestrator, &record).await
}
