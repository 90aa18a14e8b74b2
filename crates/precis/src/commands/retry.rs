//! Retry command - re-run summarization for a stored record.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use super::{Context, run_job};
use crate::app;

/// Arguments for the retry command.
#[derive(Args, Debug)]
pub struct RetryArgs {
    /// Record ID
    #[arg(value_parser = clap::value_parser!(i64).range(1..))]
    pub id: i64,
}

/// Run the retry command.
pub async fn run(args: RetryArgs, ctx: &Context) -> Result<()> {
    let store = app::open_store(ctx.config())?;
    let record = store
        .get(args.id)?
        .ok_or_else(|| anyhow::anyhow!("Record {} not found", args.id))?;

    let orchestrator = app::build_orchestrator(ctx.config(), Arc::new(store.clone()))?;
    run_job(ctx, store, orchestrator, &record).await
}
