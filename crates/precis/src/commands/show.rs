//! Show command - print one stored record.

use anyhow::Result;
use clap::Args;

use super::{Context, print_record};
use crate::app;

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Record ID
    #[arg(value_parser = clap::value_parser!(i64).range(1..))]
    pub id: i64,
}

/// Run the show command.
pub async fn run(args: ShowArgs, ctx: &Context) -> Result<()> {
    let store = app::open_store(ctx.config())?;
    let record = store
        .get(args.id)?
        .ok_or_else(|| anyhow::anyhow!("Record {} not found", args.id))?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
    }
    Ok(())
}
