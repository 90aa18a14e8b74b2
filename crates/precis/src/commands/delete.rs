//! Delete command - remove a stored record.

use anyhow::Result;
use clap::Args;
use console::Style;

use super::Context;
use crate::app;

/// Arguments for the delete command.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Record ID
    #[arg(value_parser = clap::value_parser!(i64).range(1..))]
    pub id: i64,
}

/// Run the delete command.
pub async fn run(args: DeleteArgs, ctx: &Context) -> Result<()> {
    let store = app::open_store(ctx.config())?;
    if !store.delete(args.id)? {
        anyhow::bail!("Record {} not found", args.id);
    }

    if ctx.json_output {
        let value = serde_json::json!({ "deleted": args.id });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let green = Style::new().green();
        println!("{} Record {} deleted", green.apply_to("✓"), args.id);
    }
    Ok(())
}
