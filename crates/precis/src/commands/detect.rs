//! Detect command - language detection for a text.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use console::Style;

use super::{Context, read_input};
use crate::app;

/// Arguments for the detect command.
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Text to classify
    #[arg(required_unless_present = "file")]
    pub text: Option<String>,

    /// Read the text from a file instead
    #[arg(short, long, conflicts_with = "text")]
    pub file: Option<PathBuf>,
}

/// Run the detect command.
pub async fn run(args: DetectArgs, ctx: &Context) -> Result<()> {
    let text = read_input(args.text, args.file.as_deref())?;
    let detector = Arc::new(app::build_detector(ctx.config())?);

    let language = tokio::task::spawn_blocking(move || detector.detect(&text)).await??;

    if ctx.json_output {
        let value = serde_json::json!({ "language": language });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if ctx.verbose {
        let dim = Style::new().dim();
        println!("{} {}", dim.apply_to("Language:"), language);
    } else {
        println!("{}", language);
    }
    Ok(())
}
