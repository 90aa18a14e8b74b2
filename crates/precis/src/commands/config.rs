//! Config command - configuration management.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration and the files it came from
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./precis.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local } => cmd_init(local),
        ConfigCommand::Path => cmd_path(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = ctx.config();
    let models = config.models();
    let summarizers = models.resolved_summarizers()?;

    if ctx.json_output {
        let value = serde_json::json!({
            "sources": loaded.loaded_from(),
            "env_overrides": loaded.env_overrides,
            "models_dir": models.effective_dir(),
            "database": config.database().effective_path(),
            "language_detection": models.detection(),
            "summarizers": summarizers,
            "fetch": config.fetch(),
            "worker": config.worker(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("# Precis Configuration\n");

    // Sources
    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }
    if !loaded.env_overrides.is_empty() {
        println!("Environment overrides:");
        for name in &loaded.env_overrides {
            println!("  {}", name);
        }
        println!();
    }

    // Models
    let detection = models.detection();
    println!("Models directory: {}", models.effective_dir().display());
    println!(
        "Language detection: {} (max {} tokens)",
        detection.model, detection.max_tokens
    );
    println!();
    println!("Summarizers:");
    for (lang, summarizer) in &summarizers {
        println!(
            "  {:<4} {}  [{}]",
            lang,
            summarizer.model.as_deref().unwrap_or("-"),
            summarizer.strategy.as_deref().unwrap_or("by language")
        );
    }
    println!();

    // Runtime
    let fetch = config.fetch();
    let worker = config.worker();
    println!("Database: {}", config.database().effective_path().display());
    println!(
        "Fetch:    timeout {}s, max {} bytes of text",
        fetch.timeout_secs, fetch.max_text_length
    );
    println!(
        "Worker:   {} worker(s), {} attempt(s), {}ms initial backoff",
        worker.concurrency, worker.max_attempts, worker.initial_backoff_ms
    );

    if ctx.verbose {
        println!("\n# Effective TOML\n");
        print!("{}", config.to_toml()?);
    }

    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;

    if ctx.json_output {
        let sources: Vec<_> = loaded
            .sources
            .iter()
            .map(|s| serde_json::json!({ "path": s.path, "loaded": s.loaded }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'precis config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

const CONFIG_TEMPLATE: &str = r#"# Precis Configuration

# Where model directories live (one subdirectory per model identifier)
# [models]
# dir = "/var/lib/precis/models"

[models.language_detection]
model = "papluca/xlm-roberta-base-language-detection"
max_tokens = 256

# Built-in summarizers; override fields or add languages
[models.summarizers.en]
model = "facebook/bart-large-cnn"
strategy = "pipeline"

[models.summarizers.ru]
model = "IlyaGusev/mbart_ru_sum_gazeta"
strategy = "generative"

# Keyword-based summaries need no model files
# [models.summarizers.de]
# model = "extractive"
# strategy = "extractive"

# [database]
# path = "precis.db"

[fetch]
timeout_secs = 30
max_text_length = 100000

[worker]
concurrency = 2
max_attempts = 3
initial_backoff_ms = 500
"#;

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        precis_config::project_config_path()
    } else {
        let dir = precis_config::xdg_config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        std::fs::create_dir_all(&dir)?;
        dir.join("config.toml")
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    std::fs::write(&path, CONFIG_TEMPLATE)?;
    println!("Created config file: {}", path.display());
    Ok(())
}

fn cmd_path() -> Result<()> {
    if let Some(path) = precis_config::xdg_config_path() {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}
