//! Configuration system for Precis.
//!
//! Provides TOML-based configuration with:
//! - Per-language summarizer models (`[models.summarizers.<lang>]`) on top of
//!   built-in English and Russian entries
//! - Config file layering (user config + project-local + explicit file)
//! - `PRECIS_*` environment overrides

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    load_config, load_config_file, load_config_with_options, project_config_path, save_config,
    xdg_config_dir, xdg_config_path, ConfigSource, LoadOptions, LoadedConfig,
};
pub use error::{ConfigError, Result};
pub use types::*;
