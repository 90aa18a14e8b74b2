//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [models]                        # models root
//! [models.language_detection]     # detection model
//! [models.summarizers.en]         # per-language summarizers
//! [database]                      # record store
//! [fetch]                         # article download
//! [worker]                        # task queue
//! [logging]                       # log files
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use precis_summarize::{
    DEFAULT_DETECTION_MODEL, DEFAULT_SUMMARIZER_MODEL_EN, DEFAULT_SUMMARIZER_MODEL_RU,
};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Application name for platform directory resolution.
pub(crate) const APP_NAME: &str = "precis";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecisConfig {
    /// Model locations and per-language summarizers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<ModelsConfig>,

    /// Summary record store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,

    /// Article download settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchConfig>,

    /// Task queue settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerConfig>,

    /// Log file settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

impl PrecisConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// A config with every section filled with its defaults.
    pub fn with_defaults() -> Self {
        Self {
            models: Some(ModelsConfig::with_defaults()),
            database: Some(DatabaseConfig::default()),
            fetch: Some(FetchConfig::default()),
            worker: Some(WorkerConfig::default()),
            logging: Some(LoggingConfig::default()),
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections replace each other wholesale, except `[models]`, which merges
    /// field by field and summarizer by summarizer.
    pub fn merge(&mut self, other: PrecisConfig) {
        match (&mut self.models, other.models) {
            (Some(models), Some(other)) => models.merge(other),
            (models, other @ Some(_)) => *models = other,
            _ => {}
        }

        if other.database.is_some() {
            self.database = other.database;
        }

        if other.fetch.is_some() {
            self.fetch = other.fetch;
        }

        if other.worker.is_some() {
            self.worker = other.worker;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Apply `PRECIS_*` environment overrides.
    ///
    /// Recognized variables:
    /// - `PRECIS_DATABASE_PATH`
    /// - `PRECIS_MODELS_DIR`
    /// - `PRECIS_LANGUAGE_DETECTION_MODEL`
    /// - `PRECIS_SUMMARIZER_MODEL_<LANG>` (e.g. `PRECIS_SUMMARIZER_MODEL_EN`)
    ///
    /// Returns the names of the variables that were applied.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> Vec<String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut applied = Vec::new();
        for (key, value) in vars {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "PRECIS_DATABASE_PATH" => {
                    self.database.get_or_insert_with(Default::default).path =
                        Some(PathBuf::from(value));
                }
                "PRECIS_MODELS_DIR" => {
                    self.models.get_or_insert_with(Default::default).dir =
                        Some(PathBuf::from(value));
                }
                "PRECIS_LANGUAGE_DETECTION_MODEL" => {
                    self.models
                        .get_or_insert_with(Default::default)
                        .language_detection
                        .get_or_insert_with(Default::default)
                        .model = value;
                }
                _ => {
                    let Some(lang) = key.strip_prefix("PRECIS_SUMMARIZER_MODEL_") else {
                        continue;
                    };
                    if lang.is_empty() {
                        continue;
                    }
                    self.models
                        .get_or_insert_with(Default::default)
                        .summarizers
                        .entry(lang.to_lowercase())
                        .or_default()
                        .model = Some(value);
                }
            }
            applied.push(key);
        }
        applied
    }

    /// Models section, or its defaults.
    pub fn models(&self) -> ModelsConfig {
        self.models.clone().unwrap_or_default()
    }

    /// Database section, or its defaults.
    pub fn database(&self) -> DatabaseConfig {
        self.database.clone().unwrap_or_default()
    }

    /// Fetch section, or its defaults.
    pub fn fetch(&self) -> FetchConfig {
        self.fetch.clone().unwrap_or_default()
    }

    /// Worker section, or its defaults.
    pub fn worker(&self) -> WorkerConfig {
        self.worker.clone().unwrap_or_default()
    }

    /// Logging section, or its defaults.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Models
// ─────────────────────────────────────────────────────────────────────────────

/// Model configuration.
///
/// ```toml
/// [models]
/// dir = "/var/lib/precis/models"
///
/// [models.language_detection]
/// model = "papluca/xlm-roberta-base-language-detection"
///
/// [models.summarizers.en]
/// model = "facebook/bart-large-cnn"
/// strategy = "pipeline"
/// ```
///
/// The built-in `en` and `ru` summarizers are always present; entries here
/// override their fields or add languages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Root directory holding one subdirectory per model identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Language detection model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_detection: Option<DetectionModelConfig>,

    /// Summarizers keyed by language code.
    pub summarizers: BTreeMap<String, SummarizerModelConfig>,
}

impl ModelsConfig {
    /// The built-in model table.
    pub fn with_defaults() -> Self {
        Self {
            dir: None,
            language_detection: Some(DetectionModelConfig::default()),
            summarizers: builtin_summarizers(),
        }
    }

    fn merge(&mut self, other: ModelsConfig) {
        if other.dir.is_some() {
            self.dir = other.dir;
        }
        if other.language_detection.is_some() {
            self.language_detection = other.language_detection;
        }
        for (lang, summarizer) in other.summarizers {
            match self.summarizers.get_mut(&lang) {
                Some(existing) => existing.merge(summarizer),
                None => {
                    self.summarizers.insert(lang, summarizer);
                }
            }
        }
    }

    /// Models root: configured, else the platform data dir.
    pub fn effective_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join(APP_NAME).join("models"))
                .unwrap_or_else(|| PathBuf::from("models"))
        })
    }

    /// Detection model, or its defaults.
    pub fn detection(&self) -> DetectionModelConfig {
        self.language_detection.clone().unwrap_or_default()
    }

    /// The built-in summarizers overlaid with the configured ones.
    ///
    /// Keys are lower-cased. Fails if a language has no model identifier.
    pub fn resolved_summarizers(&self) -> Result<BTreeMap<String, SummarizerModelConfig>> {
        let mut resolved = builtin_summarizers();
        for (lang, summarizer) in &self.summarizers {
            let lang = lang.trim().to_lowercase();
            match resolved.get_mut(&lang) {
                Some(existing) => existing.merge(summarizer.clone()),
                None => {
                    resolved.insert(lang, summarizer.clone());
                }
            }
        }

        for (lang, summarizer) in &resolved {
            if summarizer.model.as_deref().is_none_or(|m| m.trim().is_empty()) {
                return Err(ConfigError::MissingField {
                    field: "model".to_string(),
                    context: format!("[models.summarizers.{}]", lang),
                });
            }
        }
        Ok(resolved)
    }
}

fn builtin_summarizers() -> BTreeMap<String, SummarizerModelConfig> {
    BTreeMap::from([
        (
            "en".to_string(),
            SummarizerModelConfig {
                model: Some(DEFAULT_SUMMARIZER_MODEL_EN.to_string()),
                strategy: Some("pipeline".to_string()),
                max_input_tokens: Some(1024),
                max_length: Some(200),
                min_length: Some(50),
                ..Default::default()
            },
        ),
        (
            "ru".to_string(),
            SummarizerModelConfig {
                model: Some(DEFAULT_SUMMARIZER_MODEL_RU.to_string()),
                strategy: Some("generative".to_string()),
                max_input_tokens: Some(600),
                max_length: Some(200),
                no_repeat_ngram_size: Some(4),
                ..Default::default()
            },
        ),
    ])
}

/// Language detection model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionModelConfig {
    /// Model identifier.
    pub model: String,
    /// Explicit model directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Fixed encoding length for classifier input.
    pub max_tokens: usize,
}

impl Default for DetectionModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_DETECTION_MODEL.to_string(),
            path: None,
            max_tokens: 256,
        }
    }
}

/// Per-language summarizer settings. Unset fields keep the built-in value
/// for that language, or the strategy default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerModelConfig {
    /// Model identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Explicit model directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// "pipeline", "generative" or "extractive".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_input_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_repeat_ngram_size: Option<usize>,
}

impl SummarizerModelConfig {
    fn merge(&mut self, other: SummarizerModelConfig) {
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.path.is_some() {
            self.path = other.path;
        }
        if other.strategy.is_some() {
            self.strategy = other.strategy;
        }
        if other.max_input_tokens.is_some() {
            self.max_input_tokens = other.max_input_tokens;
        }
        if other.max_length.is_some() {
            self.max_length = other.max_length;
        }
        if other.min_length.is_some() {
            self.min_length = other.min_length;
        }
        if other.no_repeat_ngram_size.is_some() {
            self.no_repeat_ngram_size = other.no_repeat_ngram_size;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Database
// ─────────────────────────────────────────────────────────────────────────────

/// Record store settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Database file: configured, else `precis.db` in the platform data dir.
    pub fn effective_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join(APP_NAME).join("precis.db"))
                .unwrap_or_else(|| PathBuf::from("precis.db"))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fetch
// ─────────────────────────────────────────────────────────────────────────────

/// Article download settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum extracted text length in bytes.
    pub max_text_length: usize,
    /// Maximum response body size in bytes.
    pub max_body_bytes: usize,
    /// User-Agent header.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_text_length: 100_000,
            max_body_bytes: 10 * 1024 * 1024,
            user_agent: format!("precis/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker
// ─────────────────────────────────────────────────────────────────────────────

/// Task queue settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent workers.
    pub concurrency: usize,
    /// Attempts per job, first run included.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub initial_backoff_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            max_attempts: 3,
            initial_backoff_ms: 500,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Log file settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write JSON log files.
    pub file: bool,
    /// Directory for log files; defaults to `logs/` under the config dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: true,
            dir: None,
        }
    }
}
