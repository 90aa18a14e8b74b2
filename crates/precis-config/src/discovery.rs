//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/precis/config.toml` (user config)
//! 2. `./precis.toml` (project-local)
//! 3. An explicit `--config <file>`
//! 4. `PRECIS_*` environment variables

use std::path::{Path, PathBuf};

use crate::types::APP_NAME;
use crate::{ConfigError, PrecisConfig, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "precis.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "PRECIS_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: PrecisConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Environment variables that overrode file values.
    pub env_overrides: Vec<String>,
    /// Warnings generated during loading (e.g. malformed files).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Options controlling discovery.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions<'a> {
    /// Directory searched for `precis.toml` (default: current directory).
    pub project_dir: Option<&'a Path>,
    /// User config directory, overriding `PRECIS_CONFIG_DIR` and the
    /// platform default.
    pub config_dir: Option<&'a Path>,
    /// Explicit config file; must exist.
    pub file: Option<&'a Path>,
    /// Skip `PRECIS_*` environment overrides.
    pub ignore_env: bool,
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(LoadOptions {
        project_dir,
        ..Default::default()
    })
}

/// Load configuration with explicit control over every layer.
pub fn load_config_with_options(options: LoadOptions<'_>) -> Result<LoadedConfig> {
    let mut config = PrecisConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    // 1. User config: explicit override, then env var, then platform default
    let user_config_path = match options.config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    // 2. Project-local config
    let project_path = options
        .project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    // 3. Explicit file: errors are fatal
    if let Some(path) = options.file {
        config.merge(load_config_file(path)?);
        sources.push(ConfigSource {
            path: path.to_path_buf(),
            loaded: true,
        });
    }

    // 4. Environment
    let env_overrides = if options.ignore_env {
        Vec::new()
    } else {
        config.apply_env_overrides(std::env::vars())
    };

    Ok(LoadedConfig {
        config,
        sources,
        env_overrides,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<PrecisConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    PrecisConfig::from_toml(&contents)
}

/// Save configuration to a file.
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &PrecisConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Path of the project-local config file in the current directory.
pub fn project_config_path() -> PathBuf {
    PathBuf::from(PROJECT_CONFIG_FILE)
}

/// Get the user config file path.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// Get the user config directory for precis.
///
/// Checks `PRECIS_CONFIG_DIR` first, then falls back to the platform default
/// (`~/.config/precis` on Linux, `~/Library/Application Support/precis` on macOS).
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Try to load a config file and merge it into the existing config.
///
/// Missing files are skipped; malformed files are skipped with a warning.
fn load_layer(config: &mut PrecisConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn isolated<'a>(project: &'a Path, config_dir: &'a Path) -> LoadOptions<'a> {
        LoadOptions {
            project_dir: Some(project),
            config_dir: Some(config_dir),
            file: None,
            ignore_env: true,
        }
    }

    #[test]
    fn test_xdg_config_path_shape() {
        if let Some(p) = xdg_config_path() {
            assert!(p.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[worker]\nconcurrency = 7\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.worker().concurrency, 7);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_no_files() {
        let project = TempDir::new().unwrap();
        let config_dir = TempDir::new().unwrap();
        let loaded = load_config_with_options(isolated(project.path(), config_dir.path())).unwrap();
        assert_eq!(loaded.config, PrecisConfig::new());
        assert!(loaded.loaded_from().is_empty());
    }

    #[test]
    fn test_layered_merge() {
        let project = TempDir::new().unwrap();
        let config_dir = TempDir::new().unwrap();
        fs::write(
            config_dir.path().join("config.toml"),
            r#"
[worker]
concurrency = 2

[fetch]
timeout_secs = 60
"#,
        )
        .unwrap();
        fs::write(
            project.path().join("precis.toml"),
            "[worker]\nconcurrency = 6\n",
        )
        .unwrap();

        let loaded = load_config_with_options(isolated(project.path(), config_dir.path())).unwrap();
        assert_eq!(loaded.config.worker().concurrency, 6);
        assert_eq!(loaded.config.fetch().timeout_secs, 60);
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_explicit_file_wins() {
        let project = TempDir::new().unwrap();
        let config_dir = TempDir::new().unwrap();
        fs::write(
            project.path().join("precis.toml"),
            "[database]\npath = \"project.db\"\n",
        )
        .unwrap();
        let explicit = project.path().join("explicit.toml");
        fs::write(&explicit, "[database]\npath = \"explicit.db\"\n").unwrap();

        let loaded = load_config_with_options(LoadOptions {
            file: Some(&explicit),
            ..isolated(project.path(), config_dir.path())
        })
        .unwrap();
        assert_eq!(
            loaded.config.database().effective_path(),
            PathBuf::from("explicit.db")
        );
        assert!(loaded.loaded_from().iter().any(|p| p.ends_with("explicit.toml")));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let project = TempDir::new().unwrap();
        let config_dir = TempDir::new().unwrap();
        let missing = project.path().join("missing.toml");
        let result = load_config_with_options(LoadOptions {
            file: Some(&missing),
            ..isolated(project.path(), config_dir.path())
        });
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_malformed_config_warns_but_continues() {
        let project = TempDir::new().unwrap();
        let config_dir = TempDir::new().unwrap();
        fs::write(project.path().join("precis.toml"), "not valid toml {{{{").unwrap();

        let loaded = load_config_with_options(isolated(project.path(), config_dir.path())).unwrap();
        assert!(!loaded.warnings.is_empty());
        assert!(loaded.warnings[0].contains("Failed to load"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = PrecisConfig::with_defaults();
        save_config(&config, &path).unwrap();

        let reloaded = load_config_file(&path).unwrap();
        assert_eq!(reloaded, config);
    }
}
