//! Configuration file support for sessionguard.
//!
//! Loads `sessionguard.toml` from the working directory, falling back to the
//! user config directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use sessionguard_core::GuardOptions;

/// Configuration loaded from `sessionguard.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Options handed to the session guard
    #[serde(default)]
    pub guard: GuardOptions,
    /// Diagnostics settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Tracing filter level (e.g. "info", "sessionguard_core=debug")
    pub level: Option<String>,
    /// Console format: pretty, json or compact
    pub format: Option<String>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "sessionguard.toml";

impl ProjectConfig {
    /// Load configuration from the working directory or the user config dir.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if a file exists and parses successfully
    /// - `Ok(None)` if no file exists
    /// - `Err(...)` if a file exists but fails to parse or validate
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        match find_config(working_dir, user_config_path()) {
            Some(path) => Self::load_from(&path).map(Some),
            None => Ok(None),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config
            .guard
            .validate()
            .with_context(|| format!("Invalid [guard] options in {}", path.display()))?;

        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sessionguard").join(CONFIG_FILE_NAME))
}

/// Working directory file wins over the fallback
fn find_config(working_dir: &Path, fallback: Option<PathBuf>) -> Option<PathBuf> {
    let local = working_dir.join(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    fallback.filter(|path| path.exists())
}
