//! learnkeep configuration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use learnkeep_core::adaptive::{AdaptationSettings, DEFAULT_RECENT_WINDOW};
use learnkeep_store::DEFAULT_RETENTION;

use crate::error::RecordsError;

/// Name of the project-local config file.
pub const CONFIG_FILE_NAME: &str = "learnkeep.toml";

/// Environment variable overriding `data_dir`.
pub const DATA_DIR_ENV: &str = "LEARNKEEP_DATA_DIR";

/// Adaptation switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptationConfig {
    /// Games for which automatic difficulty changes are turned off.
    #[serde(default)]
    pub disabled_games: Vec<String>,
}

/// Top-level learnkeep configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnkeepConfig {
    /// Directory holding the data documents and the `backups/` tree.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Snapshots kept before the oldest are pruned.
    #[serde(default = "default_retention")]
    pub backup_retention: usize,
    /// Sessions (including the one just finished) fed to the difficulty
    /// controller.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
    #[serde(default)]
    pub adaptation: AdaptationConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_retention() -> usize {
    DEFAULT_RETENTION
}
fn default_recent_window() -> usize {
    DEFAULT_RECENT_WINDOW
}

impl Default for LearnkeepConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backup_retention: default_retention(),
            recent_window: default_recent_window(),
            adaptation: AdaptationConfig::default(),
        }
    }
}

impl LearnkeepConfig {
    /// Reject values the store and controller cannot work with.
    pub fn validate(&self) -> Result<(), RecordsError> {
        if self.backup_retention == 0 {
            return Err(RecordsError::InvalidConfig(
                "backup_retention must be at least 1".into(),
            ));
        }
        if self.recent_window == 0 {
            return Err(RecordsError::InvalidConfig(
                "recent_window must be at least 1".into(),
            ));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(RecordsError::InvalidConfig("data_dir must not be empty".into()));
        }
        Ok(())
    }

    pub fn adaptation_settings(&self) -> AdaptationSettings {
        AdaptationSettings {
            disabled_games: self
                .adaptation
                .disabled_games
                .iter()
                .cloned()
                .collect::<BTreeSet<_>>(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `learnkeep.toml` in the current directory
/// 2. `~/.config/learnkeep/config.toml`
///
/// `LEARNKEEP_DATA_DIR` overrides `data_dir`.
pub fn load_config() -> Result<LearnkeepConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<LearnkeepConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => LearnkeepConfig::default(),
    };

    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            config.data_dir = PathBuf::from(dir);
        }
    }
    config.data_dir = PathBuf::from(resolve_env_vars(&config.data_dir.to_string_lossy()));

    config.validate()?;
    tracing::debug!(
        source = ?config_path,
        data_dir = %config.data_dir.display(),
        "configuration loaded"
    );
    Ok(config)
}

/// Parse a config document without touching the environment.
pub fn parse_config(content: &str) -> Result<LearnkeepConfig> {
    Ok(toml::from_str::<LearnkeepConfig>(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("learnkeep"))
}
