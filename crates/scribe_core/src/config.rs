//! Configuration loaded from `.scribe/config.toml`.

use crate::error::{Result, ScribeError};
use crate::types::Priority;
use crate::word_diff::DiffOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Repository-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Word diff settings.
    #[serde(default)]
    pub diff: DiffOptions,

    /// Annotation defaults.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl Config {
    /// Load configuration from `<scribe_root>/config.toml`, or defaults if
    /// the file does not exist.
    pub fn load(scribe_root: &Path) -> Result<Self> {
        let path = scribe_root.join("config.toml");
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| ScribeError::ConfigError(format!("failed to read config: {}", e)))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| ScribeError::ConfigError(format!("failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to `<scribe_root>/config.toml`.
    pub fn save(&self, scribe_root: &Path) -> Result<()> {
        let path = scribe_root.join("config.toml");
        let content = toml::to_string_pretty(self).map_err(|e| {
            ScribeError::ConfigError(format!("failed to serialize config: {}", e))
        })?;
        fs::write(&path, content)
            .map_err(|e| ScribeError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.diff.max_tokens == 0 {
            return Err(ScribeError::ConfigError(
                "diff.max_tokens must be at least 1".to_string(),
            ));
        }
        if self.diff.minimum_token_length == 0 {
            return Err(ScribeError::ConfigError(
                "diff.minimum_token_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Annotation defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReviewConfig {
    /// Priority for new annotations that do not name one (default: medium).
    pub default_priority: Priority,

    /// Lines captured on each side of an annotation as context snapshots
    /// (default: 1, 0 disables).
    pub context_lines: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            default_priority: Priority::Medium,
            context_lines: 1,
        }
    }
}
