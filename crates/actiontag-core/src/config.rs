use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConfigError, Result};

/// Top-level configuration for the action-tag pipeline.
///
/// Loaded from `~/.actiontag/config.toml` by default. Every section falls
/// back to its defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionTagConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub parser: ParserSettings,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl ActionTagConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ActionTagConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Parser tuning: which families are enabled and how aggressively
/// content payloads are screened for leaked action syntax.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Action families to unregister at startup (any spelling of a tag).
    pub disabled_tags: Vec<String>,
    /// A payload containing this many distinct raw action-tag patterns or
    /// more is rejected as corrupted. Zero disables the check.
    pub max_distinct_action_tags: usize,
    /// Number of literal `\n` + indentation sequences tolerated in a payload
    /// before it is considered to fake its newlines. Zero disables the check.
    pub max_escaped_newlines: usize,
    /// Reject edit bodies that contain a nested edit of the same file.
    pub detect_self_edit: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            disabled_tags: Vec::new(),
            max_distinct_action_tags: 3,
            max_escaped_newlines: 2,
            detect_self_edit: true,
        }
    }
}

/// Dispatch loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Execute only the first parsed action per model turn.
    pub one_at_a_time: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            one_at_a_time: true,
        }
    }
}
