//! Commander configuration
//!
//! Loaded from a TOML file, then overridden by `CMDR_*` environment
//! variables. Command-line flags are applied last by the CLI.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{CmdError, CmdErrorKind, CommandError, Result};
use crate::logging_facility::Profile;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "cmdr.toml";

pub const ENV_DATABASE_PATH: &str = "CMDR_DATABASE_PATH";
pub const ENV_CACHE_DIR: &str = "CMDR_CACHE_DIR";
pub const ENV_LOG_PROFILE: &str = "CMDR_LOG_PROFILE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommanderConfig {
    /// SQLite database holding command records and logs
    pub database_path: PathBuf,
    /// Root directory of the result cache
    pub cache_dir: PathBuf,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// "development" or "production"
    pub profile: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            profile: "development".to_string(),
        }
    }
}

impl Default for CommanderConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(".cmdr/commander.db"),
            cache_dir: PathBuf::from(".cmdr/cache"),
            logging: LoggingConfig::default(),
        }
    }
}

impl CommanderConfig {
    /// Load configuration and apply environment overrides
    ///
    /// An explicit path must exist. Without one, `cmdr.toml` in the working
    /// directory is read when present, and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CmdError::new(CmdErrorKind::Io)
                .with_op("load_config")
                .with_message(format!("{}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            CommandError::InvalidConfig {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATABASE_PATH).filter(|v| !v.is_empty()) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR).filter(|v| !v.is_empty()) {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(profile) = lookup(ENV_LOG_PROFILE).filter(|v| !v.is_empty()) {
            self.logging.profile = profile;
        }
        self
    }

    pub fn log_profile(&self) -> Result<Profile> {
        self.logging.profile.parse().map_err(|reason| {
            CommandError::InvalidConfig { reason }.into()
        })
    }
}
