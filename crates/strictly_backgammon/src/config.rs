//! Tracker configuration.

use crate::error::{MatchError, MatchErrorKind};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Where and how the tracker keeps its match files.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Directory holding the live match file.
    match_dir: PathBuf,

    /// Directory receiving archived match files.
    archive_dir: PathBuf,

    /// Name of the live match file inside `match_dir`.
    #[serde(default = "default_file_name")]
    file_name: String,

    /// Application name written into exported tree notation.
    #[serde(default = "default_application")]
    application: String,

    /// Whether new matches use the Crawford rule.
    #[serde(default = "default_crawford")]
    crawford: bool,
}

#[instrument]
fn default_file_name() -> String {
    "current.md".to_string()
}

#[instrument]
fn default_application() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

#[instrument]
fn default_crawford() -> bool {
    true
}

impl TrackerConfig {
    /// Creates a configuration with default file name, application and
    /// Crawford setting.
    #[instrument(skip(match_dir, archive_dir))]
    pub fn new(match_dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            match_dir: match_dir.into(),
            archive_dir: archive_dir.into(),
            file_name: default_file_name(),
            application: default_application(),
            crawford: default_crawford(),
        }
    }

    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MatchError> {
        debug!("Loading tracker config");
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            MatchError::new(
                MatchErrorKind::Config,
                format!("Failed to read config file: {}", e),
            )
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            MatchError::new(MatchErrorKind::Config, format!("Failed to parse config: {}", e))
        })?;

        info!(match_dir = %config.match_dir.display(), "Tracker config loaded");
        Ok(config)
    }

    /// Full path of the live match file.
    pub fn match_path(&self) -> PathBuf {
        self.match_dir.join(&self.file_name)
    }

    /// Sets the live file name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Sets the Crawford rule for new matches.
    pub fn with_crawford(mut self, crawford: bool) -> Self {
        self.crawford = crawford;
        self
    }
}
