//! Configuration for sigmash.
//!
//! The configuration file is located at `~/.sigmash/config.toml`:
//!
//! ```toml
//! # Prompt glyph written before each line
//! prompt = "Σ "
//!
//! # Raw-mode read window in milliseconds (rounded up to tenths of a second)
//! read_timeout_ms = 500
//!
//! [history]
//! enabled = true
//! file = "~/.sigmash/history"
//! limit = 1000
//!
//! [log]
//! level = "info"
//! file = "~/.sigmash/sigmash.log"
//! ```
//!
//! Every field is optional.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::raw::ReadTimeout;
use crate::ui::prompt::PROMPT_GLYPH;
use crate::ui::Prompt;

/// Directory under the home directory holding config, history and log
const APP_DIR: &str = ".sigmash";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prompt glyph
    pub prompt: String,
    /// Raw-mode read window
    pub read_timeout_ms: u64,
    pub history: HistoryConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: PROMPT_GLYPH.to_string(),
            read_timeout_ms: 500,
            history: HistoryConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// History settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub file: Option<PathBuf>,
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: None,
            limit: 1000,
        }
    }
}

/// Log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults.
    ///
    /// A missing file is not an error. Other failures are reported on stderr.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Self::default(),
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get config file path
    fn default_path() -> Option<PathBuf> {
        app_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn read_timeout(&self) -> ReadTimeout {
        ReadTimeout::from_millis(self.read_timeout_ms)
    }

    /// Prompt built from these settings
    pub fn prompt(&self) -> Prompt {
        Prompt::new(self.prompt.clone(), self.read_timeout())
    }

    /// History file, if history is enabled
    pub fn history_path(&self) -> Option<PathBuf> {
        if !self.history.enabled {
            return None;
        }
        match &self.history.file {
            Some(file) => Some(expand_home(file)),
            None => app_dir().map(|dir| dir.join("history")),
        }
    }

    pub fn log_path(&self) -> PathBuf {
        match &self.log.file {
            Some(file) => expand_home(file),
            None => app_dir()
                .map(|dir| dir.join("sigmash.log"))
                .unwrap_or_else(|| PathBuf::from("sigmash.log")),
        }
    }
}

/// `~/.sigmash`
fn app_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(APP_DIR))
}

/// Replace a leading `~` with the home directory
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
