//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - stratalog.toml (base configuration)
//! - stratalog.local.toml (git-ignored local overrides)
//! - Environment variables (STRATALOG_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # stratalog.toml
//! [logging]
//! level = "debug"
//!
//! [repl]
//! history_file = "~/.stratalog_history"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! STRATALOG_LOGGING__LEVEL=trace
//! STRATALOG_REPL__HISTORY_FILE=/tmp/history
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub repl: ReplConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Interactive shell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplConfig {
    /// Where readline history is kept; empty disables persistence.
    #[serde(default = "default_history_file")]
    pub history_file: String,

    /// Prompt shown at the start of each statement.
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_history_file() -> String {
    ".stratalog_history".to_string()
}
fn default_prompt() -> String {
    "> ".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. stratalog.toml (base configuration)
    /// 2. stratalog.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (STRATALOG_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("stratalog.toml"))
            .merge(Toml::file("stratalog.local.toml"))
            .merge(Env::prefixed("STRATALOG_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("STRATALOG_").split("__"))
            .extract()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: default_log_level() }
    }
}

impl Default for ReplConfig {
    fn default() -> Self {
        ReplConfig {
            history_file: default_history_file(),
            prompt: default_prompt(),
        }
    }
}
