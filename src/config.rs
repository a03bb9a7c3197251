//! Environment-driven settings.
//!
//! | Variable | Default |
//! |---|---|
//! | `SLEEPINSIGHT_DB_PATH` | `users.db` |
//! | `SLEEPINSIGHT_MODEL_PATH` | `models` |
//! | `SLEEPINSIGHT_LOG_MODE` | `auto` |
//! | `SLEEPINSIGHT_LOG_FILE` | `sleepinsight.log` |
//!
//! Log filtering itself is controlled by `RUST_LOG`.

use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "users.db";
pub const DEFAULT_MODEL_PATH: &str = "models";
pub const DEFAULT_LOG_FILE: &str = "sleepinsight.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogMode {
    /// File when attached to a terminal, stdout otherwise.
    #[default]
    Auto,
    File,
    Stdout,
}

impl LogMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Self::File,
            "stdout" => Self::Stdout,
            _ => Self::Auto,
        }
    }

    /// Whether to log to a file, given whether stdout is a terminal.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::File => true,
            Self::Stdout => false,
            Self::Auto => interactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub model_path: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            log_mode: LogMode::Auto,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl Config {
    /// Read settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            db_path: get("SLEEPINSIGHT_DB_PATH").map_or(defaults.db_path, PathBuf::from),
            model_path: get("SLEEPINSIGHT_MODEL_PATH").map_or(defaults.model_path, PathBuf::from),
            log_mode: get("SLEEPINSIGHT_LOG_MODE").map_or(defaults.log_mode, |v| LogMode::parse(&v)),
            log_file: get("SLEEPINSIGHT_LOG_FILE").map_or(defaults.log_file, PathBuf::from),
        }
    }
}
