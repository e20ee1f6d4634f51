//! Centralized filesystem paths for Lucy.
//!
//! Uses the [`dirs`] crate for platform-appropriate locations.
//!
//! | Purpose | Linux default |
//! |---------|---------------|
//! | App data (facts, history, budgets) | `~/.local/share/lucy/` |
//! | Config | `~/.config/lucy/` |
//! | Logs | `~/.local/share/lucy/logs/` |
//!
//! # Environment Overrides
//!
//! - `LUCY_DATA_DIR` overrides [`data_dir`]
//! - `LUCY_CONFIG_DIR` overrides [`config_dir`]
//! - `LUCY_LOG_DIR` overrides [`logs_dir`]

use std::path::PathBuf;

/// Application data root.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("LUCY_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join("lucy"))
        .unwrap_or_else(|| PathBuf::from("/tmp/lucy-data"))
}

/// Configuration directory, holding `config.toml`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("LUCY_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .map(|d| d.join("lucy"))
        .unwrap_or_else(|| PathBuf::from("/tmp/lucy-config"))
}

/// Rolling log files.
#[must_use]
pub fn logs_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("LUCY_LOG_DIR") {
        return PathBuf::from(dir);
    }
    data_dir().join("logs")
}

/// Per-user fact files (`data_dir()/facts/`).
#[must_use]
pub fn facts_dir() -> PathBuf {
    data_dir().join("facts")
}

/// Per-user conversation logs (`data_dir()/history/`).
#[must_use]
pub fn history_dir() -> PathBuf {
    data_dir().join("history")
}

/// Generated budget PDFs (`data_dir()/budgets/`).
#[must_use]
pub fn budgets_dir() -> PathBuf {
    data_dir().join("budgets")
}

/// The user's home directory, if one can be determined.
#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}
