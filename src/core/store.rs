//! Store abstraction for Ulwazi's on-disk state.
//!
//! A store is a single data directory holding the KSB database, the
//! `config.toml` document with the current course, and the broker audit log.

use crate::core::error::UlwaziError;
use crate::core::schemas;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory.
pub const HOME_ENV: &str = "ULWAZI_HOME";

/// Default data directory name under the user's home.
pub const DEFAULT_DIR_NAME: &str = ".ulwazi";

/// Handle to an Ulwazi data directory.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the data directory
    pub root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the data directory from an explicit override (the `--home`
    /// flag, which clap also fills from `ULWAZI_HOME`) or `~/.ulwazi`, and
    /// make sure it exists.
    pub fn resolve(home_override: Option<&Path>) -> Result<Store, UlwaziError> {
        let root = match home_override {
            Some(dir) => dir.to_path_buf(),
            None => dirs::home_dir()
                .ok_or_else(|| {
                    UlwaziError::PathError(format!(
                        "could not determine home directory; set {} or pass --home",
                        HOME_ENV
                    ))
                })?
                .join(DEFAULT_DIR_NAME),
        };
        fs::create_dir_all(&root)?;
        Ok(Store { root })
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join(schemas::ULWAZI_DB_NAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(schemas::CONFIG_FILE_NAME)
    }

    pub fn legacy_config_path(&self) -> PathBuf {
        self.root.join(schemas::LEGACY_CONFIG_FILE_NAME)
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join(schemas::BROKER_EVENTS_NAME)
    }
}
