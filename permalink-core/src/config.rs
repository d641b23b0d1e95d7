// User settings stored next to the database

use crate::error::Result;
use permalink_engine::RewriteOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/permalink/";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DATABASE_FILE_NAME: &str = "permalink.db";
/// Overrides the settings file location.
pub const CONFIG_ENV_VAR: &str = "PERMALINK_CONFIG";
/// Log filter for the CLI, e.g. `permalink_core=debug`.
pub const LOG_ENV_VAR: &str = "PERMALINK_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: PathBuf,
    pub rewrite: RewriteOptions,
    /// Bound of the regeneration queue used by `reindex`
    pub queue_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: config_dir().join(DATABASE_FILE_NAME),
            rewrite: RewriteOptions::default(),
            queue_capacity: 64,
        }
    }
}

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

pub fn config_dir() -> PathBuf {
    expand_path(DEFAULT_CONFIG_DIR)
}

/// Settings file location: `$PERMALINK_CONFIG` or the default config directory.
pub fn config_path() -> PathBuf {
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => expand_path(&path),
        _ => config_dir().join(CONFIG_FILE_NAME),
    }
}

impl Settings {
    /// Reads settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let mut settings: Settings = serde_json::from_str(&content)?;
        settings.database = expand_path(&settings.database.to_string_lossy());
        if settings.queue_capacity == 0 {
            settings.queue_capacity = 1;
        }
        Ok(settings)
    }

    pub fn load_default() -> Result<Self> {
        Self::load(&config_path())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
