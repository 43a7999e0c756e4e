//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use poverka_core::{ClimateLimits, ProtocolConfig, ReminderSchedule};
use serde::{Deserialize, Serialize};

/// Environment variable pointing at an alternative config file.
pub const CONFIG_ENV: &str = "POVERKA_CONFIG";

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Database file; the platform data directory when unset
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Where generated protocols are written
    #[serde(default)]
    pub documents_dir: Option<PathBuf>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,

    /// Daily climate reminder
    #[serde(default)]
    pub reminder: ReminderSchedule,

    /// Fixed protocol texts and tolerance
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Accepted climate ranges
    #[serde(default)]
    pub climate: ClimateLimits,
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("poverka")
            .join("config.toml")
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from `path`. A missing or unreadable file yields the
    /// defaults; problems are reported on stderr.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Database path: command line or `POVERKA_DB` first, then the config
    /// file, then the platform default.
    pub fn database_path(&self, arg: Option<&Path>) -> PathBuf {
        arg.map(Path::to_path_buf)
            .or_else(|| self.database.clone())
            .unwrap_or_else(poverka_store::default_db_path)
    }

    /// Directory for generated protocols.
    pub fn documents_dir(&self) -> PathBuf {
        self.documents_dir.clone().unwrap_or_else(default_documents_dir)
    }
}

fn default_documents_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("poverka")
        .join("protocols")
}
