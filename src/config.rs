//! Configuration, loaded from TOML.
//!
//! Lookup order: `--config`, `$APPLYTRACK_CONFIG`,
//! `<config dir>/applytrack/config.toml`, then built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub store: StoreConfig,
    pub imap: ImapConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// "error", "warn", "info", "debug", "trace". `RUST_LOG` wins if set.
    pub log_level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Tracker CSV. Defaults to `<data dir>/JOB_TRACKER_LIVE.csv`.
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImapConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    /// File holding the app password; `~/` is expanded.
    pub password_file: String,
    /// Folder to search, e.g. Gmail's all-mail view.
    pub mailbox: String,
    /// Connect, read and write timeout in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub days: u32,
    pub max_messages: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            server: "imap.gmail.com".to_string(),
            port: 993,
            username: String::new(),
            password_file: "~/.gmail.app_password.txt".to_string(),
            mailbox: "[Gmail]/All Mail".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            days: 14,
            max_messages: 100,
        }
    }
}

impl Config {
    /// Load from an explicit path, or the first config file found.
    /// A missing default file is not an error; a broken one is.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os("APPLYTRACK_CONFIG")
                .map(PathBuf::from)
                .or_else(default_config_path)
                .filter(|p| p.exists()),
        };

        match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Invalid config {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.store
            .csv_path
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(default_csv_path)
    }

    pub fn password_file(&self) -> PathBuf {
        expand_home(Path::new(&self.imap.password_file))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "applytrack")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

fn default_csv_path() -> PathBuf {
    match project_dirs() {
        Some(d) => d.data_dir().join("JOB_TRACKER_LIVE.csv"),
        None => PathBuf::from("JOB_TRACKER_LIVE.csv"),
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = directories::BaseDirs::new() {
            return home.home_dir().join(rest);
        }
    }
    path.to_path_buf()
}
