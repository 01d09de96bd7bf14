use crate::error::{Error, Result};
use crate::index::sniff::SnifferKind;
use crate::index::types::DEFAULT_MIN_INSPECT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const APP_NAME: &str = "dutype";
const CONFIG_FILE: &str = "config.json";
const STORE_FILE: &str = "index.bin.zst";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Entries smaller than this are not sniffed; also the sniff window size
    #[serde(default = "default_min_inspect")]
    pub min_inspect: u64,

    /// Classifier worker count
    /// If 0, uses the number of CPU cores
    #[serde(default)]
    pub jobs: usize,

    /// Disk usage oracle executable, looked up on PATH
    #[serde(default = "default_oracle_binary")]
    pub oracle_binary: String,

    /// Oracle database, when not the oracle's own default
    #[serde(default)]
    pub oracle_database: Option<PathBuf>,

    /// Give up on the oracle after this many seconds
    #[serde(default)]
    pub oracle_timeout_secs: Option<u64>,

    #[serde(default)]
    pub sniffer: SnifferKind,

    /// Backing store location, defaults to the app data directory
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

fn default_min_inspect() -> u64 {
    DEFAULT_MIN_INSPECT
}

fn default_oracle_binary() -> String {
    "duc".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            min_inspect: default_min_inspect(),
            jobs: 0,
            oracle_binary: default_oracle_binary(),
            oracle_database: None,
            oracle_timeout_secs: None,
            sniffer: SnifferKind::default(),
            store_path: None,
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse {CONFIG_FILE}: {e}")))
    }

    pub fn oracle_timeout(&self) -> Option<Duration> {
        self.oracle_timeout_secs.map(Duration::from_secs)
    }

    /// Configured store location, or the default one
    pub fn effective_store_path(&self) -> Result<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(path.clone()),
            None => default_store_path(),
        }
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_app_data_dir()?.join(CONFIG_FILE))
}

/// Default location of the backing store
pub fn default_store_path() -> Result<PathBuf> {
    Ok(get_app_data_dir()?.join(STORE_FILE))
}

/// Get the per-user application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.ok_or_else(|| Error::Config("could not determine app data directory".into()))?;
    Ok(base.join(APP_NAME))
}
