use crate::index::types::IndexConfig;
use crate::query::CompilerLimits;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "regrep";
const CONFIG_FILE: &str = "config.json";
const INDEX_ENV: &str = "REGREPINDEX";
const DEFAULT_INDEX_FILE: &str = ".regrepindex";

/// Tuning knobs read from the app data directory. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub index: IndexConfig,
    pub compiler: CompilerLimits,
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        match get_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from `path`, or return default if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Path of the config file, if a data directory exists on this platform
pub fn get_config_path() -> Option<PathBuf> {
    get_app_data_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Application data directory (not created)
pub fn get_app_data_dir() -> Option<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        dirs::data_dir()
    };
    base.map(|b| b.join(APP_NAME))
}

/// Index file location: `$REGREPINDEX` if set and non-empty, else
/// `$HOME/.regrepindex`.
pub fn index_file() -> Result<PathBuf> {
    resolve_index_file(std::env::var_os(INDEX_ENV), dirs::home_dir())
}

fn resolve_index_file(env: Option<OsString>, home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = env.filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let home = home.with_context(|| {
        format!("Could not determine home directory; set {}", INDEX_ENV)
    })?;
    Ok(home.join(DEFAULT_INDEX_FILE))
}
