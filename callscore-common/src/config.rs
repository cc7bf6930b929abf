//! Bootstrap configuration and root folder resolution
//!
//! Configuration is split in two tiers:
//! 1. **TOML bootstrap**: root folder, bind address, logging, assistant defaults
//! 2. **Database runtime**: `settings` table values (read by the engine)
//!
//! A missing or unreadable TOML file never prevents startup: a warning is logged
//! and built-in defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CALLSCORE_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "callscore.db";

/// Default TOML file name
pub const CONFIG_FILE_NAME: &str = "callscore-engine.toml";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP bind address, e.g. "127.0.0.1:5780"
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Assistant service defaults
    #[serde(default)]
    pub assistant: AssistantConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `[assistant]` section
///
/// Every field is optional; the engine falls back to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Base URL of the assistant service API
    #[serde(default)]
    pub base_url: Option<String>,

    /// Service-wide API key used when a tenant carries none
    #[serde(default)]
    pub api_key: Option<String>,

    /// Delay between run status polls
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    /// Maximum number of status polls per run
    #[serde(default)]
    pub max_poll_attempts: Option<u32>,

    /// Wall-clock limit for a single run
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,

    /// Per-request HTTP timeout
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load TOML configuration from `path`
///
/// **Graceful degradation:** a missing file yields defaults. A file that exists
/// but cannot be parsed is an error, since silently ignoring it would hide typos.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Default location of the TOML file (`~/.config/callscore/callscore-engine.toml`)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("callscore").join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Root folder resolution
///
/// **Priority:**
/// 1. Command-line argument
/// 2. `CALLSCORE_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. OS-dependent default
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_config: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_value: toml_config.root_folder.clone(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("callscore"))
        .unwrap_or_else(|| PathBuf::from("./callscore_data"))
}

/// Creates the root folder on first run and locates the database inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}
