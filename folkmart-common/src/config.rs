//! Bootstrap configuration and root folder resolution
//!
//! Resolution order for every bootstrap value:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Command-line and environment values arrive together through clap's `env`
//! support in the service binary; this module owns tiers 3 and 4 plus the
//! root folder lookup.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the data root folder
pub const ROOT_FOLDER_ENV: &str = "FOLKMART_ROOT_FOLDER";

/// Default HTTP port for folkmart-api
pub const DEFAULT_PORT: u16 = 5780;

/// Default bind address (loopback only)
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "folkmart.db";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional in the file; missing sections fall back to the
/// compiled defaults below.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Folder holding the SQLite database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Interface to bind the HTTP listener on
    #[serde(default)]
    pub bind_address: Option<String>,

    /// HTTP listener port
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub bookings: BookingConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error); RUST_LOG wins
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

/// Bearer token settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of an issued token
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

/// Booking workflow settings
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// "strict" (transition table) or "permissive" (any status to any status)
    #[serde(default = "default_transition_policy")]
    pub transition_policy: String,

    /// Longest session a customer may book
    #[serde(default = "default_max_duration_minutes")]
    pub max_duration_minutes: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            transition_policy: default_transition_policy(),
            max_duration_minutes: default_max_duration_minutes(),
        }
    }
}

/// Database contention settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Upper bound on time spent retrying writes that hit `database is locked`
    #[serde(default = "default_max_lock_wait_ms")]
    pub max_lock_wait_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_lock_wait_ms: default_max_lock_wait_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_token_ttl_hours() -> u64 {
    24
}

fn default_transition_policy() -> String {
    "strict".to_string()
}

fn default_max_duration_minutes() -> u32 {
    24 * 60
}

fn default_max_lock_wait_ms() -> u64 {
    5000
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Bind address, TOML value or compiled default
    pub fn bind_address(&self) -> String {
        self.bind_address
            .clone()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
    }

    /// Port, TOML value or compiled default
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}

/// Per-user config file location (`~/.config/folkmart/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("folkmart").join("config.toml"))
}

/// Load the TOML bootstrap file
///
/// An explicitly requested file must exist. When no path is given the default
/// location is tried, and a missing file only logs a warning: the service
/// starts on compiled defaults.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                warn!("No config file found, using compiled defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = TomlConfig::from_toml_str(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve the root folder: CLI → `FOLKMART_ROOT_FOLDER` → TOML → OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("folkmart"))
        .unwrap_or_else(|| PathBuf::from("./folkmart_data"))
}

/// Database file location for a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}
