//! Configuration loading for roster-bridge.
//!
//! Configuration is loaded from a TOML file (default: `bridge.toml`).

use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration for roster-bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Chat backend connection configuration.
    pub chat: ChatConfig,
    /// Sync behavior configuration.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Periodic sync task configuration.
    #[serde(default)]
    pub task: TaskConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Scheme used to reach the chat backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP (development setups only).
    Http,
    /// HTTPS (default).
    Https,
}

impl Protocol {
    /// URL scheme string for this protocol.
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

/// Chat backend connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Hostname of the chat backend (no scheme, no port).
    pub host: String,
    /// Optional port; omitted from the URL when not set.
    pub port: Option<u16>,
    /// URL scheme (default: https).
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,
    /// Admin username used for API calls.
    pub username: String,
    /// Admin password used for API calls.
    pub password: String,
}

impl ChatConfig {
    /// Base URL of the chat backend, e.g. `https://chat.example.org:3000`.
    pub fn instance_url(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.protocol.scheme(), self.host, port),
            None => format!("{}://{}", self.protocol.scheme(), self.host),
        }
    }
}

/// Sync behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Newline-separated regex allow-list for group names.
    ///
    /// A group gets a channel iff at least one pattern matches its name.
    /// An empty list matches nothing.
    #[serde(default)]
    pub group_regex: String,
    /// Whether end users may link their own chat account through the bridge.
    #[serde(default)]
    pub allow_external_connection: bool,
}

/// Periodic sync task configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Sync interval in seconds (default: 300).
    #[serde(default = "default_task_interval")]
    pub interval_secs: u64,
    /// Enable the periodic task (default: true).
    #[serde(default = "default_task_enabled")]
    pub enabled: bool,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
}

// Default value functions
fn default_protocol() -> Protocol {
    Protocol::Https
}

fn default_task_interval() -> u64 {
    300
}

fn default_task_enabled() -> bool {
    true
}

fn default_database_path() -> PathBuf {
    PathBuf::from("bridge.db")
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            group_regex: String::new(),
            allow_external_connection: false,
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_task_interval(),
            enabled: default_task_enabled(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
