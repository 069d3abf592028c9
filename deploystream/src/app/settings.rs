//! Settings file management

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::deploy::tracker::DEFAULT_MAX_COMPLETED;
use crate::errors::StreamError;
use crate::logs::Verbosity;
use crate::stream::DEFAULT_CLIENT_QUEUE;

/// Service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_level: Verbosity,

    /// Write logs to stdout
    #[serde(default = "default_log_stdout")]
    pub log_stdout: bool,

    /// Emit JSON logs on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub stream: StreamSettings,

    #[serde(default)]
    pub tracker: TrackerSettings,

    #[serde(default)]
    pub lifecycle: LifecycleSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: Verbosity::Info,
            log_stdout: default_log_stdout(),
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            stream: StreamSettings::default(),
            tracker: TrackerSettings::default(),
            lifecycle: LifecycleSettings::default(),
        }
    }
}

fn default_log_stdout() -> bool {
    true
}

impl Settings {
    /// Read settings from a JSON file
    pub async fn load(path: &Path) -> Result<Self, StreamError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// HTTP / WebSocket listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8767
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Live stream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Frames a client may have pending before it is dropped
    #[serde(default = "default_client_queue")]
    pub client_queue: usize,
}

fn default_client_queue() -> usize {
    DEFAULT_CLIENT_QUEUE
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            client_queue: default_client_queue(),
        }
    }
}

/// Deployment history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Finished deployments kept in memory
    #[serde(default = "default_max_completed")]
    pub max_completed: usize,
}

fn default_max_completed() -> usize {
    DEFAULT_MAX_COMPLETED
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            max_completed: default_max_completed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSettings {
    #[serde(default = "default_max_shutdown_delay_secs")]
    pub max_shutdown_delay_secs: u64,
}

fn default_max_shutdown_delay_secs() -> u64 {
    30
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            max_shutdown_delay_secs: default_max_shutdown_delay_secs(),
        }
    }
}
