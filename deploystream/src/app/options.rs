//! Application configuration options

use std::time::Duration;

use crate::app::settings::Settings;
use crate::deploy::tracker::DEFAULT_MAX_COMPLETED;
use crate::stream::DEFAULT_CLIENT_QUEUE;

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Live stream configuration
    pub stream: StreamOptions,

    /// Deployment tracker configuration
    pub tracker: TrackerOptions,
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            lifecycle: LifecycleOptions {
                max_shutdown_delay: Duration::from_secs(settings.lifecycle.max_shutdown_delay_secs),
            },
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            stream: StreamOptions {
                client_queue: settings.stream.client_queue,
            },
            tracker: TrackerOptions {
                max_completed: settings.tracker.max_completed,
            },
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP / WebSocket server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on; 0 picks an ephemeral port
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8767,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// Frames a client may have pending before it is dropped
    pub client_queue: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            client_queue: DEFAULT_CLIENT_QUEUE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrackerOptions {
    /// Finished deployments kept in history
    pub max_completed: usize,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            max_completed: DEFAULT_MAX_COMPLETED,
        }
    }
}
