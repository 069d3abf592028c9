//! Application state management

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::app::options::AppOptions;
use crate::deploy::recorder::DeploymentRecorder;
use crate::deploy::tracker::DeploymentLifecycleTracker;
use crate::errors::StreamError;
use crate::stream::LogStreamingServer;

/// Main application state.
///
/// Owns the single tracker and streaming server for the process; hosts
/// hand the recorder to their pipelines and the state to [`run`](crate::app::run::run).
pub struct AppState {
    /// Active and historical deployment sessions
    pub tracker: Arc<RwLock<DeploymentLifecycleTracker>>,

    /// Live log fan-out
    pub stream: Arc<LogStreamingServer>,

    /// Producer entry point
    pub recorder: Arc<DeploymentRecorder>,
}

impl AppState {
    /// Initialize application state
    pub fn new(options: &AppOptions) -> Self {
        info!("Initializing application state...");

        let tracker = Arc::new(RwLock::new(DeploymentLifecycleTracker::with_capacity(
            options.tracker.max_completed,
        )));
        let stream = Arc::new(LogStreamingServer::with_client_queue(
            options.server.port,
            options.stream.client_queue,
        ));
        let recorder = Arc::new(DeploymentRecorder::new(tracker.clone(), stream.clone()));

        Self {
            tracker,
            stream,
            recorder,
        }
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), StreamError> {
        info!("Shutting down application state...");
        self.stream.close();

        let stats = self.tracker.read().await.get_stats();
        info!(
            "Discarding {} active and {} completed deployments",
            stats.active_count, stats.completed_count
        );
        Ok(())
    }
}
