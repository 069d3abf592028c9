//! Server state

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::deploy::tracker::DeploymentLifecycleTracker;
use crate::stream::LogStreamingServer;

/// Server state shared across handlers
pub struct ServerState {
    pub tracker: Arc<RwLock<DeploymentLifecycleTracker>>,
    pub stream: Arc<LogStreamingServer>,
}

impl ServerState {
    pub fn new(
        tracker: Arc<RwLock<DeploymentLifecycleTracker>>,
        stream: Arc<LogStreamingServer>,
    ) -> Self {
        Self { tracker, stream }
    }
}
