//! Producer-facing deployment recorder
//!
//! Pipelines report progress through the recorder rather than touching
//! sessions directly: each call mutates the session inside the shared
//! tracker and pushes the resulting entry to live stream clients.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::deploy::phase::PhaseName;
use crate::deploy::session::{DeploymentSession, DeploymentSummary, NewDeployment};
use crate::deploy::tracker::DeploymentLifecycleTracker;
use crate::errors::{PhaseError, StreamError};
use crate::schema::{HealthStatus, LogEntry};
use crate::stream::LogStreamingServer;

pub struct DeploymentRecorder {
    tracker: Arc<RwLock<DeploymentLifecycleTracker>>,
    stream: Arc<LogStreamingServer>,
}

impl DeploymentRecorder {
    pub fn new(
        tracker: Arc<RwLock<DeploymentLifecycleTracker>>,
        stream: Arc<LogStreamingServer>,
    ) -> Self {
        Self { tracker, stream }
    }

    /// Start tracking a deployment
    pub async fn start_deployment(
        &self,
        request: NewDeployment,
    ) -> Result<DeploymentSummary, StreamError> {
        let mut tracker = self.tracker.write().await;
        let session = tracker.start_deployment(request)?;
        Ok(session.to_summary())
    }

    pub async fn start_phase(
        &self,
        deployment_id: &str,
        phase: PhaseName,
    ) -> Result<LogEntry, StreamError> {
        self.with_session(deployment_id, |session| session.start_phase(phase))
            .await
    }

    pub async fn complete_phase(
        &self,
        deployment_id: &str,
        phase: PhaseName,
        outcome: Result<(), PhaseError>,
    ) -> Result<LogEntry, StreamError> {
        self.with_session(deployment_id, |session| {
            session.complete_phase(phase, outcome)
        })
        .await
    }

    /// Attach raw pipeline output to a phase
    pub async fn add_log(
        &self,
        deployment_id: &str,
        phase: PhaseName,
        log: LogEntry,
    ) -> Result<(), StreamError> {
        self.with_session(deployment_id, |session| {
            session.add_log(phase, log.clone());
            log
        })
        .await
        .map(|_| ())
    }

    pub async fn record_health_check(
        &self,
        deployment_id: &str,
        status: HealthStatus,
    ) -> Result<LogEntry, StreamError> {
        self.with_session(deployment_id, |session| {
            session.record_health_check(status)
        })
        .await
    }

    pub async fn record_scale(
        &self,
        deployment_id: &str,
        new_replicas: u32,
    ) -> Result<LogEntry, StreamError> {
        self.with_session(deployment_id, |session| session.record_scale(new_replicas))
            .await
    }

    /// Move a deployment to history. Returns whether anything moved.
    pub async fn complete_deployment(&self, deployment_id: &str) -> bool {
        self.tracker.write().await.complete_deployment(deployment_id)
    }

    /// Apply `f` to an active session and broadcast the entry it yields.
    ///
    /// The tracker lock is held across the broadcast so that entries reach
    /// clients in the order they were appended.
    async fn with_session<F>(&self, deployment_id: &str, f: F) -> Result<LogEntry, StreamError>
    where
        F: FnOnce(&mut DeploymentSession) -> LogEntry,
    {
        let mut tracker = self.tracker.write().await;
        let session = tracker
            .get_deployment_mut(deployment_id)
            .ok_or_else(|| StreamError::NotFound(format!("deployment {}", deployment_id)))?;

        let log = f(session);
        let delivered = self.stream.broadcast(&log);
        debug!(
            "Broadcast {} for {} to {} clients",
            log.metadata.event_type, deployment_id, delivered
        );

        Ok(log)
    }
}
