//! Deployment lifecycle tracker

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::deploy::session::{DeploymentSession, NewDeployment};
use crate::errors::StreamError;

/// Number of finished sessions kept in history by default
pub const DEFAULT_MAX_COMPLETED: usize = 100;

/// Tracker statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStats {
    pub active_count: usize,
    pub completed_count: usize,
    pub total_tracked: usize,
}

/// Registry of active sessions plus a bounded, oldest-first history.
///
/// A deployment id lives in at most one of the two collections.
#[derive(Debug)]
pub struct DeploymentLifecycleTracker {
    active: HashMap<String, DeploymentSession>,
    completed: VecDeque<DeploymentSession>,
    max_completed: usize,
}

impl DeploymentLifecycleTracker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_COMPLETED)
    }

    /// Create a tracker keeping at most `max_completed` finished sessions
    pub fn with_capacity(max_completed: usize) -> Self {
        Self {
            active: HashMap::new(),
            completed: VecDeque::with_capacity(max_completed + 1),
            max_completed,
        }
    }

    /// Begin tracking a new deployment.
    ///
    /// Fails if the id is already tracked, active or historical.
    pub fn start_deployment(
        &mut self,
        request: NewDeployment,
    ) -> Result<&mut DeploymentSession, StreamError> {
        let id = request.deployment_id.clone();
        if self.active.contains_key(&id) || self.completed_index(&id).is_some() {
            warn!("Rejecting duplicate deployment id {}", id);
            return Err(StreamError::DuplicateDeploymentId(id));
        }

        info!(
            "Tracking deployment {} for {} ({}, {} replicas)",
            id, request.app_name, request.strategy, request.replicas
        );
        Ok(self
            .active
            .entry(id)
            .or_insert_with(|| DeploymentSession::new(request)))
    }

    /// Look up a deployment, active first, then history
    pub fn get_deployment(&self, deployment_id: &str) -> Option<&DeploymentSession> {
        self.active.get(deployment_id).or_else(|| {
            self.completed
                .iter()
                .find(|session| session.deployment_id() == deployment_id)
        })
    }

    /// Mutable access to an active deployment
    pub fn get_deployment_mut(&mut self, deployment_id: &str) -> Option<&mut DeploymentSession> {
        self.active.get_mut(deployment_id)
    }

    /// All active deployments, in no particular order
    pub fn get_active_deployments(&self) -> Vec<&DeploymentSession> {
        self.active.values().collect()
    }

    /// Deployments for an application.
    ///
    /// Every active session for the app is returned, even beyond `limit`.
    /// History fills the remaining room, most recently completed first.
    pub fn get_app_deployments(&self, app_name: &str, limit: usize) -> Vec<&DeploymentSession> {
        let mut results: Vec<&DeploymentSession> = self
            .active
            .values()
            .filter(|session| session.app_name() == app_name)
            .collect();

        let room = limit.saturating_sub(results.len());
        results.extend(
            self.completed
                .iter()
                .rev()
                .filter(|session| session.app_name() == app_name)
                .take(room),
        );

        results
    }

    /// Move a deployment from active to history. Returns whether it moved;
    /// unknown or already completed ids are a no-op.
    pub fn complete_deployment(&mut self, deployment_id: &str) -> bool {
        let Some(session) = self.active.remove(deployment_id) else {
            return false;
        };

        info!(
            "Deployment {} finished with status {:?}",
            deployment_id,
            session.status()
        );
        self.completed.push_back(session);

        while self.completed.len() > self.max_completed {
            if let Some(evicted) = self.completed.pop_front() {
                info!("Evicted deployment {} from history", evicted.deployment_id());
            }
        }

        true
    }

    /// Get tracker statistics
    pub fn get_stats(&self) -> TrackerStats {
        TrackerStats {
            active_count: self.active.len(),
            completed_count: self.completed.len(),
            total_tracked: self.active.len() + self.completed.len(),
        }
    }

    fn completed_index(&self, deployment_id: &str) -> Option<usize> {
        self.completed
            .iter()
            .position(|session| session.deployment_id() == deployment_id)
    }
}

impl Default for DeploymentLifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}
