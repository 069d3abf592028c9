//! Deployment session state machine
//!
//! A session walks through the five [`PhaseName`]s. Each start or
//! completion synthesizes exactly one log entry in the phase's log list
//! and may move the overall [`DeploymentStatus`]:
//!
//! - starting `build` moves the session to `building`
//! - starting `pre_deploy` or `deploy` moves it to `deploying`
//! - any failed phase moves it to `failed`
//! - a successful `post_deploy` moves it to `success` and stamps the totals
//!
//! Call order is not validated; producers are trusted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::deploy::phase::{DeploymentPhase, PhaseName, PhaseStatus};
use crate::errors::PhaseError;
use crate::schema::{
    create_error_log, create_health_check_log, create_log, create_scale_log, HealthStatus,
    LogEntry, LogLevel, MetadataOverrides,
};
use crate::utils::elapsed_ms;

/// Overall deployment status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    #[default]
    Pending,
    Building,
    Deploying,
    Success,
    Failed,
    RolledBack,
}

/// Parameters for a new deployment session
#[derive(Debug, Clone)]
pub struct NewDeployment {
    pub deployment_id: String,
    pub app_name: String,
    /// Who initiated it (api, webhook, cli, agent)
    pub initiated_by: String,
    pub strategy: String,
    pub replicas: u32,
    pub version: Option<String>,
}

impl NewDeployment {
    /// Rolling strategy with a single replica
    pub fn new(
        deployment_id: impl Into<String>,
        app_name: impl Into<String>,
        initiated_by: impl Into<String>,
    ) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            app_name: app_name.into(),
            initiated_by: initiated_by.into(),
            strategy: "rolling".to_string(),
            replicas: 1,
            version: None,
        }
    }

    pub fn strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    pub fn replicas(mut self, replicas: u32) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// One tracked attempt to build and deploy an application version
#[derive(Debug, Clone)]
pub struct DeploymentSession {
    deployment_id: String,
    app_name: String,
    version: Option<String>,
    initiated_by: String,
    initiated_at: DateTime<Utc>,
    strategy: String,
    phases: [DeploymentPhase; 5],
    status: DeploymentStatus,
    completed_at: Option<DateTime<Utc>>,
    total_duration_ms: Option<u64>,
    replicas_requested: u32,
    replicas_ready: u32,
    health_status: HealthStatus,
}

impl DeploymentSession {
    /// Create a session with every phase pending
    pub fn new(request: NewDeployment) -> Self {
        Self {
            deployment_id: request.deployment_id,
            app_name: request.app_name,
            version: request.version,
            initiated_by: request.initiated_by,
            initiated_at: Utc::now(),
            strategy: request.strategy,
            phases: PhaseName::ALL.map(DeploymentPhase::new),
            status: DeploymentStatus::Pending,
            completed_at: None,
            total_duration_ms: None,
            replicas_requested: request.replicas,
            replicas_ready: 0,
            health_status: HealthStatus::Starting,
        }
    }

    // ============================== TRANSITIONS ================================= //

    /// Mark a phase as running. Returns the synthesized entry.
    pub fn start_phase(&mut self, name: PhaseName) -> LogEntry {
        let now = Utc::now();
        self.phase_mut(name).start(now);

        match name {
            PhaseName::Build => self.status = DeploymentStatus::Building,
            PhaseName::PreDeploy | PhaseName::Deploy => self.status = DeploymentStatus::Deploying,
            PhaseName::PreBuild | PhaseName::PostDeploy => {}
        }

        let log = create_log(
            format!("Phase {} started", name),
            name.start_event(),
            &self.app_name,
            LogLevel::Info,
            MetadataOverrides {
                strategy: Some(self.strategy.clone()),
                ..self.base_overrides()
            },
        );
        debug!("Deployment {} started phase {}", self.deployment_id, name);

        self.push_log(name, log)
    }

    /// Complete a phase with its outcome. Returns the synthesized entry.
    pub fn complete_phase(&mut self, name: PhaseName, outcome: Result<(), PhaseError>) -> LogEntry {
        let now = Utc::now();
        let success = outcome.is_ok();

        let phase = self.phase_mut(name);
        if phase.started_at.is_none() {
            warn!("Phase {} completed without being started", name);
        }
        phase.complete(success, outcome.as_ref().err().map(|e| e.0.clone()), now);
        let duration_ms = phase.duration_ms;

        let log = match &outcome {
            Ok(()) => {
                let message = match duration_ms {
                    Some(ms) => format!("Phase {} completed in {}ms", name, ms),
                    None => format!("Phase {} completed", name),
                };
                create_log(
                    message,
                    name.success_event(),
                    &self.app_name,
                    LogLevel::Info,
                    MetadataOverrides {
                        duration_ms,
                        ..self.base_overrides()
                    },
                )
            }
            Err(err) => create_error_log(
                format!("Phase {} failed: {}", name, err),
                name.failure_event(),
                &self.app_name,
                err,
                self.base_overrides(),
            ),
        };

        if !success {
            self.status = DeploymentStatus::Failed;
        } else if name == PhaseName::PostDeploy {
            self.status = DeploymentStatus::Success;
            self.stamp_completion(now);
        }

        self.push_log(name, log)
    }

    /// Complete a phase successfully
    pub fn succeed_phase(&mut self, name: PhaseName) -> LogEntry {
        self.complete_phase(name, Ok(()))
    }

    /// Complete a phase as failed
    pub fn fail_phase(&mut self, name: PhaseName, error: impl Into<String>) -> LogEntry {
        self.complete_phase(name, Err(PhaseError(error.into())))
    }

    /// Append a caller-built entry to a phase without touching any state
    pub fn add_log(&mut self, name: PhaseName, log: LogEntry) {
        self.phase_mut(name).logs.push(log);
    }

    /// Record a health check result against the post-deploy phase
    pub fn record_health_check(&mut self, status: HealthStatus) -> LogEntry {
        self.health_status = status;
        let log = create_health_check_log(&self.app_name, status, self.base_overrides());
        self.push_log(PhaseName::PostDeploy, log)
    }

    /// Record a change in requested replicas against the post-deploy phase
    pub fn record_scale(&mut self, new_replicas: u32) -> LogEntry {
        let log = create_scale_log(
            &self.app_name,
            self.replicas_requested,
            new_replicas,
            self.base_overrides(),
        );
        self.replicas_requested = new_replicas;
        self.push_log(PhaseName::PostDeploy, log)
    }

    pub fn set_replicas_ready(&mut self, replicas_ready: u32) {
        self.replicas_ready = replicas_ready;
    }

    /// Mark the session as rolled back and stamp its totals
    pub fn mark_rolled_back(&mut self) {
        self.status = DeploymentStatus::RolledBack;
        self.stamp_completion(Utc::now());
    }

    fn stamp_completion(&mut self, now: DateTime<Utc>) {
        self.completed_at = Some(now);
        self.total_duration_ms = Some(elapsed_ms(self.initiated_at, now));
    }

    fn base_overrides(&self) -> MetadataOverrides {
        MetadataOverrides {
            deployment_id: Some(self.deployment_id.clone()),
            version: self.version.clone(),
            ..Default::default()
        }
    }

    fn push_log(&mut self, name: PhaseName, log: LogEntry) -> LogEntry {
        self.phase_mut(name).logs.push(log.clone());
        log
    }

    fn phase_mut(&mut self, name: PhaseName) -> &mut DeploymentPhase {
        &mut self.phases[name.index()]
    }

    // ================================ QUERIES =================================== //

    /// Compact projection for API responses. Logs are left out.
    pub fn to_summary(&self) -> DeploymentSummary {
        DeploymentSummary {
            deployment_id: self.deployment_id.clone(),
            app_name: self.app_name.clone(),
            version: self.version.clone(),
            status: self.status,
            initiated_by: self.initiated_by.clone(),
            initiated_at: self.initiated_at,
            completed_at: self.completed_at,
            total_duration_ms: self.total_duration_ms,
            strategy: self.strategy.clone(),
            replicas: ReplicaCounts {
                requested: self.replicas_requested,
                ready: self.replicas_ready,
            },
            health_status: self.health_status,
            phases: self
                .phases
                .iter()
                .map(|phase| {
                    (
                        phase.name,
                        PhaseSummary {
                            status: phase.status,
                            duration_ms: phase.duration_ms,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Every phase's logs concatenated in phase order.
    ///
    /// Entries are not re-sorted by timestamp.
    pub fn all_logs(&self) -> Vec<LogEntry> {
        self.phases
            .iter()
            .flat_map(|phase| phase.logs.iter().cloned())
            .collect()
    }

    pub fn phase(&self, name: PhaseName) -> &DeploymentPhase {
        &self.phases[name.index()]
    }

    pub fn phases(&self) -> &[DeploymentPhase] {
        &self.phases
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn initiated_by(&self) -> &str {
        &self.initiated_by
    }

    pub fn initiated_at(&self) -> DateTime<Utc> {
        self.initiated_at
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn status(&self) -> DeploymentStatus {
        self.status
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn total_duration_ms(&self) -> Option<u64> {
        self.total_duration_ms
    }

    pub fn replicas_requested(&self) -> u32 {
        self.replicas_requested
    }

    pub fn replicas_ready(&self) -> u32 {
        self.replicas_ready
    }

    pub fn health_status(&self) -> HealthStatus {
        self.health_status
    }
}

/// Requested and ready replica counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaCounts {
    pub requested: u32,
    pub ready: u32,
}

/// Per-phase status in a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub status: PhaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Deployment summary without logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    pub deployment_id: String,
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub status: DeploymentStatus,
    pub initiated_by: String,
    pub initiated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,
    pub strategy: String,
    pub replicas: ReplicaCounts,
    pub health_status: HealthStatus,
    pub phases: BTreeMap<PhaseName, PhaseSummary>,
}
