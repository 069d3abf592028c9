//! Deployment phases

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::{EventType, LogEntry};
use crate::utils::elapsed_ms;

/// The five fixed stages of a deployment, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    PreBuild,
    Build,
    PreDeploy,
    Deploy,
    PostDeploy,
}

impl PhaseName {
    pub const ALL: [PhaseName; 5] = [
        PhaseName::PreBuild,
        PhaseName::Build,
        PhaseName::PreDeploy,
        PhaseName::Deploy,
        PhaseName::PostDeploy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseName::PreBuild => "pre_build",
            PhaseName::Build => "build",
            PhaseName::PreDeploy => "pre_deploy",
            PhaseName::Deploy => "deploy",
            PhaseName::PostDeploy => "post_deploy",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }

    /// Event recorded when the phase starts
    pub fn start_event(&self) -> EventType {
        match self {
            PhaseName::PreBuild => EventType::PreBuild,
            PhaseName::Build => EventType::BuildStart,
            PhaseName::PreDeploy => EventType::PreDeploy,
            PhaseName::Deploy => EventType::DeployStart,
            PhaseName::PostDeploy => EventType::PostDeploy,
        }
    }

    /// Event recorded when the phase completes successfully
    pub fn success_event(&self) -> EventType {
        match self {
            PhaseName::Build => EventType::BuildComplete,
            PhaseName::Deploy => EventType::DeployComplete,
            other => other.start_event(),
        }
    }

    /// Event recorded when the phase fails
    pub fn failure_event(&self) -> EventType {
        match self {
            PhaseName::Build => EventType::BuildError,
            PhaseName::Deploy => EventType::DeployError,
            other => other.start_event(),
        }
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhaseName::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| format!("Invalid phase: {}", s))
    }
}

/// Phase status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
}

/// Tracking state for a single phase
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentPhase {
    #[serde(rename = "phase")]
    pub(crate) name: PhaseName,
    pub(crate) status: PhaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) duration_ms: Option<u64>,
    pub(crate) logs: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

impl DeploymentPhase {
    pub(crate) fn new(name: PhaseName) -> Self {
        Self {
            name,
            status: PhaseStatus::Pending,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            logs: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn start(&mut self, now: DateTime<Utc>) {
        self.status = PhaseStatus::Running;
        self.started_at = Some(now);
    }

    /// Duration is only derived when the phase was started first.
    pub(crate) fn complete(&mut self, success: bool, error: Option<String>, now: DateTime<Utc>) {
        self.status = if success {
            PhaseStatus::Success
        } else {
            PhaseStatus::Failed
        };
        self.completed_at = Some(now);
        self.error = error;
        self.duration_ms = self.started_at.map(|started| elapsed_ms(started, now));
    }

    pub fn name(&self) -> PhaseName {
        self.name
    }

    pub fn status(&self) -> PhaseStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
