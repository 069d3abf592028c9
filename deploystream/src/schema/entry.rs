//! Canonical structured log entry

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JSON-LD context carried by every entry
pub const SCHEMA_CONTEXT: &str = "https://flukebase.me/schemas/unified-log";

/// Severity of a log entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Deployment lifecycle event carried in entry metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Pre-build hooks executing
    PreBuild,
    /// Image build started
    BuildStart,
    /// Build completed successfully
    BuildComplete,
    /// Build failed
    BuildError,
    /// Pre-deploy validation running
    PreDeploy,
    /// Rollout started
    DeployStart,
    /// Rollout completed successfully
    DeployComplete,
    /// Rollout failed
    DeployError,
    /// Post-deploy hooks executing
    PostDeploy,
    /// Health check result
    HealthCheck,
    /// Replicas scaled up or down
    ScaleEvent,
    /// Configuration updated
    ConfigChange,
}

impl EventType {
    pub const ALL: [EventType; 12] = [
        EventType::PreBuild,
        EventType::BuildStart,
        EventType::BuildComplete,
        EventType::BuildError,
        EventType::PreDeploy,
        EventType::DeployStart,
        EventType::DeployComplete,
        EventType::DeployError,
        EventType::PostDeploy,
        EventType::HealthCheck,
        EventType::ScaleEvent,
        EventType::ConfigChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PreBuild => "pre_build",
            EventType::BuildStart => "build_start",
            EventType::BuildComplete => "build_complete",
            EventType::BuildError => "build_error",
            EventType::PreDeploy => "pre_deploy",
            EventType::DeployStart => "deploy_start",
            EventType::DeployComplete => "deploy_complete",
            EventType::DeployError => "deploy_error",
            EventType::PostDeploy => "post_deploy",
            EventType::HealthCheck => "health_check",
            EventType::ScaleEvent => "scale_event",
            EventType::ConfigChange => "config_change",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| format!("Invalid event type: {}", s))
    }
}

/// Health of a deployed service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    #[default]
    Starting,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Starting => "starting",
        }
    }
}

/// Where an entry originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Deployment,
    Container,
    System,
}

/// Log source information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSource {
    #[serde(rename = "type")]
    pub source_type: SourceType,

    /// Container name or system component
    pub container_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

/// Deployment metadata attached to every entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentMetadata {
    pub event_type: EventType,
    pub app_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,

    /// Application version (tag or git SHA)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_status: Option<HealthStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,

    /// Rollout strategy (rolling, blue_green, canary)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Caller-supplied metadata; every field that is set wins over the
/// value the factory would otherwise use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataOverrides {
    pub event_type: Option<EventType>,
    pub app_name: Option<String>,
    pub deployment_id: Option<String>,
    pub version: Option<String>,
    pub build_id: Option<String>,
    pub duration_ms: Option<u64>,
    pub replicas: Option<u32>,
    pub health_status: Option<HealthStatus>,
    pub error_code: Option<String>,
    pub stack_trace: Option<String>,
    pub strategy: Option<String>,
    pub environment: Option<String>,
}

impl MetadataOverrides {
    /// Overrides scoped to a single deployment
    pub fn for_deployment(deployment_id: impl Into<String>) -> Self {
        Self {
            deployment_id: Some(deployment_id.into()),
            ..Default::default()
        }
    }

    pub(crate) fn apply(self, metadata: &mut DeploymentMetadata) {
        fn merge<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }
        fn merge_opt<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        merge(&mut metadata.event_type, self.event_type);
        merge(&mut metadata.app_name, self.app_name);
        merge_opt(&mut metadata.deployment_id, self.deployment_id);
        merge_opt(&mut metadata.version, self.version);
        merge_opt(&mut metadata.build_id, self.build_id);
        merge_opt(&mut metadata.duration_ms, self.duration_ms);
        merge_opt(&mut metadata.replicas, self.replicas);
        merge_opt(&mut metadata.health_status, self.health_status);
        merge_opt(&mut metadata.error_code, self.error_code);
        merge_opt(&mut metadata.stack_trace, self.stack_trace);
        merge_opt(&mut metadata.strategy, self.strategy);
        merge_opt(&mut metadata.environment, self.environment);
    }
}

/// JSON-LD type tag. Its presence is what tells a log frame apart from
/// a control frame on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    #[default]
    UnifiedLogEntry,
}

fn default_context() -> String {
    SCHEMA_CONTEXT.to_string()
}

/// Structured log record emitted for deployment activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "@context", default = "default_context")]
    pub context: String,

    #[serde(rename = "@type")]
    pub kind: EntryKind,

    /// Time-based id with a random suffix
    pub id: String,

    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub source: LogSource,
    pub metadata: DeploymentMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl LogEntry {
    /// Attach search tags to the entry
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn app_name(&self) -> &str {
        &self.metadata.app_name
    }

    pub fn deployment_id(&self) -> Option<&str> {
        self.metadata.deployment_id.as_deref()
    }

    pub fn event_type(&self) -> EventType {
        self.metadata.event_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names_round_trip_through_from_str() {
        for event in EventType::ALL {
            assert_eq!(event.as_str().parse::<EventType>().unwrap(), event);
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, format!("\"{}\"", event.as_str()));
        }
        assert!("deploy_started".parse::<EventType>().is_err());
    }

    #[test]
    fn test_log_level_rejects_unknown() {
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("warning".parse::<LogLevel>().is_err());
        assert!(serde_json::from_str::<LogLevel>("\"fatal\"").is_err());
    }

    #[test]
    fn test_overrides_only_replace_set_fields() {
        let mut metadata = DeploymentMetadata {
            event_type: EventType::BuildStart,
            app_name: "shop".to_string(),
            deployment_id: Some("dep-1".to_string()),
            version: Some("v1".to_string()),
            build_id: None,
            duration_ms: None,
            replicas: None,
            health_status: None,
            error_code: None,
            stack_trace: None,
            strategy: None,
            environment: None,
        };

        MetadataOverrides {
            version: Some("v2".to_string()),
            environment: Some("staging".to_string()),
            ..Default::default()
        }
        .apply(&mut metadata);

        assert_eq!(metadata.deployment_id.as_deref(), Some("dep-1"));
        assert_eq!(metadata.version.as_deref(), Some("v2"));
        assert_eq!(metadata.environment.as_deref(), Some("staging"));
        assert_eq!(metadata.app_name, "shop");
    }
}
