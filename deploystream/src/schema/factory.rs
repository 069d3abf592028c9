//! Log entry factory

use std::error::Error;

use chrono::Utc;

use crate::schema::entry::{
    DeploymentMetadata, EntryKind, EventType, HealthStatus, LogEntry, LogLevel, LogSource,
    MetadataOverrides, SourceType, SCHEMA_CONTEXT,
};
use crate::utils::generate_entry_id;

/// Create a deployment log entry.
///
/// The entry is stamped with the current time and a fresh id, sourced from
/// the deployment named `app_name`. Any field set in `overrides` wins over
/// the defaults, including `event_type` and `app_name`.
pub fn create_log(
    message: impl Into<String>,
    event_type: EventType,
    app_name: &str,
    level: LogLevel,
    overrides: MetadataOverrides,
) -> LogEntry {
    let mut metadata = DeploymentMetadata {
        event_type,
        app_name: app_name.to_string(),
        deployment_id: None,
        version: None,
        build_id: None,
        duration_ms: None,
        replicas: None,
        health_status: None,
        error_code: None,
        stack_trace: None,
        strategy: None,
        environment: None,
    };
    overrides.apply(&mut metadata);

    LogEntry {
        context: SCHEMA_CONTEXT.to_string(),
        kind: EntryKind::UnifiedLogEntry,
        id: generate_entry_id(),
        timestamp: Utc::now(),
        level,
        message: message.into(),
        source: LogSource {
            source_type: SourceType::Deployment,
            container_name: app_name.to_string(),
            service_id: None,
            node_id: None,
        },
        metadata,
        tags: None,
    }
}

/// Create an error entry. The level is always `error`; the error's type
/// name and rendered source chain are recorded as `error_code` and
/// `stack_trace`.
pub fn create_error_log<E: Error>(
    message: impl Into<String>,
    event_type: EventType,
    app_name: &str,
    error: &E,
    overrides: MetadataOverrides,
) -> LogEntry {
    let error_code = error_type_name::<E>();
    let stack_trace = render_error_chain(&error_code, error);

    create_log(
        message,
        event_type,
        app_name,
        LogLevel::Error,
        MetadataOverrides {
            error_code: Some(error_code),
            stack_trace: Some(stack_trace),
            ..overrides
        },
    )
}

/// Create a health check entry: `info` when healthy, `warn` otherwise.
pub fn create_health_check_log(
    app_name: &str,
    status: HealthStatus,
    overrides: MetadataOverrides,
) -> LogEntry {
    let level = if status == HealthStatus::Healthy {
        LogLevel::Info
    } else {
        LogLevel::Warn
    };

    create_log(
        format!("Health check: {}", status.as_str()),
        EventType::HealthCheck,
        app_name,
        level,
        MetadataOverrides {
            health_status: Some(status),
            ..overrides
        },
    )
}

/// Create a scale entry.
///
/// Only `new_replicas` is recorded in `metadata.replicas`; the previous
/// count appears in the message text alone.
pub fn create_scale_log(
    app_name: &str,
    old_replicas: u32,
    new_replicas: u32,
    overrides: MetadataOverrides,
) -> LogEntry {
    create_log(
        format!("Scaled from {} to {} replicas", old_replicas, new_replicas),
        EventType::ScaleEvent,
        app_name,
        LogLevel::Info,
        MetadataOverrides {
            replicas: Some(new_replicas),
            ..overrides
        },
    )
}

fn error_type_name<E>() -> String {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

fn render_error_chain(error_code: &str, error: &dyn Error) -> String {
    let mut trace = format!("{}: {}", error_code, error);
    let mut source = error.source();
    while let Some(cause) = source {
        trace.push_str(&format!("\n    caused by: {}", cause));
        source = cause.source();
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PhaseError;

    #[derive(Debug, thiserror::Error)]
    #[error("image pull failed")]
    struct PullError {
        #[source]
        cause: std::io::Error,
    }

    #[test]
    fn test_create_log_defaults() {
        let log = create_log(
            "Build started",
            EventType::BuildStart,
            "api-server",
            LogLevel::Info,
            MetadataOverrides::default(),
        );

        assert_eq!(log.context, SCHEMA_CONTEXT);
        assert_eq!(log.kind, EntryKind::UnifiedLogEntry);
        assert!(log.id.starts_with("dep-"));
        assert_eq!(log.level, LogLevel::Info);
        assert_eq!(log.source.source_type, SourceType::Deployment);
        assert_eq!(log.source.container_name, "api-server");
        assert_eq!(log.metadata.app_name, "api-server");
        assert_eq!(log.metadata.event_type, EventType::BuildStart);
        assert!(log.metadata.deployment_id.is_none());
        assert!(log.tags.is_none());
    }

    #[test]
    fn test_create_log_ids_differ() {
        let a = create_log("a", EventType::PreBuild, "app", LogLevel::Debug, Default::default());
        let b = create_log("b", EventType::PreBuild, "app", LogLevel::Debug, Default::default());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_create_log_overrides_win() {
        let log = create_log(
            "Deploy started",
            EventType::DeployStart,
            "api-server",
            LogLevel::Info,
            MetadataOverrides {
                deployment_id: Some("dep-123".to_string()),
                version: Some("v1.2.3".to_string()),
                event_type: Some(EventType::ConfigChange),
                ..Default::default()
            },
        );

        assert_eq!(log.deployment_id(), Some("dep-123"));
        assert_eq!(log.metadata.version.as_deref(), Some("v1.2.3"));
        assert_eq!(log.event_type(), EventType::ConfigChange);
    }

    #[test]
    fn test_create_error_log_records_type_and_chain() {
        let err = PullError {
            cause: std::io::Error::new(std::io::ErrorKind::TimedOut, "registry timeout"),
        };
        let log = create_error_log(
            "Build failed",
            EventType::BuildError,
            "shop",
            &err,
            MetadataOverrides {
                error_code: Some("ignored".to_string()),
                ..MetadataOverrides::for_deployment("dep-2")
            },
        );

        assert_eq!(log.level, LogLevel::Error);
        assert_eq!(log.metadata.error_code.as_deref(), Some("PullError"));
        let trace = log.metadata.stack_trace.unwrap();
        assert!(trace.starts_with("PullError: image pull failed"));
        assert!(trace.contains("caused by: registry timeout"));
        assert_eq!(log.metadata.deployment_id.as_deref(), Some("dep-2"));
    }

    #[test]
    fn test_create_error_log_with_phase_error() {
        let log = create_error_log(
            "Phase deploy failed",
            EventType::DeployError,
            "shop",
            &PhaseError("no capacity".to_string()),
            MetadataOverrides::default(),
        );

        assert_eq!(log.metadata.error_code.as_deref(), Some("PhaseError"));
        assert_eq!(
            log.metadata.stack_trace.as_deref(),
            Some("PhaseError: no capacity")
        );
    }

    #[test]
    fn test_health_check_level() {
        let healthy = create_health_check_log("shop", HealthStatus::Healthy, Default::default());
        assert_eq!(healthy.level, LogLevel::Info);
        assert_eq!(healthy.message, "Health check: healthy");
        assert_eq!(healthy.metadata.health_status, Some(HealthStatus::Healthy));

        let starting = create_health_check_log("shop", HealthStatus::Starting, Default::default());
        assert_eq!(starting.level, LogLevel::Warn);

        let unhealthy =
            create_health_check_log("shop", HealthStatus::Unhealthy, Default::default());
        assert_eq!(unhealthy.level, LogLevel::Warn);
        assert_eq!(unhealthy.event_type(), EventType::HealthCheck);
    }

    #[test]
    fn test_scale_log_keeps_only_new_count() {
        let log = create_scale_log("shop", 2, 5, Default::default());
        assert_eq!(log.message, "Scaled from 2 to 5 replicas");
        assert_eq!(log.metadata.replicas, Some(5));
        assert_eq!(log.event_type(), EventType::ScaleEvent);
        assert_eq!(log.level, LogLevel::Info);
    }

    #[test]
    fn test_entry_wire_format() {
        let log = create_log("hello", EventType::PreDeploy, "shop", LogLevel::Warn, Default::default())
            .with_tags(["canary"]);
        let value = serde_json::to_value(&log).unwrap();

        assert_eq!(value["@context"], SCHEMA_CONTEXT);
        assert_eq!(value["@type"], "UnifiedLogEntry");
        assert_eq!(value["level"], "warn");
        assert_eq!(value["source"]["type"], "deployment");
        assert_eq!(value["metadata"]["event_type"], "pre_deploy");
        assert_eq!(value["tags"][0], "canary");
        assert!(value.get("type").is_none());
        assert!(value["metadata"].get("version").is_none());
    }
}
