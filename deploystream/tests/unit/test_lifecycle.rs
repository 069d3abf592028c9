//! Deployment lifecycle tests

use deploystream::deploy::phase::{PhaseName, PhaseStatus};
use deploystream::deploy::session::{DeploymentStatus, NewDeployment};
use deploystream::deploy::tracker::DeploymentLifecycleTracker;
use deploystream::schema::{EventType, HealthStatus, LogLevel};

#[test]
fn test_full_successful_deployment() {
    let mut tracker = DeploymentLifecycleTracker::new();
    let session = tracker
        .start_deployment(
            NewDeployment::new("dep-1", "shop", "api")
                .strategy("rolling")
                .replicas(2),
        )
        .unwrap();

    for phase in PhaseName::ALL {
        session.start_phase(phase);
        std::thread::sleep(std::time::Duration::from_millis(2));
        session.succeed_phase(phase);
    }

    let session = tracker.get_deployment("dep-1").unwrap();
    assert_eq!(session.status(), DeploymentStatus::Success);
    for phase in session.phases() {
        assert_eq!(phase.status(), PhaseStatus::Success);
        assert!(phase.duration_ms().is_some());
        assert_eq!(phase.logs().len(), 2);
    }
    assert!(session.total_duration_ms().unwrap() > 0);
    assert_eq!(session.replicas_requested(), 2);

    // One start and one completion entry per phase
    let logs = session.all_logs();
    assert_eq!(logs.len(), 10);
    let events: Vec<EventType> = logs.iter().map(|l| l.event_type()).collect();
    assert_eq!(
        events,
        vec![
            EventType::PreBuild,
            EventType::PreBuild,
            EventType::BuildStart,
            EventType::BuildComplete,
            EventType::PreDeploy,
            EventType::PreDeploy,
            EventType::DeployStart,
            EventType::DeployComplete,
            EventType::PostDeploy,
            EventType::PostDeploy,
        ]
    );
}

#[test]
fn test_build_failure_fails_session() {
    let mut tracker = DeploymentLifecycleTracker::new();
    let session = tracker
        .start_deployment(NewDeployment::new("dep-2", "shop", "cli"))
        .unwrap();

    session.start_phase(PhaseName::Build);
    assert_eq!(session.status(), DeploymentStatus::Building);

    let log = session.fail_phase(PhaseName::Build, "image pull failed");
    assert_eq!(log.level, LogLevel::Error);
    assert_eq!(log.event_type(), EventType::BuildError);
    assert_eq!(log.message, "Phase build failed: image pull failed");

    assert_eq!(session.status(), DeploymentStatus::Failed);
    for phase in [PhaseName::PreDeploy, PhaseName::Deploy, PhaseName::PostDeploy] {
        assert_eq!(session.phase(phase).status(), PhaseStatus::Pending);
    }
    assert_eq!(session.phase(PhaseName::Build).error(), Some("image pull failed"));
}

#[test]
fn test_post_deploy_health_and_scale() {
    let mut tracker = DeploymentLifecycleTracker::new();
    let session = tracker
        .start_deployment(NewDeployment::new("dep-3", "shop", "agent").replicas(2))
        .unwrap();

    session.start_phase(PhaseName::PostDeploy);
    let health = session.record_health_check(HealthStatus::Unhealthy);
    assert_eq!(health.level, LogLevel::Warn);
    assert_eq!(health.message, "Health check: unhealthy");

    let scale = session.record_scale(4);
    assert_eq!(scale.message, "Scaled from 2 to 4 replicas");
    assert_eq!(scale.metadata.replicas, Some(4));
    assert_eq!(session.replicas_requested(), 4);

    // Start entry plus the two recorded events
    assert_eq!(session.phase(PhaseName::PostDeploy).logs().len(), 3);
    assert_eq!(session.health_status(), HealthStatus::Unhealthy);
}

#[test]
fn test_complete_then_query() {
    let mut tracker = DeploymentLifecycleTracker::new();
    tracker
        .start_deployment(NewDeployment::new("dep-4", "shop", "webhook").version("abc123"))
        .unwrap();

    tracker.complete_deployment("dep-4");
    tracker.complete_deployment("dep-4");

    assert!(tracker.get_active_deployments().is_empty());
    let history = tracker.get_app_deployments("shop", 10);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].version(), Some("abc123"));

    let summary = history[0].to_summary();
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["deployment_id"], "dep-4");
    assert_eq!(json["phases"]["post_deploy"]["status"], "pending");
}
