//! Log fan-out tests

use std::sync::Arc;

use deploystream::deploy::phase::PhaseName;
use deploystream::deploy::recorder::DeploymentRecorder;
use deploystream::deploy::session::NewDeployment;
use deploystream::deploy::tracker::DeploymentLifecycleTracker;
use deploystream::errors::StreamError;
use deploystream::filter::SubscriptionFilter;
use deploystream::schema::{create_log, EventType, LogLevel, MetadataOverrides};
use deploystream::stream::{LogStreamingServer, Outbound};
use serde_json::Value;
use tokio::sync::RwLock;

fn frame(outbound: Outbound) -> Value {
    match outbound {
        Outbound::Frame(text) => serde_json::from_str(&text).unwrap(),
        Outbound::Close => panic!("unexpected close"),
    }
}

#[test]
fn test_filtered_and_unfiltered_clients() {
    let server = LogStreamingServer::new(8767);
    let mut shop = server.connect(SubscriptionFilter::for_app("shop")).unwrap();
    let mut all = server.connect(SubscriptionFilter::default()).unwrap();

    assert_eq!(frame(shop.rx.try_recv().unwrap())["type"], "connected");
    assert_eq!(frame(all.rx.try_recv().unwrap())["type"], "connected");

    let entry = create_log(
        "Build started",
        EventType::BuildStart,
        "other",
        LogLevel::Info,
        MetadataOverrides::default(),
    );
    assert_eq!(server.broadcast(&entry), 1);

    assert!(shop.rx.try_recv().is_err());
    let received = frame(all.rx.try_recv().unwrap());
    assert_eq!(received["@type"], "UnifiedLogEntry");
    assert_eq!(received["metadata"]["app_name"], "other");
    assert_eq!(server.get_stats().messages_broadcast, 1);
}

#[test]
fn test_dead_client_is_removed_on_broadcast() {
    let server = LogStreamingServer::new(0);
    let dead = server.connect(SubscriptionFilter::default()).unwrap();
    let mut alive = server.connect(SubscriptionFilter::default()).unwrap();
    drop(dead.rx);

    let entry = create_log(
        "Deploy started",
        EventType::DeployStart,
        "shop",
        LogLevel::Info,
        MetadataOverrides::default(),
    );
    assert_eq!(server.broadcast(&entry), 1);
    assert_eq!(server.client_count(), 1);

    alive.rx.try_recv().unwrap();
    assert_eq!(frame(alive.rx.try_recv().unwrap())["message"], "Deploy started");
}

#[test]
fn test_resubscribe_changes_delivery() {
    let server = LogStreamingServer::new(0);
    let mut client = server.connect(SubscriptionFilter::default()).unwrap();
    client.rx.try_recv().unwrap();

    server.handle_message(
        client.id,
        r#"{"action":"subscribe","filter":{"level":"error"}}"#,
    );
    let reply = frame(client.rx.try_recv().unwrap());
    assert_eq!(reply["type"], "subscribed");
    assert_eq!(reply["filter"]["level"], "error");

    let info = create_log(
        "ok",
        EventType::ConfigChange,
        "shop",
        LogLevel::Info,
        MetadataOverrides::default(),
    );
    assert_eq!(server.broadcast(&info), 0);
    assert!(client.rx.try_recv().is_err());
}

#[tokio::test]
async fn test_recorder_streams_in_order() {
    let tracker = Arc::new(RwLock::new(DeploymentLifecycleTracker::new()));
    let stream = Arc::new(LogStreamingServer::new(0));
    let recorder = DeploymentRecorder::new(tracker.clone(), stream.clone());

    let mut client = stream
        .connect(SubscriptionFilter {
            deployment_id: Some("dep-9".to_string()),
            ..Default::default()
        })
        .unwrap();
    client.rx.try_recv().unwrap();

    recorder
        .start_deployment(NewDeployment::new("dep-9", "shop", "api"))
        .await
        .unwrap();
    recorder.start_phase("dep-9", PhaseName::Build).await.unwrap();
    recorder
        .complete_phase("dep-9", PhaseName::Build, Ok(()))
        .await
        .unwrap();

    let first = frame(client.rx.try_recv().unwrap());
    let second = frame(client.rx.try_recv().unwrap());
    assert_eq!(first["metadata"]["event_type"], "build_start");
    assert_eq!(second["metadata"]["event_type"], "build_complete");

    assert!(recorder.complete_deployment("dep-9").await);
    assert!(tracker.read().await.get_active_deployments().is_empty());
}

#[test]
fn test_recorder_rejects_unknown_deployment() {
    let tracker = Arc::new(RwLock::new(DeploymentLifecycleTracker::new()));
    let stream = Arc::new(LogStreamingServer::new(0));
    let recorder = DeploymentRecorder::new(tracker, stream.clone());

    let result = tokio_test::block_on(recorder.start_phase("missing", PhaseName::Deploy));
    assert!(matches!(result, Err(StreamError::NotFound(_))));
    assert_eq!(stream.get_stats().messages_broadcast, 0);
}
