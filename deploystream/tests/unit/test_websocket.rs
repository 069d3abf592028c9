//! End-to-end WebSocket streaming tests

use std::sync::Arc;
use std::time::Duration;

use deploystream::app::options::ServerOptions;
use deploystream::deploy::tracker::DeploymentLifecycleTracker;
use deploystream::schema::{create_log, EventType, LogLevel, MetadataOverrides};
use deploystream::server::serve::serve;
use deploystream::server::state::ServerState;
use deploystream::stream::LogStreamingServer;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{oneshot, RwLock};
use tokio_tungstenite::{connect_async, tungstenite::Message};

async fn next_json<S>(socket: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("transport error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn wait_for_clients(stream: &LogStreamingServer, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while stream.client_count() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client registry never settled");
}

#[tokio::test]
async fn test_stream_over_websocket() {
    let tracker = Arc::new(RwLock::new(DeploymentLifecycleTracker::new()));
    let stream = Arc::new(LogStreamingServer::new(0));
    let state = Arc::new(ServerState::new(tracker, stream.clone()));
    let options = ServerOptions {
        host: "127.0.0.1".to_string(),
        port: 0,
    };

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let (addr, handle) = serve(&options, state, async move {
        let _ = stop_rx.await;
    })
    .await
    .unwrap();

    let (mut socket, _) = connect_async(format!("ws://{}/ws?app_name=shop", addr))
        .await
        .unwrap();

    let connected = next_json(&mut socket).await;
    assert_eq!(connected["type"], "connected");
    assert_eq!(connected["filter"]["app_name"], "shop");

    socket
        .send(Message::Text(r#"{"action":"ping"}"#.into()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut socket).await["type"], "pong");

    socket.send(Message::Text("not json".into())).await.unwrap();
    let error = next_json(&mut socket).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["message"], "Invalid JSON message");

    let other = create_log(
        "Build started",
        EventType::BuildStart,
        "other",
        LogLevel::Info,
        MetadataOverrides::default(),
    );
    let shop = create_log(
        "Deploy started",
        EventType::DeployStart,
        "shop",
        LogLevel::Info,
        MetadataOverrides::default(),
    );
    assert_eq!(stream.broadcast(&other), 0);
    assert_eq!(stream.broadcast(&shop), 1);

    let entry = next_json(&mut socket).await;
    assert_eq!(entry["@type"], "UnifiedLogEntry");
    assert_eq!(entry["message"], "Deploy started");

    // Closing the stream ends the client connection
    stream.close();
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(msg)) = socket.next().await {
            if msg.is_close() {
                return true;
            }
        }
        true
    })
    .await
    .unwrap();
    assert!(closed);
    assert_eq!(stream.client_count(), 0);

    let _ = stop_tx.send(());
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_get_stats_over_websocket() {
    let tracker = Arc::new(RwLock::new(DeploymentLifecycleTracker::new()));
    let stream = Arc::new(LogStreamingServer::new(0));
    let state = Arc::new(ServerState::new(tracker, stream.clone()));
    let options = ServerOptions {
        host: "127.0.0.1".to_string(),
        port: 0,
    };

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let (addr, handle) = serve(&options, state, async move {
        let _ = stop_rx.await;
    })
    .await
    .unwrap();

    let (mut socket, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    assert_eq!(next_json(&mut socket).await["type"], "connected");

    socket
        .send(Message::Text(r#"{"action":"get_stats"}"#.into()))
        .await
        .unwrap();
    let stats = next_json(&mut socket).await;
    assert_eq!(stats["type"], "stats");
    assert_eq!(stats["stats"]["total_clients"], 1);

    socket.close(None).await.unwrap();
    wait_for_clients(&stream, 0).await;

    let _ = stop_tx.send(());
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_dropped_connection_is_unregistered() {
    let tracker = Arc::new(RwLock::new(DeploymentLifecycleTracker::new()));
    let stream = Arc::new(LogStreamingServer::new(0));
    let state = Arc::new(ServerState::new(tracker, stream.clone()));
    let options = ServerOptions {
        host: "127.0.0.1".to_string(),
        port: 0,
    };

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let (addr, handle) = serve(&options, state, async move {
        let _ = stop_rx.await;
    })
    .await
    .unwrap();

    let (mut kept, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    let (mut dropped, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    assert_eq!(next_json(&mut kept).await["type"], "connected");
    assert_eq!(next_json(&mut dropped).await["type"], "connected");
    assert_eq!(stream.client_count(), 2);

    // No close frame, just the TCP stream going away
    drop(dropped);
    wait_for_clients(&stream, 1).await;

    let entry = create_log(
        "Deploy started",
        EventType::DeployStart,
        "shop",
        LogLevel::Info,
        MetadataOverrides::default(),
    );
    assert_eq!(stream.broadcast(&entry), 1);
    assert_eq!(next_json(&mut kept).await["message"], "Deploy started");

    kept.close(None).await.unwrap();
    wait_for_clients(&stream, 0).await;

    let _ = stop_tx.send(());
    handle.await.unwrap().unwrap();
}
