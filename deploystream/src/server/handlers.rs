//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        RawQuery, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::deploy::tracker::TrackerStats;
use crate::filter::SubscriptionFilter;
use crate::server::state::ServerState;
use crate::stream::{LogStreamingServer, Outbound, StreamStats};
use crate::utils::version_info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub deployments: TrackerStats,
    pub stream: StreamStats,
}

/// Health check handler
pub async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let deployments = state.tracker.read().await.get_stats();
    let status = if state.stream.is_closed() {
        "closing"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        service: "deploystream".to_string(),
        version: version_info().version,
        deployments,
        stream: state.stream.get_stats(),
    })
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// WebSocket upgrade for the live log stream.
///
/// The query string supplies the initial filter.
pub async fn stream_handler(
    ws: WebSocketUpgrade,
    RawQuery(query): RawQuery,
    State(state): State<Arc<ServerState>>,
) -> Response {
    if state.stream.is_closed() {
        return (StatusCode::SERVICE_UNAVAILABLE, "log stream is closed").into_response();
    }

    let filter = SubscriptionFilter::from_query(query.as_deref().unwrap_or_default());
    let stream = state.stream.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, stream, filter))
}

async fn handle_socket(socket: WebSocket, stream: Arc<LogStreamingServer>, filter: SubscriptionFilter) {
    let connection = match stream.connect(filter) {
        Ok(connection) => connection,
        Err(e) => {
            warn!("Rejecting stream client: {}", e);
            return;
        }
    };
    let id = connection.id;
    let mut rx = connection.rx;

    let (mut sender, mut receiver) = socket.split();

    // Drain queued frames onto the socket in order
    let mut writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Frame(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut writer => break,
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => stream.handle_message(id, text.as_str()),
                Some(Ok(Message::Binary(bytes))) => {
                    stream.handle_message(id, &String::from_utf8_lossy(&bytes))
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Stream client {} transport error: {}", id, e);
                    break;
                }
            }
        }
    }

    stream.disconnect(id);
    writer.abort();
}
