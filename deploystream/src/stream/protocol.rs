//! Streaming wire protocol
//!
//! Server→client frames are either raw [`LogEntry`](crate::schema::LogEntry)
//! objects (tagged with `@type`) or control frames tagged with `type`.
//! Client→server frames carry an `action` and an optional filter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::SubscriptionFilter;

/// Aggregate counters of the streaming server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    pub total_clients: usize,
    pub port: u16,
    pub messages_broadcast: u64,
    pub uptime_ms: u64,
    pub started_at: DateTime<Utc>,
}

/// Control frames sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    Connected {
        message: String,
        port: u16,
        filter: SubscriptionFilter,
    },
    Subscribed {
        message: String,
        filter: SubscriptionFilter,
    },
    Pong {
        timestamp: DateTime<Utc>,
    },
    Stats {
        stats: StreamStats,
    },
    Error {
        message: String,
    },
}

impl ControlFrame {
    pub fn connected(port: u16, filter: SubscriptionFilter) -> Self {
        ControlFrame::Connected {
            message: "Connected to deployment log stream".to_string(),
            port,
            filter,
        }
    }

    pub fn subscribed(filter: SubscriptionFilter) -> Self {
        ControlFrame::Subscribed {
            message: "Subscription updated".to_string(),
            filter,
        }
    }

    pub fn pong() -> Self {
        ControlFrame::Pong {
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ControlFrame::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClientRequest {
    #[serde(default)]
    action: String,
    #[serde(default)]
    filter: Option<SubscriptionFilter>,
}

/// A recognised client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Replace the client's filter; a missing filter clears it
    Subscribe(SubscriptionFilter),
    Ping,
    GetStats,
}

/// Why a client message was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid JSON message")]
    InvalidJson,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

impl ClientAction {
    /// Parse a raw client frame
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|_| ProtocolError::InvalidJson)?;
        if !value.is_object() {
            return Err(ProtocolError::InvalidMessage(
                "expected a JSON object".to_string(),
            ));
        }
        let request: ClientRequest = serde_json::from_value(value)
            .map_err(|e| ProtocolError::InvalidMessage(e.to_string()))?;

        match request.action.as_str() {
            "subscribe" => Ok(ClientAction::Subscribe(request.filter.unwrap_or_default())),
            "ping" => Ok(ClientAction::Ping),
            "get_stats" => Ok(ClientAction::GetStats),
            _ => Err(ProtocolError::UnknownAction(request.action)),
        }
    }
}
