//! Log streaming server
//!
//! Keeps a registry of connected clients, each with its own filter and an
//! bounded outbound queue drained by the client's transport task.
//! Broadcasting only pushes onto those queues, so it never waits on a
//! socket and per-client ordering follows the order of `broadcast` calls.
//! A client whose queue is full or gone is removed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::errors::StreamError;
use crate::filter::SubscriptionFilter;
use crate::schema::LogEntry;
use crate::stream::protocol::{ClientAction, ControlFrame, StreamStats};
use crate::utils::elapsed_ms;

/// Registry key for a connected client
pub type ClientId = u64;

/// Frames a client may have queued before it is considered stalled
pub const DEFAULT_CLIENT_QUEUE: usize = 1024;

/// Instruction for a client's transport task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized JSON frame to deliver
    Frame(String),
    /// Close the connection
    Close,
}

/// Handle given to the transport when a client registers
#[derive(Debug)]
pub struct ClientConnection {
    pub id: ClientId,
    pub rx: mpsc::Receiver<Outbound>,
}

/// Snapshot of a registered client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    pub id: ClientId,
    pub filter: SubscriptionFilter,
    pub subscribed_at: DateTime<Utc>,
}

struct Client {
    tx: mpsc::Sender<Outbound>,
    filter: SubscriptionFilter,
    subscribed_at: DateTime<Utc>,
}

/// Fans log entries out to every connected client whose filter matches
pub struct LogStreamingServer {
    port: u16,
    client_queue: usize,
    clients: RwLock<HashMap<ClientId, Client>>,
    next_client_id: AtomicU64,
    message_count: AtomicU64,
    started_at: DateTime<Utc>,
    closed: AtomicBool,
}

impl LogStreamingServer {
    /// Create a server that reports `port` in its frames and stats
    pub fn new(port: u16) -> Self {
        Self::with_client_queue(port, DEFAULT_CLIENT_QUEUE)
    }

    /// Create a server whose clients may each queue up to `client_queue`
    /// frames
    pub fn with_client_queue(port: u16, client_queue: usize) -> Self {
        Self {
            port,
            client_queue: client_queue.max(1),
            clients: RwLock::new(HashMap::new()),
            next_client_id: AtomicU64::new(1),
            message_count: AtomicU64::new(0),
            started_at: Utc::now(),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a client with its initial filter and queue the
    /// `connected` frame.
    pub fn connect(&self, filter: SubscriptionFilter) -> Result<ClientConnection, StreamError> {
        let (tx, rx) = mpsc::channel(self.client_queue);
        let id = self.next_client_id.fetch_add(1, Ordering::SeqCst);

        let frame = encode(&ControlFrame::connected(self.port, filter.clone()))?;
        // Empty queue with the receiver in hand, so this cannot fail
        let _ = tx.try_send(Outbound::Frame(frame));

        let total = {
            let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
            if self.closed.load(Ordering::SeqCst) {
                return Err(StreamError::StreamClosed);
            }
            if filter.is_empty() {
                info!("Client {} connected, streaming all entries", id);
            } else {
                info!("Client {} connected. Filter: {:?}", id, filter);
            }
            clients.insert(
                id,
                Client {
                    tx,
                    filter,
                    subscribed_at: Utc::now(),
                },
            );
            clients.len()
        };
        info!("{} stream clients connected", total);

        Ok(ClientConnection { id, rx })
    }

    /// Handle a raw frame received from a client.
    ///
    /// Malformed or unknown requests get an `error` frame; the connection
    /// stays open.
    pub fn handle_message(&self, id: ClientId, raw: &str) {
        let reply = match ClientAction::parse(raw) {
            Ok(ClientAction::Subscribe(filter)) => {
                let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
                let Some(client) = clients.get_mut(&id) else {
                    return;
                };
                debug!("Client {} updated filter: {:?}", id, filter);
                client.filter = filter.clone();
                ControlFrame::subscribed(filter)
            }
            Ok(ClientAction::Ping) => ControlFrame::pong(),
            Ok(ClientAction::GetStats) => ControlFrame::Stats {
                stats: self.get_stats(),
            },
            Err(e) => {
                debug!("Rejected message from client {}: {}", id, e);
                ControlFrame::error(e.to_string())
            }
        };

        self.send_to(id, &reply);
    }

    /// Deliver an entry to every client whose filter matches.
    ///
    /// Counts one message per call regardless of recipients. Clients whose
    /// queue is full or closed are dropped from the registry after the
    /// fan-out.
    /// Returns the number of clients the entry was queued for.
    pub fn broadcast(&self, entry: &LogEntry) -> usize {
        self.message_count.fetch_add(1, Ordering::SeqCst);

        let payload = match serde_json::to_string(entry) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode log entry {}: {}", entry.id, e);
                return 0;
            }
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        {
            let clients = self.clients.read().unwrap_or_else(|e| e.into_inner());
            for (id, client) in clients.iter() {
                if !client.filter.matches(entry) {
                    continue;
                }
                match client.tx.try_send(Outbound::Frame(payload.clone())) {
                    Ok(()) => delivered += 1,
                    Err(e) => failed.push((*id, e)),
                }
            }
        }

        for (id, e) in failed {
            warn!("Delivery to client {} failed ({}), removing it", id, reason(&e));
            self.disconnect(id);
        }

        delivered
    }

    /// Remove a client. Safe to call more than once.
    pub fn disconnect(&self, id: ClientId) -> bool {
        let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
        let removed = clients.remove(&id).is_some();
        if removed {
            info!("Client {} disconnected ({} total)", id, clients.len());
        }
        removed
    }

    /// Get server statistics
    pub fn get_stats(&self) -> StreamStats {
        StreamStats {
            total_clients: self.client_count(),
            port: self.port,
            messages_broadcast: self.message_count.load(Ordering::SeqCst),
            uptime_ms: elapsed_ms(self.started_at, Utc::now()),
            started_at: self.started_at,
        }
    }

    /// Connected clients with their filters
    pub fn get_clients(&self) -> Vec<ClientInfo> {
        let clients = self.clients.read().unwrap_or_else(|e| e.into_inner());
        clients
            .iter()
            .map(|(id, client)| ClientInfo {
                id: *id,
                filter: client.filter.clone(),
                subscribed_at: client.subscribed_at,
            })
            .collect()
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close every connection and stop accepting new ones. Idempotent.
    pub fn close(&self) {
        let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Closing log streaming server ({} clients)...", clients.len());
        for (_, client) in clients.drain() {
            // A full queue still ends the transport once the sender is dropped
            let _ = client.tx.try_send(Outbound::Close);
        }
    }

    fn send_to(&self, id: ClientId, frame: &ControlFrame) {
        let frame = match encode(frame) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode control frame: {}", e);
                return;
            }
        };

        let sent = {
            let clients = self.clients.read().unwrap_or_else(|e| e.into_inner());
            match clients.get(&id) {
                Some(client) => client.tx.try_send(Outbound::Frame(frame)),
                None => return,
            }
        };

        if let Err(e) = sent {
            warn!("Reply to client {} failed ({}), removing it", id, reason(&e));
            self.disconnect(id);
        }
    }
}

fn encode(frame: &ControlFrame) -> Result<String, StreamError> {
    Ok(serde_json::to_string(frame)?)
}

fn reason<T>(err: &TrySendError<T>) -> &'static str {
    match err {
        TrySendError::Full(_) => "queue full",
        TrySendError::Closed(_) => "connection gone",
    }
}
