//! Live log streaming

pub mod protocol;
pub mod server;

pub use protocol::{ClientAction, ControlFrame, ProtocolError, StreamStats};
pub use server::{
    ClientConnection, ClientId, ClientInfo, LogStreamingServer, Outbound, DEFAULT_CLIENT_QUEUE,
};
