//! Deployment Stream Library
//!
//! Structured deployment log entries, a five-phase deployment lifecycle
//! tracker and a live WebSocket log broadcaster.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filter;
pub mod logs;
pub mod schema;
pub mod server;
pub mod stream;
pub mod utils;
