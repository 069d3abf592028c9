//! HTTP host for the log stream

pub mod handlers;
pub mod serve;
pub mod state;
