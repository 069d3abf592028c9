//! Deployment lifecycle module

pub mod phase;
pub mod recorder;
pub mod session;
pub mod tracker;
