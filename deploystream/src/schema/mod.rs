//! Structured deployment log schema
//!
//! Every piece of deployment activity is represented as a [`LogEntry`]:
//! a JSON-LD record with a fixed source block and deployment metadata.
//! Entries are built through the factory functions, never by hand.

pub mod entry;
pub mod factory;

pub use entry::{
    DeploymentMetadata, EntryKind, EventType, HealthStatus, LogEntry, LogLevel, LogSource,
    MetadataOverrides, SourceType, SCHEMA_CONTEXT,
};
pub use factory::{create_error_log, create_health_check_log, create_log, create_scale_log};
