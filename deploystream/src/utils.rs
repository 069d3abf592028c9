//! Utility functions

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Version information for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Generate a log entry id: `dep-<unix millis>-<9 random base-16 chars>`.
///
/// Uniqueness is probabilistic.
pub fn generate_entry_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("dep-{}-{}", Utc::now().timestamp_millis(), &suffix[..9])
}

/// Milliseconds elapsed between two instants, clamped at zero
pub fn elapsed_ms(from: chrono::DateTime<Utc>, to: chrono::DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}
