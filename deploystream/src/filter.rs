//! Subscription filters for live log streaming

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::schema::{EventType, LogEntry, LogLevel};

/// Equality constraints a client places on the entries it receives.
///
/// Unset fields match anything; set fields are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
}

impl SubscriptionFilter {
    /// Filter matching a single application
    pub fn for_app(app_name: impl Into<String>) -> Self {
        Self {
            app_name: Some(app_name.into()),
            ..Default::default()
        }
    }

    /// Build a filter from a URL query string (without the leading `?`).
    ///
    /// Recognises `app_name`, `deployment_id`, `level` and `event_type`.
    /// Empty values and values that do not name a known level or event
    /// type are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut filter = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "app_name" => filter.app_name = Some(value.into_owned()),
                "deployment_id" => filter.deployment_id = Some(value.into_owned()),
                "level" => match value.parse() {
                    Ok(level) => filter.level = Some(level),
                    Err(e) => warn!("Ignoring level in connection filter: {}", e),
                },
                "event_type" => match value.parse() {
                    Ok(event_type) => filter.event_type = Some(event_type),
                    Err(e) => warn!("Ignoring event_type in connection filter: {}", e),
                },
                _ => {}
            }
        }

        filter
    }

    /// Check whether every set field matches the entry
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(app_name) = non_empty(&self.app_name) {
            if entry.metadata.app_name != app_name {
                return false;
            }
        }

        if let Some(deployment_id) = non_empty(&self.deployment_id) {
            if entry.metadata.deployment_id.as_deref() != Some(deployment_id) {
                return false;
            }
        }

        if let Some(level) = self.level {
            if entry.level != level {
                return false;
            }
        }

        if let Some(event_type) = self.event_type {
            if entry.metadata.event_type != event_type {
                return false;
            }
        }

        true
    }

    /// Check if the filter matches everything
    pub fn is_empty(&self) -> bool {
        non_empty(&self.app_name).is_none()
            && non_empty(&self.deployment_id).is_none()
            && self.level.is_none()
            && self.event_type.is_none()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
