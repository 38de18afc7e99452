//! # Standardized Error Event Types
//!
//! Severity levels and the event record that every component reports to the
//! monitor.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The severity level of a reported failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// A failure that requires immediate attention
    Critical,
    /// A significant failure that degrades a core capability
    High,
    /// A failure the system recovers from on the next trigger
    Medium,
    /// An observation worth counting but not acting on individually
    Low,
}

impl Severity {
    /// Cumulative occurrence count at which a key starts alerting.
    pub fn threshold(self) -> u64 {
        match self {
            Severity::Critical => 1,
            Severity::High => 3,
            Severity::Medium => 5,
            Severity::Low => 10,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
        }
    }
}

/// One observed failure, as retained in the monitor's history and delivered
/// to notification channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// A unique identifier for this event instance
    pub id: Uuid,
    /// Category tag, e.g. `briefing_store_unreachable`
    pub error_type: String,
    /// Detailed message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context as key/value pairs
    #[serde(default)]
    pub context: HashMap<String, String>,
    /// When the failure was observed
    pub occurred_at: DateTime<Utc>,
    /// Rendered cause chain, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Running occurrence count for the `(error_type, severity)` key at the
    /// time this event was recorded; filled in by the monitor.
    pub count: u64,
}

impl ErrorEvent {
    /// Creates a new event with the given category, message and severity
    pub fn new<T: Into<String>, M: Into<String>>(
        error_type: T,
        message: M,
        severity: Severity,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            error_type: error_type.into(),
            message: message.into(),
            severity,
            context: HashMap::new(),
            occurred_at: Utc::now(),
            cause: None,
            count: 0,
        }
    }

    /// Adds one context key/value pair
    pub fn context<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Records the underlying cause, rendered to a string
    pub fn cause<E: fmt::Display>(mut self, cause: E) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.error_type, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (caused by: {})", cause)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_table() {
        assert_eq!(Severity::Critical.threshold(), 1);
        assert_eq!(Severity::High.threshold(), 3);
        assert_eq!(Severity::Medium.threshold(), 5);
        assert_eq!(Severity::Low.threshold(), 10);
    }

    #[test]
    fn test_event_builder_and_display() {
        let event = ErrorEvent::new("backend_timeout", "HR backend timed out", Severity::Medium)
            .context("user_id", "u-1")
            .cause("deadline exceeded");

        assert_eq!(event.error_type, "backend_timeout");
        assert_eq!(event.context.get("user_id").map(String::as_str), Some("u-1"));

        let display = format!("{}", event);
        assert!(display.contains("MEDIUM"));
        assert!(display.contains("backend_timeout"));
        assert!(display.contains("deadline exceeded"));
    }
}
