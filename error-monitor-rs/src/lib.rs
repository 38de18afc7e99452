//! # Error Monitor
//!
//! Process-wide failure accounting for the HR briefing service with
//! standardized severities, cumulative per-key counters, a bounded event
//! history, and threshold-triggered notification dispatch.
//!
//! ## Features
//!
//! - Standardized severity levels with per-severity alert thresholds
//! - Monotonic occurrence counts per `(error_type, severity)` key
//! - Bounded in-memory history of recent events for diagnostics
//! - Polymorphic notification channels (log line, operator webhook)
//! - Failure-proof reporting: channel errors never reach the caller

pub mod channels;
pub mod monitor;
pub mod types;

pub use channels::{ChannelError, LogChannel, NotificationChannel, WebhookChannel};
pub use monitor::{global_monitor, init_global, ErrorMonitor, MonitorConfig};
pub use types::{ErrorEvent, Severity};
