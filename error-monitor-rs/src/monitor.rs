//! # Central Error Monitor
//!
//! Cumulative failure accounting with bounded history and threshold-triggered
//! notification dispatch. Counts reset only on process restart; there is no
//! explicit reset operation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use metrics::{counter, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::RwLock;

use crate::channels::NotificationChannel;
use crate::types::{ErrorEvent, Severity};

static GLOBAL_MONITOR: OnceCell<Arc<ErrorMonitor>> = OnceCell::new();

/// Configuration for the error monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Service name attached to diagnostics
    pub service_name: String,
    /// Number of recent events to keep in memory
    pub history_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            service_name: "hr-briefing-assistant".to_string(),
            history_limit: 1000,
        }
    }
}

/// Central monitor every component reports failures to.
pub struct ErrorMonitor {
    config: MonitorConfig,
    counts: RwLock<HashMap<(String, Severity), u64>>,
    history: RwLock<VecDeque<ErrorEvent>>,
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl ErrorMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let history_capacity = config.history_limit;
        Self {
            config,
            counts: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::with_capacity(history_capacity)),
            channels: Vec::new(),
        }
    }

    /// Registers a notification channel. Channels are fixed at construction
    /// time; the monitor is then shared immutably behind an `Arc`.
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Reports one failure.
    ///
    /// Increments the cumulative count for the `(error_type, severity)` key,
    /// appends the event to the bounded history (oldest evicted), logs it
    /// locally, records metrics, and dispatches to the registered channels
    /// when the count reaches the severity's threshold.
    ///
    /// Dispatch is edge-triggered: channels fire only on the call where the
    /// cumulative count becomes exactly equal to the threshold. Later
    /// occurrences of the same key are counted and logged but not
    /// re-dispatched, so a hot failure loop produces one alert per key per
    /// process lifetime rather than one per occurrence.
    ///
    /// Returns the updated cumulative count for the key.
    pub async fn report(&self, mut event: ErrorEvent) -> u64 {
        let key = (event.error_type.clone(), event.severity);

        let count = {
            let mut counts = self.counts.write().await;
            let entry = counts.entry(key).or_insert(0);
            *entry += 1;
            *entry
        };
        event.count = count;

        self.log_event(&event);
        self.record_metrics(&event);

        {
            let mut history = self.history.write().await;
            history.push_back(event.clone());
            while history.len() > self.config.history_limit {
                history.pop_front();
            }
            gauge!("monitor.history.len", history.len() as f64);
        }

        if count == event.severity.threshold() {
            self.dispatch(&event).await;
        }

        count
    }

    /// Current cumulative count for a key. Monotonic for the process lifetime.
    pub async fn count_for(&self, error_type: &str, severity: Severity) -> u64 {
        let counts = self.counts.read().await;
        counts
            .get(&(error_type.to_string(), severity))
            .copied()
            .unwrap_or(0)
    }

    /// Recent events, oldest first, up to the configured history limit.
    pub async fn recent_events(&self) -> Vec<ErrorEvent> {
        let history = self.history.read().await;
        history.iter().cloned().collect()
    }

    /// Recent events filtered by severity.
    pub async fn events_by_severity(&self, severity: Severity) -> Vec<ErrorEvent> {
        let history = self.history.read().await;
        history
            .iter()
            .filter(|e| e.severity == severity)
            .cloned()
            .collect()
    }

    fn log_event(&self, event: &ErrorEvent) {
        match event.severity {
            Severity::Critical | Severity::High => tracing::error!(
                service = %self.config.service_name,
                error_type = %event.error_type,
                count = event.count,
                "{}",
                event
            ),
            Severity::Medium => tracing::warn!(
                service = %self.config.service_name,
                error_type = %event.error_type,
                count = event.count,
                "{}",
                event
            ),
            Severity::Low => tracing::info!(
                service = %self.config.service_name,
                error_type = %event.error_type,
                count = event.count,
                "{}",
                event
            ),
        }
    }

    fn record_metrics(&self, event: &ErrorEvent) {
        counter!("monitor.errors.total", 1);
        match event.severity {
            Severity::Critical => counter!("monitor.errors.severity.critical", 1),
            Severity::High => counter!("monitor.errors.severity.high", 1),
            Severity::Medium => counter!("monitor.errors.severity.medium", 1),
            Severity::Low => counter!("monitor.errors.severity.low", 1),
        }
    }

    /// Fan the event out to every registered channel. A channel failure is
    /// logged and swallowed; reporting must itself be failure-proof.
    async fn dispatch(&self, event: &ErrorEvent) {
        for channel in &self.channels {
            if let Err(e) = channel.deliver(event).await {
                tracing::warn!(
                    channel = channel.name(),
                    error_type = %event.error_type,
                    "Notification delivery failed: {}",
                    e
                );
            } else {
                counter!("monitor.notifications.dispatched", 1);
            }
        }
    }
}

/// Installs the process-global monitor. Returns `false` if one was already
/// installed; the existing instance stays in place.
pub fn init_global(monitor: Arc<ErrorMonitor>) -> bool {
    GLOBAL_MONITOR.set(monitor).is_ok()
}

/// The process-global monitor, if one has been installed.
pub fn global_monitor() -> Option<Arc<ErrorMonitor>> {
    GLOBAL_MONITOR.get().cloned()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::channels::ChannelError;

    struct RecordingChannel {
        delivered: AtomicUsize,
    }

    impl RecordingChannel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delivered: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn deliver(&self, _event: &ErrorEvent) -> Result<(), ChannelError> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingChannel;

    #[async_trait]
    impl NotificationChannel for FailingChannel {
        fn name(&self) -> &str {
            "failing"
        }

        async fn deliver(&self, _event: &ErrorEvent) -> Result<(), ChannelError> {
            Err(ChannelError::Status(500))
        }
    }

    fn monitor_with(channel: Arc<dyn NotificationChannel>) -> ErrorMonitor {
        ErrorMonitor::new(MonitorConfig::default()).with_channel(channel)
    }

    #[tokio::test]
    async fn critical_dispatches_once() {
        let channel = RecordingChannel::new();
        let monitor = monitor_with(channel.clone());

        let count = monitor
            .report(ErrorEvent::new("run_failed", "boom", Severity::Critical))
            .await;

        assert_eq!(count, 1);
        assert_eq!(channel.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_critical_does_not_redispatch() {
        let channel = RecordingChannel::new();
        let monitor = monitor_with(channel.clone());

        monitor
            .report(ErrorEvent::new("run_failed", "boom", Severity::Critical))
            .await;
        let count = monitor
            .report(ErrorEvent::new("run_failed", "boom again", Severity::Critical))
            .await;

        // Edge-triggered policy: the count keeps climbing, the alert does not.
        assert_eq!(count, 2);
        assert_eq!(channel.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn high_dispatches_at_third_occurrence() {
        let channel = RecordingChannel::new();
        let monitor = monitor_with(channel.clone());

        for _ in 0..2 {
            monitor
                .report(ErrorEvent::new("store_down", "unreachable", Severity::High))
                .await;
            assert_eq!(channel.delivered.load(Ordering::SeqCst), 0);
        }

        monitor
            .report(ErrorEvent::new("store_down", "unreachable", Severity::High))
            .await;
        assert_eq!(channel.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn counts_are_per_key() {
        let monitor = ErrorMonitor::new(MonitorConfig::default());

        monitor
            .report(ErrorEvent::new("a", "m", Severity::Medium))
            .await;
        monitor
            .report(ErrorEvent::new("a", "m", Severity::High))
            .await;
        monitor.report(ErrorEvent::new("b", "m", Severity::Medium)).await;

        assert_eq!(monitor.count_for("a", Severity::Medium).await, 1);
        assert_eq!(monitor.count_for("a", Severity::High).await, 1);
        assert_eq!(monitor.count_for("b", Severity::Medium).await, 1);
        assert_eq!(monitor.count_for("b", Severity::High).await, 0);
    }

    #[tokio::test]
    async fn history_evicts_oldest_at_capacity() {
        let monitor = ErrorMonitor::new(MonitorConfig {
            history_limit: 3,
            ..Default::default()
        });

        for i in 0..5 {
            monitor
                .report(ErrorEvent::new("evict", format!("event {}", i), Severity::Low))
                .await;
        }

        let recent = monitor.recent_events().await;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].message, "event 2");
        assert_eq!(recent[2].message, "event 4");
    }

    #[tokio::test]
    async fn channel_failure_never_propagates() {
        let monitor = monitor_with(Arc::new(FailingChannel));

        // Critical threshold is 1, so this call dispatches and the channel
        // fails; report must still complete normally.
        let count = monitor
            .report(ErrorEvent::new("broken_channel", "boom", Severity::Critical))
            .await;
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn events_filterable_by_severity() {
        let monitor = ErrorMonitor::new(MonitorConfig::default());
        monitor
            .report(ErrorEvent::new("x", "low one", Severity::Low))
            .await;
        monitor
            .report(ErrorEvent::new("y", "high one", Severity::High))
            .await;

        let high = monitor.events_by_severity(Severity::High).await;
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].message, "high one");
    }
}
