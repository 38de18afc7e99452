//! Twice-daily bulk refresh of every active user's briefing.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use cron::Schedule;
use futures::future::join_all;
use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::Semaphore;

use briefing_cache::BriefingVariant;
use error_monitor::{ErrorEvent, ErrorMonitor, Severity};
use hr_client::UserRefresher;
use hr_directory::{DirectoryError, UserDirectory};

use crate::run::{batch_plan, RefreshRun, RunState};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid cron expression '{expression}': {message}")]
    InvalidCron { expression: String, message: String },

    #[error("User enumeration failed: {0}")]
    Enumeration(#[from] DirectoryError),
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Cron expression for the morning run, evaluated in UTC
    pub morning_cron: String,
    /// Cron expression for the evening run, evaluated in UTC
    pub evening_cron: String,
    /// Maximum simultaneous per-user refreshes across all batches
    pub gate_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            morning_cron: "0 0 8 * * *".to_string(),
            evening_cron: "0 0 17 * * *".to_string(),
            gate_capacity: 20,
        }
    }
}

/// Drives the morning and evening refresh runs.
///
/// Each run enumerates the active population, splits it into batches sized
/// by `batch_plan`, and refreshes users concurrently under the admission
/// gate. One user's failure never stops the run.
pub struct BulkRefreshScheduler {
    directory: Arc<dyn UserDirectory>,
    refresher: Arc<dyn UserRefresher>,
    monitor: Arc<ErrorMonitor>,
    config: SchedulerConfig,
    gate: Arc<Semaphore>,
    in_flight: AtomicBool,
}

impl BulkRefreshScheduler {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        refresher: Arc<dyn UserRefresher>,
        monitor: Arc<ErrorMonitor>,
        config: SchedulerConfig,
    ) -> Self {
        let gate = Arc::new(Semaphore::new(config.gate_capacity));
        Self {
            directory,
            refresher,
            monitor,
            config,
            gate,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Executes one full refresh run and returns its outcome record.
    pub async fn run_once(&self, variant: BriefingVariant) -> Result<RefreshRun, SchedulerError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            // A prior run is still going. Both proceed; the admission gate
            // bounds the combined concurrency.
            warn!("Refresh run starting while a previous run is still in flight");
            self.monitor
                .report(ErrorEvent::new(
                    "refresh_run_overlap",
                    "Refresh run started while a previous run was still in flight",
                    Severity::Low,
                ))
                .await;
        }

        let result = self.run_inner(variant).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run_inner(&self, variant: BriefingVariant) -> Result<RefreshRun, SchedulerError> {
        let mut run = RefreshRun::begin(variant);
        info!("Refresh run {} started ({})", run.id, variant);

        run.state = RunState::Enumerating;
        let users = match self.directory.list_active_users().await {
            Ok(users) => users,
            Err(e) => {
                run.state = RunState::Failed;
                self.monitor
                    .report(
                        ErrorEvent::new(
                            "user_enumeration_failed",
                            "Could not enumerate active users, refresh run aborted",
                            Severity::Critical,
                        )
                        .context("run_id", run.id.to_string())
                        .cause(&e),
                    )
                    .await;
                return Err(SchedulerError::Enumeration(e));
            }
        };

        run.total_users = users.len();
        if users.is_empty() {
            run.state = RunState::Completed;
            self.monitor
                .report(
                    ErrorEvent::new(
                        "refresh_run_empty",
                        "Refresh run found no active users",
                        Severity::Low,
                    )
                    .context("run_id", run.id.to_string()),
                )
                .await;
            return Ok(run);
        }

        let (batch_size, pause) = batch_plan(users.len());
        info!(
            "Refresh run {}: {} users in batches of {}",
            run.id,
            users.len(),
            batch_size
        );

        run.state = RunState::Batching;
        let batches: Vec<&[String]> = users.chunks(batch_size).collect();
        let batch_count = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            let mut handles = Vec::with_capacity(batch.len());
            for user_id in batch {
                let gate = self.gate.clone();
                let refresher = self.refresher.clone();
                let user_id = user_id.clone();
                handles.push(tokio::spawn(async move {
                    let _permit = gate
                        .acquire_owned()
                        .await
                        .map_err(|_| "admission gate closed")?;
                    refresher
                        .refresh_user(&user_id, variant)
                        .await
                        .map_err(|e| {
                            warn!("Refresh failed for {}: {}", user_id, e);
                            "refresh failed"
                        })
                }));
            }

            for outcome in join_all(handles).await {
                match outcome {
                    Ok(Ok(())) => run.success_count += 1,
                    // A panicked task counts as that user's failure.
                    Ok(Err(_)) | Err(_) => run.failure_count += 1,
                }
            }

            if index + 1 < batch_count {
                tokio::time::sleep(pause).await;
            }
        }

        run.state = RunState::Completed;
        info!(
            "Refresh run {} completed: {}/{} succeeded",
            run.id, run.success_count, run.total_users
        );

        if run.failure_count > 0 {
            self.monitor
                .report(
                    ErrorEvent::new(
                        "refresh_run_failures",
                        "Refresh run completed with per-user failures",
                        Severity::Medium,
                    )
                    .context("run_id", run.id.to_string())
                    .context("failed", run.failure_count.to_string())
                    .context("total", run.total_users.to_string()),
                )
                .await;
        }
        if run.failure_rate() > 0.10 {
            self.monitor
                .report(
                    ErrorEvent::new(
                        "refresh_run_degraded",
                        "More than ten percent of users failed to refresh",
                        Severity::High,
                    )
                    .context("run_id", run.id.to_string())
                    .context("failure_rate", format!("{:.2}", run.failure_rate())),
                )
                .await;
        }

        Ok(run)
    }

    /// Runs forever, firing the morning and evening schedules in UTC.
    ///
    /// Each trigger spawns its run as a task so the loop is back to waiting
    /// for the next trigger immediately. A run that overruns the other
    /// trigger time therefore never swallows it; the late trigger still
    /// fires, the overlap is reported, and both runs proceed under the
    /// shared admission gate.
    pub async fn run_forever(self: Arc<Self>) -> Result<(), SchedulerError> {
        let morning = parse_cron(&self.config.morning_cron)?;
        let evening = parse_cron(&self.config.evening_cron)?;
        info!(
            "Refresh scheduler running (morning '{}', evening '{}')",
            self.config.morning_cron, self.config.evening_cron
        );

        loop {
            let next_morning = morning.upcoming(Utc).next();
            let next_evening = evening.upcoming(Utc).next();

            let (next, variant) = match (next_morning, next_evening) {
                (Some(m), Some(e)) if m <= e => (m, BriefingVariant::Morning),
                (Some(_), Some(e)) => (e, BriefingVariant::Evening),
                (Some(m), None) => (m, BriefingVariant::Morning),
                (None, Some(e)) => (e, BriefingVariant::Evening),
                (None, None) => {
                    error!("Both schedules have no upcoming fire time, scheduler stopping");
                    return Ok(());
                }
            };

            let wait = (next - Utc::now())
                .to_std()
                .unwrap_or_else(|_| std::time::Duration::from_secs(0));
            info!("Next {} refresh at {}", variant, next);
            tokio::time::sleep(wait).await;

            let scheduler = self.clone();
            tokio::spawn(async move {
                if let Err(e) = scheduler.run_once(variant).await {
                    error!("Scheduled {} refresh failed: {}", variant, e);
                }
            });
        }
    }
}

fn parse_cron(expression: &str) -> Result<Schedule, SchedulerError> {
    Schedule::from_str(expression).map_err(|e| SchedulerError::InvalidCron {
        expression: expression.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use mockall::mock;

    use error_monitor::MonitorConfig;
    use hr_client::FetchError;
    use hr_directory::TenantContext;

    use super::*;

    mock! {
        Directory {}

        #[async_trait]
        impl UserDirectory for Directory {
            async fn list_active_users(&self) -> Result<Vec<String>, DirectoryError>;
            async fn lookup_tenant(
                &self,
                user_id: &str,
            ) -> Result<Option<TenantContext>, DirectoryError>;
        }
    }

    /// Refresher stub that counts calls and fails a fixed set of users.
    struct CountingRefresher {
        calls: AtomicUsize,
        failing: HashSet<String>,
    }

    impl CountingRefresher {
        fn new(failing: &[&str]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: failing.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl UserRefresher for CountingRefresher {
        async fn refresh_user(
            &self,
            user_id: &str,
            _variant: BriefingVariant,
        ) -> Result<(), FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(user_id) {
                Err(FetchError::TenantNotFound(user_id.to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn test_monitor() -> Arc<ErrorMonitor> {
        Arc::new(ErrorMonitor::new(MonitorConfig {
            service_name: "scheduler-tests".to_string(),
            history_limit: 100,
        }))
    }

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            gate_capacity: 20,
            ..SchedulerConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_run_refreshes_every_user() {
        let mut directory = MockDirectory::new();
        let users: Vec<String> = (0..120).map(|i| format!("u-{}", i)).collect();
        directory
            .expect_list_active_users()
            .return_once(move || Ok(users));

        let refresher = Arc::new(CountingRefresher::new(&["u-7", "u-42"]));
        let scheduler = BulkRefreshScheduler::new(
            Arc::new(directory),
            refresher.clone(),
            test_monitor(),
            fast_config(),
        );

        let run = scheduler.run_once(BriefingVariant::Morning).await.unwrap();

        assert_eq!(run.total_users, 120);
        assert_eq!(run.success_count + run.failure_count, 120);
        assert_eq!(run.failure_count, 2);
        assert_eq!(run.state, RunState::Completed);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 120);
    }

    #[tokio::test]
    async fn test_empty_population_completes_with_low_event() {
        let mut directory = MockDirectory::new();
        directory
            .expect_list_active_users()
            .return_once(|| Ok(Vec::new()));

        let monitor = test_monitor();
        let scheduler = BulkRefreshScheduler::new(
            Arc::new(directory),
            Arc::new(CountingRefresher::new(&[])),
            monitor.clone(),
            fast_config(),
        );

        let run = scheduler.run_once(BriefingVariant::Evening).await.unwrap();
        assert_eq!(run.total_users, 0);
        assert_eq!(run.state, RunState::Completed);
        assert_eq!(monitor.count_for("refresh_run_empty", Severity::Low).await, 1);
    }

    #[tokio::test]
    async fn test_enumeration_failure_is_critical() {
        let mut directory = MockDirectory::new();
        directory
            .expect_list_active_users()
            .return_once(|| Err(DirectoryError::Status(503)));

        let monitor = test_monitor();
        let scheduler = BulkRefreshScheduler::new(
            Arc::new(directory),
            Arc::new(CountingRefresher::new(&[])),
            monitor.clone(),
            fast_config(),
        );

        let result = scheduler.run_once(BriefingVariant::Morning).await;
        assert!(matches!(result, Err(SchedulerError::Enumeration(_))));
        assert_eq!(
            monitor
                .count_for("user_enumeration_failed", Severity::Critical)
                .await,
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_failure_rate_reports_degraded_run() {
        let mut directory = MockDirectory::new();
        let users: Vec<String> = (0..20).map(|i| format!("u-{}", i)).collect();
        directory
            .expect_list_active_users()
            .return_once(move || Ok(users));

        let failing: Vec<String> = (0..5).map(|i| format!("u-{}", i)).collect();
        let failing_refs: Vec<&str> = failing.iter().map(String::as_str).collect();
        let monitor = test_monitor();
        let scheduler = BulkRefreshScheduler::new(
            Arc::new(directory),
            Arc::new(CountingRefresher::new(&failing_refs)),
            monitor.clone(),
            fast_config(),
        );

        let run = scheduler.run_once(BriefingVariant::Morning).await.unwrap();
        assert_eq!(run.failure_count, 5);
        assert_eq!(
            monitor.count_for("refresh_run_degraded", Severity::High).await,
            1
        );
        assert_eq!(
            monitor.count_for("refresh_run_failures", Severity::Medium).await,
            1
        );
    }

    /// Refresher that holds every call for a while, long enough for a
    /// second run to start in the middle of the first.
    struct SlowRefresher;

    #[async_trait]
    impl UserRefresher for SlowRefresher {
        async fn refresh_user(
            &self,
            _user_id: &str,
            _variant: BriefingVariant,
        ) -> Result<(), FetchError> {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_overrunning_run_reports_overlap_and_both_complete() {
        let mut directory = MockDirectory::new();
        directory
            .expect_list_active_users()
            .times(2)
            .returning(|| Ok(vec!["u-1".to_string(), "u-2".to_string()]));

        let monitor = test_monitor();
        let scheduler = Arc::new(BulkRefreshScheduler::new(
            Arc::new(directory),
            Arc::new(SlowRefresher),
            monitor.clone(),
            fast_config(),
        ));

        let first = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run_once(BriefingVariant::Morning).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let second = scheduler.run_once(BriefingVariant::Evening).await.unwrap();
        let first = first.await.unwrap().unwrap();

        assert_eq!(first.state, RunState::Completed);
        assert_eq!(second.state, RunState::Completed);
        assert_eq!(first.success_count, 2);
        assert_eq!(second.success_count, 2);
        assert_eq!(
            monitor.count_for("refresh_run_overlap", Severity::Low).await,
            1
        );
    }

    #[test]
    fn test_invalid_cron_is_rejected() {
        assert!(matches!(
            parse_cron("not a cron"),
            Err(SchedulerError::InvalidCron { .. })
        ));
        assert!(parse_cron("0 0 8 * * *").is_ok());
    }
}
