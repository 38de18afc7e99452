//! # Bulk Refresh Scheduler
//!
//! Cron-driven morning and evening refresh runs over the active user
//! population, with adaptive batching and a shared admission gate.

mod run;
mod scheduler;

pub use run::{batch_plan, RefreshRun, RunState};
pub use scheduler::{BulkRefreshScheduler, SchedulerConfig, SchedulerError};
