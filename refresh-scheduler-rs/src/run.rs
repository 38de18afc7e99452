//! Bookkeeping for one bulk refresh run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use briefing_cache::BriefingVariant;

/// Lifecycle of a refresh run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Pending,
    Enumerating,
    Batching,
    Completed,
    Failed,
}

/// Outcome record for one scheduled run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRun {
    pub id: Uuid,
    pub variant: BriefingVariant,
    pub started_at: DateTime<Utc>,
    pub total_users: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub state: RunState,
}

impl RefreshRun {
    pub fn begin(variant: BriefingVariant) -> Self {
        Self {
            id: Uuid::new_v4(),
            variant,
            started_at: Utc::now(),
            total_users: 0,
            success_count: 0,
            failure_count: 0,
            state: RunState::Pending,
        }
    }

    pub fn failure_rate(&self) -> f64 {
        if self.total_users == 0 {
            0.0
        } else {
            self.failure_count as f64 / self.total_users as f64
        }
    }
}

/// Batch size and inter-batch pause, adapted to the population size. Larger
/// populations get wider batches and shorter pauses so a run finishes in a
/// bounded window.
pub fn batch_plan(population: usize) -> (usize, std::time::Duration) {
    use std::time::Duration;

    if population > 100 {
        (20, Duration::from_secs(1))
    } else if population > 50 {
        (15, Duration::from_millis(1500))
    } else {
        (10, Duration::from_secs(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_plan_thresholds() {
        assert_eq!(batch_plan(101).0, 20);
        assert_eq!(batch_plan(100).0, 15);
        assert_eq!(batch_plan(51).0, 15);
        assert_eq!(batch_plan(50).0, 10);
        assert_eq!(batch_plan(0).0, 10);
    }

    #[test]
    fn test_failure_rate() {
        let mut run = RefreshRun::begin(BriefingVariant::Morning);
        assert_eq!(run.failure_rate(), 0.0);

        run.total_users = 120;
        run.failure_count = 13;
        assert!(run.failure_rate() > 0.10);
    }
}
