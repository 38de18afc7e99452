use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::record::BriefingRecord;

struct MemoryEntry {
    record: BriefingRecord,
    stored_at: Instant,
}

/// In-process accelerator tier.
///
/// A derived, disposable map of the most recent record per user. Entries are
/// served only while younger than the freshness window, measured from when
/// they were last populated; the window is independent of the record's
/// calendar date and exists purely to bound staleness when the durable tier
/// cannot be reached.
pub struct MemoryTier {
    entries: RwLock<HashMap<String, MemoryEntry>>,
    freshness: Duration,
}

impl MemoryTier {
    pub fn new(freshness: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            freshness,
        }
    }

    /// Unconditionally overwrites the entry for the record's user, stamping
    /// it with the current instant.
    pub async fn insert(&self, record: BriefingRecord) {
        let mut entries = self.entries.write().await;
        entries.insert(
            record.user_id.clone(),
            MemoryEntry {
                record,
                stored_at: Instant::now(),
            },
        );
    }

    /// Returns the user's record if it is within the freshness window.
    pub async fn get_fresh(&self, user_id: &str) -> Option<BriefingRecord> {
        let entries = self.entries.read().await;
        entries.get(user_id).and_then(|entry| {
            if entry.stored_at.elapsed() <= self.freshness {
                Some(entry.record.clone())
            } else {
                None
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
