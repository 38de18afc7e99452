//! Tiered cache facade over the durable, in-process and file tiers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use thiserror::Error;

use error_monitor::{ErrorEvent, ErrorMonitor, Severity};

use crate::durable::{BriefingStore, StoreError};
use crate::file_tier::FileTier;
use crate::memory::MemoryTier;
use crate::record::{preferred, BriefingRecord};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Durable briefing store rejected the write: {0}")]
    Store(#[from] StoreError),
}

/// The tiered briefing cache.
///
/// Reads prefer the durable store and fall back to the in-process and file
/// tiers when the store is unreachable. Writes are durable-first; a record
/// never reaches the faster tiers unless the store accepted it.
pub struct BriefingCache {
    durable: Arc<dyn BriefingStore>,
    memory: MemoryTier,
    file: FileTier,
    monitor: Arc<ErrorMonitor>,
}

impl BriefingCache {
    pub fn new(
        durable: Arc<dyn BriefingStore>,
        freshness: Duration,
        file_path: PathBuf,
        monitor: Arc<ErrorMonitor>,
    ) -> Self {
        info!(
            "Briefing cache initialized (freshness {}s, file tier {})",
            freshness.as_secs(),
            file_path.display()
        );
        Self {
            durable,
            memory: MemoryTier::new(freshness),
            file: FileTier::new(file_path, freshness),
            monitor,
        }
    }

    /// Returns today's briefing for the user, or `None` when no current
    /// record exists anywhere.
    ///
    /// When the user has both a morning and an evening record for today the
    /// evening one wins. A reachable store that simply has no record for
    /// today is a miss, not a failure.
    pub async fn get(&self, user_id: &str) -> Option<BriefingRecord> {
        let today = Utc::now().date_naive();

        match self.durable.records_for_day(user_id, today).await {
            Ok(records) => {
                if let Some(record) = preferred(records) {
                    self.memory.insert(record.clone()).await;
                    return Some(record);
                }
                // Empty store: fall through to the accelerator tiers.
            }
            Err(e) => {
                warn!("Briefing store read failed for {}, degrading: {}", user_id, e);
                self.monitor
                    .report(
                        ErrorEvent::new(
                            "briefing_store_unreachable",
                            "Briefing store unavailable during read, serving from fallback tiers",
                            Severity::High,
                        )
                        .context("user_id", user_id)
                        .cause(&e),
                    )
                    .await;
            }
        }

        // Degraded path: fallback tiers, but only same-day records count.
        if let Some(record) = self.memory.get_fresh(user_id).await {
            if record.is_for(today) {
                debug!("Served briefing for {} from memory tier", user_id);
                return Some(record);
            }
        }

        if let Some(record) = self.file.read_fresh(user_id) {
            if record.is_for(today) {
                debug!("Served briefing for {} from file tier", user_id);
                self.memory.insert(record.clone()).await;
                return Some(record);
            }
        }

        None
    }

    /// Stores a briefing in all tiers, durable first.
    ///
    /// A store failure aborts the write; the faster tiers are only updated
    /// after the durable upsert succeeds. The file tier write is best-effort
    /// and cannot fail the operation.
    pub async fn put(&self, record: BriefingRecord) -> Result<(), CacheError> {
        if let Err(e) = self.durable.upsert(&record).await {
            self.monitor
                .report(
                    ErrorEvent::new(
                        "briefing_store_write_failed",
                        "Durable briefing store rejected a write",
                        Severity::High,
                    )
                    .context("user_id", record.user_id.clone())
                    .cause(&e),
                )
                .await;
            return Err(CacheError::Store(e));
        }

        self.memory.insert(record.clone()).await;
        self.file.write(&record);

        debug!(
            "Cached briefing for {} ({} / {})",
            record.user_id, record.cache_date, record.variant
        );
        Ok(())
    }

    /// Whether the user already has a briefing for today, consulting the
    /// fallback tiers when the store is down.
    pub async fn has_today(&self, user_id: &str) -> bool {
        let today = Utc::now().date_naive();

        match self.durable.has_record(user_id, today).await {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    "Briefing store existence check failed for {}: {}",
                    user_id, e
                );
                if let Some(record) = self.memory.get_fresh(user_id).await {
                    if record.is_for(today) {
                        return true;
                    }
                }
                self.file
                    .read_fresh(user_id)
                    .map(|r| r.is_for(today))
                    .unwrap_or(false)
            }
        }
    }
}
