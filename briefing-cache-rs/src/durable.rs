//! Durable tier: the authoritative briefing store.
//!
//! The store is the source of truth for briefing records; the other tiers
//! are derived from it. Access goes through the `BriefingStore` trait so the
//! cache, fetcher and tests can be wired against either the real HTTP store
//! or an in-memory one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::task::JoinHandle;

use error_monitor::{ErrorEvent, ErrorMonitor, Severity};

use crate::record::{BriefingRecord, BriefingVariant};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to reach briefing store: {0}")]
    Connection(String),

    #[error("Briefing store request timed out")]
    Timeout,

    #[error("Briefing store returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Failed to decode briefing store response: {0}")]
    Decode(String),

    #[error("Briefing store request pool is closed")]
    PoolClosed,
}

impl StoreError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StoreError::Timeout
        } else {
            StoreError::Connection(e.to_string())
        }
    }
}

/// Read/write access to the authoritative store, keyed by the natural
/// `(user_id, cache_date, variant)` triple.
#[async_trait]
pub trait BriefingStore: Send + Sync {
    /// Insert-or-update by natural key; last write wins on a same-day,
    /// same-variant collision.
    async fn upsert(&self, record: &BriefingRecord) -> Result<(), StoreError>;

    /// All of the user's records for one calendar day.
    async fn records_for_day(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<BriefingRecord>, StoreError>;

    /// Whether any record exists for the user on the given day.
    async fn has_record(&self, user_id: &str, date: NaiveDate) -> Result<bool, StoreError>;

    /// Cheap connectivity probe.
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Configuration for the HTTP briefing store client
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    /// Maximum simultaneous in-flight requests to the store
    pub pool_size: usize,
    /// Low-water mark; available capacity below this is a reportable signal
    pub pool_min_available: usize,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7410".to_string(),
            pool_size: 10,
            pool_min_available: 2,
            connect_timeout: Duration::from_secs(10),
            total_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for the briefing store service.
///
/// Concurrency toward the store is bounded by a semaphore sized to the
/// configured pool; exhaustion is reported to the monitor and the request
/// then waits for capacity rather than failing outright.
pub struct HttpBriefingStore {
    http: reqwest::Client,
    config: StoreConfig,
    pool: Arc<Semaphore>,
    monitor: Arc<ErrorMonitor>,
}

impl HttpBriefingStore {
    pub fn new(config: StoreConfig, monitor: Arc<ErrorMonitor>) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(
            "Briefing store client initialized: {} (pool {})",
            config.base_url, config.pool_size
        );

        Ok(Self {
            http,
            pool: Arc::new(Semaphore::new(config.pool_size)),
            config,
            monitor,
        })
    }

    async fn checkout(&self) -> Result<OwnedSemaphorePermit, StoreError> {
        match self.pool.clone().try_acquire_owned() {
            Ok(permit) => Ok(permit),
            Err(_) => {
                self.monitor
                    .report(
                        ErrorEvent::new(
                            "store_pool_exhausted",
                            "Briefing store request pool exhausted, request is waiting",
                            Severity::High,
                        )
                        .context("pool_size", self.config.pool_size.to_string()),
                    )
                    .await;

                self.pool
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| StoreError::PoolClosed)
            }
        }
    }

    /// Spawns the periodic health-check task for a shared store client.
    /// Failures are reported to the monitor; the task runs for the life of
    /// the process.
    pub fn spawn_health_task(store: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // immediate first tick
            loop {
                ticker.tick().await;

                if let Err(e) = store.health_check().await {
                    store
                        .monitor
                        .report(
                            ErrorEvent::new(
                                "store_health_check_failed",
                                "Briefing store health check failed",
                                Severity::High,
                            )
                            .cause(&e),
                        )
                        .await;
                    continue;
                }

                let available = store.pool.available_permits();
                if available < store.config.pool_min_available {
                    store
                        .monitor
                        .report(
                            ErrorEvent::new(
                                "store_pool_low",
                                "Briefing store pool below minimum available capacity",
                                Severity::Low,
                            )
                            .context("available", available.to_string())
                            .context(
                                "minimum",
                                store.config.pool_min_available.to_string(),
                            ),
                        )
                        .await;
                }
            }
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(StoreError::Status {
            code: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl BriefingStore for HttpBriefingStore {
    async fn upsert(&self, record: &BriefingRecord) -> Result<(), StoreError> {
        let _permit = self.checkout().await?;
        let url = format!("{}/briefings", self.config.base_url);

        let response = self
            .http
            .put(&url)
            .json(record)
            .send()
            .await
            .map_err(StoreError::from_reqwest)?;
        Self::check_status(response).await?;

        debug!(
            "Upserted briefing for {} ({} / {})",
            record.user_id, record.cache_date, record.variant
        );
        Ok(())
    }

    async fn records_for_day(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<BriefingRecord>, StoreError> {
        let _permit = self.checkout().await?;
        let url = format!("{}/briefings", self.config.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("user_id", user_id), ("date", &date.to_string())])
            .send()
            .await
            .map_err(StoreError::from_reqwest)?;
        let response = Self::check_status(response).await?;

        response
            .json::<Vec<BriefingRecord>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn has_record(&self, user_id: &str, date: NaiveDate) -> Result<bool, StoreError> {
        // One record with any variant is enough; reuse the day query.
        Ok(!self.records_for_day(user_id, date).await?.is_empty())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let url = format!("{}/health", self.config.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(StoreError::from_reqwest)?;
        Self::check_status(response).await.map(|_| ())
    }
}

/// In-memory store used in tests and local development.
#[derive(Default)]
pub struct InMemoryBriefingStore {
    records: RwLock<HashMap<(String, NaiveDate, BriefingVariant), BriefingRecord>>,
}

impl InMemoryBriefingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl BriefingStore for InMemoryBriefingStore {
    async fn upsert(&self, record: &BriefingRecord) -> Result<(), StoreError> {
        let key = (
            record.user_id.clone(),
            record.cache_date,
            record.variant,
        );
        let mut records = self.records.write().await;
        match records.get_mut(&key) {
            Some(existing) => {
                existing.content = record.content.clone();
                existing.updated_at = record.updated_at;
            }
            None => {
                records.insert(key, record.clone());
            }
        }
        Ok(())
    }

    async fn records_for_day(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<BriefingRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.user_id == user_id && r.cache_date == date)
            .cloned()
            .collect())
    }

    async fn has_record(&self, user_id: &str, date: NaiveDate) -> Result<bool, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .any(|r| r.user_id == user_id && r.cache_date == date))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
