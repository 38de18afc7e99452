//! Fetches briefings from the HR backend and lands them in the cache.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use thiserror::Error;

use briefing_cache::{BriefingCache, BriefingRecord, BriefingVariant, CacheError};
use error_monitor::{ErrorEvent, ErrorMonitor, Severity};
use hr_directory::{DirectoryError, UserDirectory};

use crate::client::{ApiError, HrApiClient};
use crate::credential::CredentialSigner;

/// Query text the backend recognizes as the briefing trigger.
const BRIEFING_TRIGGER: &str = "System trigger: daily briefing";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("User {0} has no tenant assignment")]
    TenantNotFound(String),

    #[error("User directory lookup failed: {0}")]
    Directory(#[from] DirectoryError),

    #[error("HR backend fetch timed out")]
    Timeout,

    #[error("HR backend fetch failed: {0}")]
    Backend(ApiError),

    #[error("Briefing could not be cached: {0}")]
    Cache(#[from] CacheError),
}

/// One user refresh, as the scheduler drives it.
#[async_trait]
pub trait UserRefresher: Send + Sync {
    async fn refresh_user(
        &self,
        user_id: &str,
        variant: BriefingVariant,
    ) -> Result<(), FetchError>;
}

/// Ties the directory, credential signer, backend client and cache together.
pub struct BriefingFetcher {
    directory: Arc<dyn UserDirectory>,
    client: HrApiClient,
    cache: Arc<BriefingCache>,
    signer: CredentialSigner,
    monitor: Arc<ErrorMonitor>,
}

impl BriefingFetcher {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        client: HrApiClient,
        cache: Arc<BriefingCache>,
        signer: CredentialSigner,
        monitor: Arc<ErrorMonitor>,
    ) -> Self {
        Self {
            directory,
            client,
            cache,
            signer,
            monitor,
        }
    }

    /// Authenticated call to the backend with a fresh per-call credential.
    /// Failures are reported to the monitor; a failed call returns an error
    /// and touches nothing else.
    async fn authenticated_call(&self, user_id: &str, query: &str) -> Result<String, FetchError> {
        let tenant = match self.directory.lookup_tenant(user_id).await {
            Ok(Some(tenant)) => tenant,
            Ok(None) => {
                self.monitor
                    .report(
                        ErrorEvent::new(
                            "tenant_not_found",
                            "User has no tenant assignment, fetch skipped",
                            Severity::Medium,
                        )
                        .context("user_id", user_id),
                    )
                    .await;
                return Err(FetchError::TenantNotFound(user_id.to_string()));
            }
            Err(e) => {
                self.monitor
                    .report(
                        ErrorEvent::new(
                            "directory_lookup_failed",
                            "User directory lookup failed",
                            Severity::High,
                        )
                        .context("user_id", user_id)
                        .cause(&e),
                    )
                    .await;
                return Err(FetchError::Directory(e));
            }
        };

        let credential = self.signer.issue(user_id, &tenant.tenant_id);
        debug!(
            "Issued credential {} for {} ({})",
            credential.redacted(),
            user_id,
            tenant.organization
        );

        match self.client.get_bot_response(query, user_id, &credential).await {
            Ok(text) => Ok(text),
            Err(ApiError::Timeout) => {
                self.monitor
                    .report(
                        ErrorEvent::new(
                            "backend_timeout",
                            "HR backend call timed out",
                            Severity::Medium,
                        )
                        .context("user_id", user_id),
                    )
                    .await;
                Err(FetchError::Timeout)
            }
            Err(e) => {
                let severity = match &e {
                    ApiError::Status { .. } => Severity::High,
                    ApiError::Connection(_) => Severity::High,
                    ApiError::Malformed(_) => Severity::High,
                    ApiError::Timeout => Severity::Medium,
                };
                self.monitor
                    .report(
                        ErrorEvent::new(
                            "backend_fetch_failed",
                            "HR backend call failed",
                            severity,
                        )
                        .context("user_id", user_id)
                        .cause(&e),
                    )
                    .await;
                Err(FetchError::Backend(e))
            }
        }
    }

    /// Uncached passthrough for interactive HR questions.
    pub async fn query(&self, user_id: &str, query: &str) -> Result<String, FetchError> {
        self.authenticated_call(user_id, query).await
    }
}

#[async_trait]
impl UserRefresher for BriefingFetcher {
    /// Fetches a fresh briefing and writes it to the cache. A failed fetch
    /// never writes anything; whatever the cache already holds stays as is.
    async fn refresh_user(
        &self,
        user_id: &str,
        variant: BriefingVariant,
    ) -> Result<(), FetchError> {
        let content = self.authenticated_call(user_id, BRIEFING_TRIGGER).await?;

        let record = BriefingRecord::new(user_id, content, variant);
        match self.cache.put(record).await {
            Ok(()) => {
                info!("Refreshed {} briefing for {}", variant, user_id);
                Ok(())
            }
            Err(e) => {
                // The cache reported the store failure already.
                warn!("Briefing for {} fetched but not cached: {}", user_id, e);
                Err(FetchError::Cache(e))
            }
        }
    }
}
