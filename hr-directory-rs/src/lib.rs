//! # HR User Directory
//!
//! Resolves the population of active briefing users and the tenant context
//! each fetch is scoped to. The directory is a trait so the scheduler and
//! fetcher can run against either the HTTP directory service or a static
//! in-process table.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Failed to reach user directory: {0}")]
    Connection(String),

    #[error("User directory request timed out")]
    Timeout,

    #[error("User directory returned HTTP {0}")]
    Status(u16),

    #[error("Failed to decode user directory response: {0}")]
    Decode(String),
}

impl DirectoryError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DirectoryError::Timeout
        } else {
            DirectoryError::Connection(e.to_string())
        }
    }
}

/// The tenant a user's HR data lives under. Every backend fetch must carry
/// this context; a user with no tenant cannot be fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: String,
    /// Organization label used in diagnostics
    pub organization: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// All users currently enrolled for daily briefings.
    async fn list_active_users(&self) -> Result<Vec<String>, DirectoryError>;

    /// The tenant context for one user, or `None` when the user is unknown
    /// or has no tenant assignment.
    async fn lookup_tenant(&self, user_id: &str) -> Result<Option<TenantContext>, DirectoryError>;
}

/// HTTP client for the directory service.
pub struct HttpUserDirectory {
    http: reqwest::Client,
    base_url: String,
}

impl HttpUserDirectory {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, DirectoryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Connection(e.to_string()))?;
        info!("User directory client initialized: {}", base_url);
        Ok(Self { http, base_url })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DirectoryError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(DirectoryError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DirectoryError::Decode(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ActiveUsersResponse {
    users: Vec<String>,
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn list_active_users(&self) -> Result<Vec<String>, DirectoryError> {
        let url = format!("{}/users/active", self.base_url);
        let body: ActiveUsersResponse = self.get_json(&url, &[]).await?;
        debug!("Directory returned {} active users", body.users.len());
        Ok(body.users)
    }

    async fn lookup_tenant(&self, user_id: &str) -> Result<Option<TenantContext>, DirectoryError> {
        let url = format!("{}/users/tenant", self.base_url);
        match self
            .get_json::<TenantContext>(&url, &[("user_id", user_id)])
            .await
        {
            Ok(tenant) => Ok(Some(tenant)),
            Err(DirectoryError::Status(404)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Fixed in-process directory for local development and tests.
#[derive(Default)]
pub struct StaticDirectory {
    tenants: HashMap<String, TenantContext>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user<U: Into<String>>(mut self, user_id: U, tenant: TenantContext) -> Self {
        self.tenants.insert(user_id.into(), tenant);
        self
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn list_active_users(&self) -> Result<Vec<String>, DirectoryError> {
        let mut users: Vec<String> = self.tenants.keys().cloned().collect();
        users.sort();
        Ok(users)
    }

    async fn lookup_tenant(&self, user_id: &str) -> Result<Option<TenantContext>, DirectoryError> {
        Ok(self.tenants.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> TenantContext {
        TenantContext {
            tenant_id: "t-acme".to_string(),
            organization: "Acme Corp".to_string(),
        }
    }

    #[tokio::test]
    async fn test_static_directory_lists_and_resolves() {
        let directory = StaticDirectory::new()
            .with_user("u-1", acme())
            .with_user("u-2", acme());

        let users = directory.list_active_users().await.unwrap();
        assert_eq!(users, vec!["u-1", "u-2"]);

        let tenant = directory.lookup_tenant("u-1").await.unwrap().unwrap();
        assert_eq!(tenant.tenant_id, "t-acme");
        assert!(directory.lookup_tenant("u-9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_http_directory_unreachable_maps_to_connection_error() {
        let directory = HttpUserDirectory::new(
            "http://127.0.0.1:1".to_string(),
            Duration::from_millis(300),
        )
        .unwrap();

        match directory.list_active_users().await {
            Err(DirectoryError::Connection(_)) | Err(DirectoryError::Timeout) => {}
            other => panic!("expected a transport error, got {:?}", other),
        }
    }
}
