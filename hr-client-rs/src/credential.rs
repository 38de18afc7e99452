//! Short-lived signed credentials for HR backend calls.
//!
//! A credential is minted fresh for every fetch and is valid for thirty
//! minutes. The token never appears whole in logs; diagnostics only ever see
//! the redacted form.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

/// Validity window for a freshly minted credential.
pub const CREDENTIAL_TTL_MINUTES: i64 = 30;

/// A signed, time-boxed credential scoped to one user and tenant.
#[derive(Clone)]
pub struct FetchCredential {
    pub subject: String,
    pub tenant_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    token: String,
}

impl FetchCredential {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Redacted rendering safe for logs: first and last four characters of
    /// the token with the middle elided.
    pub fn redacted(&self) -> String {
        if self.token.len() <= 8 {
            return "****".to_string();
        }
        format!(
            "{}…{}",
            &self.token[..4],
            &self.token[self.token.len() - 4..]
        )
    }
}

// Debug must never leak the full token.
impl fmt::Debug for FetchCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCredential")
            .field("subject", &self.subject)
            .field("tenant_id", &self.tenant_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("token", &self.redacted())
            .finish()
    }
}

/// Mints credentials signed with a shared secret.
pub struct CredentialSigner {
    secret: String,
}

impl CredentialSigner {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Issues a credential for one user under one tenant, valid for thirty
    /// minutes from now.
    pub fn issue(&self, subject: &str, tenant_id: &str) -> FetchCredential {
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::minutes(CREDENTIAL_TTL_MINUTES);

        let mut hasher = Sha256::new();
        hasher.update(
            format!(
                "{}|{}|{}|{}",
                subject,
                tenant_id,
                issued_at.timestamp(),
                expires_at.timestamp()
            )
            .as_bytes(),
        );
        hasher.update(self.secret.as_bytes());
        let token = hex::encode(hasher.finalize());

        FetchCredential {
            subject: subject.to_string(),
            tenant_id: tenant_id.to_string(),
            issued_at,
            expires_at,
            token,
        }
    }
}
