//! # HR Backend Client
//!
//! Credential minting, the authenticated bot-response client and the
//! briefing fetcher that lands results in the tiered cache.

mod client;
mod credential;
mod fetcher;

pub use client::{ApiConfig, ApiError, HrApiClient, AGENT_ID, CHATLOG_ID};
pub use credential::{CredentialSigner, FetchCredential, CREDENTIAL_TTL_MINUTES};
pub use fetcher::{BriefingFetcher, FetchError, UserRefresher};
