//! HTTP client for the HR backend's bot-response endpoint.

use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use crate::credential::FetchCredential;

/// Fixed identifiers the backend expects on every bot-response call.
pub const AGENT_ID: u32 = 6;
pub const CHATLOG_ID: u32 = 7747;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HR backend request timed out")]
    Timeout,

    #[error("Failed to reach HR backend: {0}")]
    Connection(String),

    #[error("HR backend returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("HR backend response was malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub agent_id: u32,
    pub chatlog_id: u32,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dev-hrworkerapi.missionmind.ai/api/kafka".to_string(),
            agent_id: AGENT_ID,
            chatlog_id: CHATLOG_ID,
            connect_timeout: Duration::from_secs(10),
            total_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Deserialize)]
struct BotResponse {
    response: Option<String>,
}

/// Authenticated client for `GET /getBotResponse`.
pub struct HrApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl HrApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .map_err(|e| ApiError::Connection(e.to_string()))?;
        info!("HR API client initialized: {}", config.base_url);
        Ok(Self { http, config })
    }

    /// Sends one query to the backend on behalf of a user and returns the
    /// response text. Empty or missing response bodies are malformed, never
    /// an empty briefing.
    pub async fn get_bot_response(
        &self,
        query: &str,
        user_id: &str,
        credential: &FetchCredential,
    ) -> Result<String, ApiError> {
        let url = format!("{}/getBotResponse", self.config.base_url);
        debug!(
            "HR API call for {} (credential {})",
            user_id,
            credential.redacted()
        );

        let response = self
            .http
            .get(&url)
            .query(&[
                ("query", query),
                ("user_id", user_id),
                ("chatlog_id", &self.config.chatlog_id.to_string()),
                ("agent_id", &self.config.agent_id.to_string()),
                ("mobile_request", "true"),
            ])
            .bearer_auth(credential.token())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout
                } else {
                    ApiError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let body: BotResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))?;

        match body.response {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(ApiError::Malformed("empty response field".to_string())),
            None => Err(ApiError::Malformed("missing response field".to_string())),
        }
    }
}
