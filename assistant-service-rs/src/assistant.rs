//! Conversation-facing assistant surface.
//!
//! Answers are always spoken text. Failures never surface as errors to the
//! caller, only as apology lines, with the real cause reported through the
//! monitor by the layers below.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use log::{info, warn};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use briefing_cache::{BriefingCache, BriefingVariant};
use hr_client::{BriefingFetcher, FetchError, UserRefresher};

use crate::intent::{acknowledgment, classify, Intent};

const BRIEFING_APOLOGY: &str = "I'm sorry, I couldn't retrieve your daily briefing at this time. \
     Please try again later or contact HR directly.";
const CONNECTION_APOLOGY: &str = "I'm sorry, I'm having trouble connecting to the HR system. \
     Please try again later.";
const QUERY_APOLOGY: &str = "I'm sorry, I encountered an error while looking up that information. \
     Please try again or contact HR directly.";

pub struct Assistant {
    cache: Arc<BriefingCache>,
    fetcher: Arc<BriefingFetcher>,
    interactive_timeout: Duration,
    service_name: String,
}

impl Assistant {
    pub fn new(
        cache: Arc<BriefingCache>,
        fetcher: Arc<BriefingFetcher>,
        interactive_timeout: Duration,
        service_name: String,
    ) -> Self {
        Self {
            cache,
            fetcher,
            interactive_timeout,
            service_name,
        }
    }

    /// Which briefing variant an on-demand fetch lands as, by UTC wall clock.
    fn current_variant() -> BriefingVariant {
        if Utc::now().hour() < 12 {
            BriefingVariant::Morning
        } else {
            BriefingVariant::Evening
        }
    }

    /// The daily briefing as spoken text. Cache-first; a miss triggers one
    /// on-demand fetch. The whole interaction is bounded by the interactive
    /// timeout and degrades to an apology.
    pub async fn get_briefing(&self, user_id: &str) -> String {
        let attempt = async {
            if let Some(record) = self.cache.get(user_id).await {
                return Some(record.content);
            }
            if let Err(e) = self
                .fetcher
                .refresh_user(user_id, Self::current_variant())
                .await
            {
                warn!("On-demand briefing fetch failed for {}: {}", user_id, e);
                return None;
            }
            self.cache.get(user_id).await.map(|record| record.content)
        };

        match tokio::time::timeout(self.interactive_timeout, attempt).await {
            Ok(Some(content)) => format!(
                "Hello! I'm your HR assistant. Here's your daily briefing: {} \
                 How can I help you today? You can ask me about company policies, \
                 benefits, leave requests, or any other HR-related questions.",
                content
            ),
            Ok(None) => BRIEFING_APOLOGY.to_string(),
            Err(_) => {
                warn!("Briefing interaction timed out for {}", user_id);
                BRIEFING_APOLOGY.to_string()
            }
        }
    }

    /// Forwards an HR question to the backend and returns the answer, or an
    /// apology matched to the failure class.
    pub async fn query_hr(&self, user_id: &str, query: &str) -> String {
        let call = self.fetcher.query(user_id, query);
        match tokio::time::timeout(self.interactive_timeout, call).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(FetchError::Timeout)) | Err(_) => CONNECTION_APOLOGY.to_string(),
            Ok(Err(FetchError::Backend(hr_client::ApiError::Connection(_)))) => {
                CONNECTION_APOLOGY.to_string()
            }
            Ok(Err(e)) => {
                warn!("HR query failed for {}: {}", user_id, e);
                QUERY_APOLOGY.to_string()
            }
        }
    }

    /// One conversational turn: acknowledgment plus the fetched answer.
    pub async fn handle_utterance(&self, user_id: &str, utterance: &str) -> String {
        let intent = classify(utterance);
        let ack = acknowledgment(intent, utterance);
        let body = match intent {
            Intent::DailyBriefing => self.get_briefing(user_id).await,
            Intent::HrQuery => self.query_hr(user_id, utterance).await,
        };
        format!("{}. {}", ack, body)
    }

    /// Kicks off a background refresh when the user connects without a
    /// briefing for today. Returns the task handle, or `None` when the cache
    /// already holds one.
    pub async fn on_connect(&self, user_id: &str) -> Option<JoinHandle<()>> {
        if self.cache.has_today(user_id).await {
            return None;
        }

        info!("No briefing for {} today, refreshing in background", user_id);
        let fetcher = self.fetcher.clone();
        let user_id = user_id.to_string();
        Some(tokio::spawn(async move {
            if let Err(e) = fetcher
                .refresh_user(&user_id, Self::current_variant())
                .await
            {
                warn!("Connect-time refresh failed for {}: {}", user_id, e);
            }
        }))
    }

    /// Deployment health snapshot.
    pub fn health(&self) -> Value {
        json!({
            "status": "healthy",
            "service": self.service_name,
            "timestamp": Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
        })
    }
}
