//! config-rs/lib.rs
//! Shared configuration utilities for consistent service configuration
//! Provides standardized accessors for every tunable the briefing service reads

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Load a `.env.local` (preferred) or `.env` file into the process environment.
///
/// Missing files are not an error; deployed environments configure the
/// process directly.
pub fn load_dotenv() {
    if dotenv::from_filename(".env.local").is_ok() {
        log::debug!("Loaded configuration overrides from .env.local");
    } else if dotenv::dotenv().is_ok() {
        log::debug!("Loaded configuration from .env");
    }
}

/// Get a string setting from the environment with a fallback default.
pub fn get_env_str(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Get a parseable setting from the environment with a fallback default.
///
/// An unparseable value is logged and replaced with the default rather than
/// aborting startup.
pub fn get_env_parse<T: FromStr + std::fmt::Display + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            log::warn!("Invalid value in {}, using default {}", name, default);
            default
        }),
        Err(_) => default,
    }
}

/// Base URL of the external HR backend that produces briefings and answers.
pub fn hr_api_base_url() -> String {
    get_env_str(
        "HR_API_BASE_URL",
        "https://dev-hrworkerapi.missionmind.ai/api/kafka",
    )
}

/// Agent identity presented to the HR backend on every request.
pub fn hr_agent_id() -> u32 {
    get_env_parse("HR_AGENT_ID", 6)
}

/// Default chatlog identifier for requests that are not tied to a live chat.
pub fn hr_chatlog_id() -> u32 {
    get_env_parse("HR_CHATLOG_ID", 7747)
}

/// Shared secret used to sign short-lived fetch credentials.
pub fn credential_secret() -> String {
    match env::var("HR_CREDENTIAL_SECRET") {
        Ok(secret) => secret,
        Err(_) => {
            log::warn!("HR_CREDENTIAL_SECRET not set, using development-only secret");
            "dev-only-credential-secret".to_string()
        }
    }
}

/// Base URL of the durable briefing store service.
pub fn briefing_store_url() -> String {
    get_env_str("BRIEFING_STORE_URL", "http://localhost:7410")
}

/// Base URL of the user directory service.
pub fn user_directory_url() -> String {
    get_env_str("USER_DIRECTORY_URL", "http://localhost:7420")
}

/// Optional operator webhook for threshold-triggered error alerts.
pub fn alert_webhook_url() -> Option<String> {
    env::var("ALERT_WEBHOOK_URL").ok().filter(|v| !v.is_empty())
}

/// Optional bearer token for the alert webhook.
pub fn alert_webhook_token() -> Option<String> {
    env::var("ALERT_WEBHOOK_TOKEN").ok().filter(|v| !v.is_empty())
}

/// Path of the single-record file cache that survives restarts.
pub fn briefing_file_path() -> PathBuf {
    PathBuf::from(get_env_str(
        "BRIEFING_FILE_CACHE",
        "cache/last_briefing.json",
    ))
}

/// Freshness window applied to the accelerator cache tiers, in seconds.
pub fn cache_freshness_secs() -> u64 {
    get_env_parse("CACHE_FRESHNESS_SECS", 30 * 60)
}

/// Cron expression for the morning bulk refresh (seconds field included).
pub fn morning_refresh_cron() -> String {
    get_env_str("MORNING_REFRESH_CRON", "0 0 8 * * *")
}

/// Cron expression for the evening bulk refresh.
pub fn evening_refresh_cron() -> String {
    get_env_str("EVENING_REFRESH_CRON", "0 0 17 * * *")
}

/// Capacity of the admission gate bounding simultaneous in-flight fetches.
pub fn refresh_gate_capacity() -> usize {
    get_env_parse("REFRESH_GATE_CAPACITY", 20)
}

/// Maximum simultaneous requests to the briefing store.
pub fn store_pool_size() -> usize {
    get_env_parse("BRIEFING_STORE_POOL_SIZE", 10)
}

/// Low-water mark for the store request pool; dropping below it is a signal.
pub fn store_pool_min_available() -> usize {
    get_env_parse("BRIEFING_STORE_POOL_MIN", 2)
}

/// Connect timeout for calls to the HR backend.
pub fn hr_connect_timeout() -> Duration {
    Duration::from_secs(get_env_parse("HR_CONNECT_TIMEOUT_SECS", 10))
}

/// Total timeout for calls to the HR backend.
pub fn hr_total_timeout() -> Duration {
    Duration::from_secs(get_env_parse("HR_TOTAL_TIMEOUT_SECS", 30))
}

/// Caller-side timeout for interactive (user-facing) fetches.
pub fn interactive_timeout() -> Duration {
    Duration::from_secs(get_env_parse("INTERACTIVE_TIMEOUT_SECS", 15))
}

/// Service name used in logs and health output.
pub fn service_name() -> String {
    get_env_str("SERVICE_NAME", "hr-briefing-assistant")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_str() {
        std::env::set_var("CFG_TEST_STR", "value");
        assert_eq!(get_env_str("CFG_TEST_STR", "fallback"), "value");

        std::env::remove_var("CFG_TEST_STR_MISSING");
        assert_eq!(get_env_str("CFG_TEST_STR_MISSING", "fallback"), "fallback");
    }

    #[test]
    fn test_get_env_parse() {
        std::env::set_var("CFG_TEST_NUM", "42");
        assert_eq!(get_env_parse("CFG_TEST_NUM", 7u32), 42);

        std::env::set_var("CFG_TEST_NUM_BAD", "not-a-number");
        assert_eq!(get_env_parse("CFG_TEST_NUM_BAD", 7u32), 7);

        std::env::remove_var("CFG_TEST_NUM_MISSING");
        assert_eq!(get_env_parse("CFG_TEST_NUM_MISSING", 7u32), 7);
    }

    #[test]
    fn test_hr_identifier_defaults() {
        std::env::remove_var("HR_AGENT_ID");
        std::env::remove_var("HR_CHATLOG_ID");
        assert_eq!(hr_agent_id(), 6u32);
        assert_eq!(hr_chatlog_id(), 7747u32);
    }

    #[test]
    fn test_schedule_defaults() {
        std::env::remove_var("MORNING_REFRESH_CRON");
        std::env::remove_var("EVENING_REFRESH_CRON");
        assert_eq!(morning_refresh_cron(), "0 0 8 * * *");
        assert_eq!(evening_refresh_cron(), "0 0 17 * * *");
    }
}
