use std::env;
use std::time::Duration;

use chrono::{Local, NaiveDate};

pub const DEFAULT_BASE_URL: &str = "https://lyvframe.com";
pub const DEFAULT_POLL_MS: u64 = 3000;
pub const DEFAULT_TIMEOUT_MS: u64 = 2500;
const MIN_POLL_MS: u64 = 500;
const MIN_TIMEOUT_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub client_id_override: Option<String>,
    pub start_date: NaiveDate,
    pub demo: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("SHOTLIGHT_BASE_URL")
            .map(|val| val.trim().trim_end_matches('/').to_string())
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let poll_ms = lookup("SHOTLIGHT_POLL_MS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_MS)
            .max(MIN_POLL_MS);

        // Keep every request shorter than one tick so polls never pile up.
        let timeout_ms = lookup("SHOTLIGHT_TIMEOUT_MS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS)
            .clamp(MIN_TIMEOUT_MS, poll_ms - MIN_TIMEOUT_MS);

        let client_id_override = lookup("SHOTLIGHT_CLIENT_ID")
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty());

        let start_date = lookup("SHOTLIGHT_DATE")
            .and_then(|val| NaiveDate::parse_from_str(val.trim(), "%Y-%m-%d").ok())
            .unwrap_or_else(|| Local::now().date_naive());

        let demo = lookup("SHOTLIGHT_DEMO")
            .map(|val| is_truthy(&val))
            .unwrap_or(false);

        Self {
            base_url,
            poll_interval: Duration::from_millis(poll_ms),
            request_timeout: Duration::from_millis(timeout_ms),
            client_id_override,
            start_date,
            demo,
        }
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
