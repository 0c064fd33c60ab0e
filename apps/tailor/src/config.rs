use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_PREVIEW_DEBOUNCE_MS: u64 = 600;

/// Client configuration loaded once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the tailoring/compilation service, without a trailing slash.
    pub api_url: String,
    pub request_timeout: Duration,
    pub preview_debounce: Duration,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            preview_debounce: Duration::from_millis(DEFAULT_PREVIEW_DEBOUNCE_MS),
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("TAILOR_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_secs = match lookup("TAILOR_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("TAILOR_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let debounce_ms = match lookup("TAILOR_PREVIEW_DEBOUNCE_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("TAILOR_PREVIEW_DEBOUNCE_MS must be a whole number of milliseconds")?,
            None => DEFAULT_PREVIEW_DEBOUNCE_MS,
        };

        Ok(Config {
            api_url: normalize_base_url(&api_url),
            request_timeout: Duration::from_secs(timeout_secs),
            preview_debounce: Duration::from_millis(debounce_ms),
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Replaces the base URL, e.g. from a command-line flag.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = normalize_base_url(api_url);
        self
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
