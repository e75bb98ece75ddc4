//! Runtime configuration for the market board
//!
//! Defaults come from `constants`. The API base URL is the only value read
//! from the environment.

use crate::constants::{
    API_URL_ENV_VAR, COINGECKO_API_URL, DEFAULT_VIEWPORT_WIDTH, HISTORY_DAYS, MARKET_PAGE_SIZE,
    NARROW_VIEWPORT_MAX_WIDTH, REQUEST_TIMEOUT_SECS, TRANSITION_DEBOUNCE_MS, VS_CURRENCY,
};
use std::time::Duration;

/// Settings shared by the provider, the selection controller and the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Base URL of the market-data API (no trailing slash)
    pub api_base_url: String,
    /// Quote currency for prices
    pub vs_currency: String,
    /// Number of ranked assets to request
    pub page_size: u32,
    /// History window in days
    pub history_days: u32,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Debounce window between a selection change and the detail panel switching over
    pub transition_debounce: Duration,
    /// Viewports at or below this width collapse the list on selection
    pub narrow_viewport_max_width: f64,
    /// Viewport width assumed until `set_viewport_width` is called
    pub initial_viewport_width: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: COINGECKO_API_URL.to_string(),
            vs_currency: VS_CURRENCY.to_string(),
            page_size: MARKET_PAGE_SIZE,
            history_days: HISTORY_DAYS,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            transition_debounce: Duration::from_millis(TRANSITION_DEBOUNCE_MS),
            narrow_viewport_max_width: NARROW_VIEWPORT_MAX_WIDTH,
            initial_viewport_width: DEFAULT_VIEWPORT_WIDTH,
        }
    }
}

impl DashboardConfig {
    /// Default configuration, with the API base URL taken from
    /// `MARKET_DATA_API_URL` when it is set and non-empty
    pub fn from_env() -> Self {
        let api_base_url = std::env::var(API_URL_ENV_VAR).ok();
        Self::default().with_api_base_url_override(api_base_url)
    }

    fn with_api_base_url_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            tracing::info!(api_base_url = %url, "Using API base URL from environment");
            self.api_base_url = url;
        }
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        self
    }

    /// Returns a copy with a different viewport width assumption
    pub fn with_viewport_width(mut self, width: f64) -> Self {
        self.initial_viewport_width = width;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_mirror_constants() {
        let config = DashboardConfig::default();
        assert_eq!(config.api_base_url, COINGECKO_API_URL);
        assert_eq!(config.transition_debounce, Duration::from_millis(500));
        assert_eq!(config.narrow_viewport_max_width, 800.0);
    }

    #[test]
    fn test_url_override_trims_trailing_slash() {
        let config = DashboardConfig::default()
            .with_api_base_url_override(Some("http://localhost:9000/api/".to_string()));
        assert_eq!(config.api_base_url, "http://localhost:9000/api");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let config = DashboardConfig::default().with_api_base_url_override(Some("  ".to_string()));
        assert_eq!(config.api_base_url, COINGECKO_API_URL);
    }
}
