//! CoinGecko market-data provider implementation

use crate::{
    config::DashboardConfig,
    constants::{COINGECKO_MARKETS_ENDPOINT, COINGECKO_MARKET_CHART_ENDPOINT, USER_AGENT},
    error::ProviderError,
    provider::MarketDataProvider,
    wire::{RawAsset, RawPriceHistory},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

/// CoinGecko market-data provider
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
    vs_currency: String,
    page_size: u32,
    history_days: u32,
}

impl CoinGeckoProvider {
    /// Creates a new CoinGecko provider
    pub fn new(config: &DashboardConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            vs_currency: config.vs_currency.clone(),
            page_size: config.page_size,
            history_days: config.history_days,
        })
    }

    /// Builds the URL for the rank-sorted market list
    fn markets_url(&self) -> String {
        format!(
            "{}{}?vs_currency={}&order=market_cap_desc&per_page={}&page=1&sparkline=false",
            self.base_url, COINGECKO_MARKETS_ENDPOINT, self.vs_currency, self.page_size
        )
    }

    /// Builds the URL for one asset's price history
    fn market_chart_url(&self, asset_id: &str) -> String {
        let path = COINGECKO_MARKET_CHART_ENDPOINT.replace("{id}", asset_id);
        format!(
            "{}{}?vs_currency={}&days={}",
            self.base_url, path, self.vs_currency, self.history_days
        )
    }

    /// GETs `url` and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        tracing::debug!(url = %url, "Requesting CoinGecko");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::NetworkError(e)
            }
        })?;

        // Check for rate limiting
        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }

        // Check for other errors
        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let response_text = response.text().await.map_err(ProviderError::NetworkError)?;

        serde_json::from_str(&response_text).map_err(|e| {
            ProviderError::InvalidResponse(format!(
                "Failed to parse CoinGecko response: {}. Response: {}",
                e, response_text
            ))
        })
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    async fn fetch_markets(&self) -> Result<Vec<RawAsset>, ProviderError> {
        let assets: Vec<RawAsset> = self.get_json(&self.markets_url()).await?;
        tracing::debug!(count = assets.len(), "Fetched market list from CoinGecko");
        Ok(assets)
    }

    async fn fetch_price_history(&self, asset_id: &str) -> Result<RawPriceHistory, ProviderError> {
        let history: RawPriceHistory = self.get_json(&self.market_chart_url(asset_id)).await?;
        tracing::debug!(
            asset_id,
            points = history.prices.len(),
            "Fetched price history from CoinGecko"
        );
        Ok(history)
    }

    fn provider_name(&self) -> &'static str {
        "coingecko"
    }
}
