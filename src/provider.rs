//! Provider abstraction for the market-data API

use crate::{
    error::ProviderError,
    wire::{RawAsset, RawPriceHistory},
};
use async_trait::async_trait;

/// Source of raw market data
///
/// Implementations perform the network call and decode JSON into wire types;
/// validation into domain records is left to `mapper`.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches the rank-sorted asset list
    async fn fetch_markets(&self) -> Result<Vec<RawAsset>, ProviderError>;

    /// Fetches the recent price history of one asset
    ///
    /// # Arguments
    /// * `asset_id` - Stable API key of the asset (e.g. "bitcoin")
    async fn fetch_price_history(&self, asset_id: &str) -> Result<RawPriceHistory, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}
