//! Wire types for the market-data API.
//!
//! These mirror the JSON exactly; validation and conversion into domain
//! records happen in `mapper`.

use serde::{Deserialize, Serialize};

/// One entry of the `/coins/markets` response (rank-sorted array)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAsset {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
}

/// `/coins/{id}/market_chart` response
///
/// Each series is a list of `[timestamp_ms, value]` pairs in ascending time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPriceHistory {
    pub prices: Vec<Vec<f64>>,
    #[serde(default)]
    pub market_caps: Vec<Vec<f64>>,
    #[serde(default)]
    pub total_volumes: Vec<Vec<f64>>,
}
