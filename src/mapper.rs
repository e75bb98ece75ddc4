//! Conversion: wire payloads -> domain records.
//!
//! Pure functions, no I/O. Numbers stay numbers here; string formatting for
//! display lives in `format`.

use crate::error::MappingError;
use crate::types::{Asset, PricePoint};
use crate::wire::{RawAsset, RawPriceHistory};

fn required(
    value: Option<f64>,
    asset: &str,
    field: &'static str,
) -> Result<f64, MappingError> {
    let value = value.ok_or_else(|| MappingError::MissingField {
        asset: asset.to_string(),
        field,
    })?;
    if !value.is_finite() {
        return Err(MappingError::NonFinite {
            asset: asset.to_string(),
            field,
        });
    }
    Ok(value)
}

/// Maps one market entry, rejecting missing or non-finite numeric fields
pub fn map_asset(raw: RawAsset) -> Result<Asset, MappingError> {
    if raw.id.is_empty() {
        return Err(MappingError::MissingField {
            asset: String::new(),
            field: "id",
        });
    }
    let id = raw.id.as_str();

    let rank = raw.market_cap_rank.ok_or_else(|| MappingError::MissingField {
        asset: id.to_string(),
        field: "market_cap_rank",
    })?;
    let rank = u32::try_from(rank)
        .ok()
        .filter(|r| *r > 0)
        .ok_or_else(|| MappingError::InvalidRank {
            asset: id.to_string(),
            rank,
        })?;

    let price = required(raw.current_price, id, "current_price")?;
    let change_24h = required(raw.price_change_percentage_24h, id, "price_change_percentage_24h")?;
    let market_cap = required(raw.market_cap, id, "market_cap")?;
    let volume_24h = required(raw.total_volume, id, "total_volume")?;
    let circulating_supply = required(raw.circulating_supply, id, "circulating_supply")?;

    Ok(Asset {
        symbol: raw.symbol.to_uppercase(),
        name: raw.name,
        rank,
        price,
        change_24h,
        market_cap,
        volume_24h,
        circulating_supply,
        image: raw.image.unwrap_or_default(),
        id: raw.id,
    })
}

/// Maps a whole market list in source order (the API already sorts by rank)
///
/// One malformed entry fails the whole list.
pub fn map_asset_list(raw: Vec<RawAsset>) -> Result<Vec<Asset>, MappingError> {
    raw.into_iter().map(map_asset).collect()
}

/// Maps `[timestamp, price]` pairs positionally, keeping source order
pub fn map_price_history(raw: RawPriceHistory) -> Result<Vec<PricePoint>, MappingError> {
    let mut points: Vec<PricePoint> = Vec::with_capacity(raw.prices.len());

    for (index, pair) in raw.prices.iter().enumerate() {
        let (timestamp, price) = match pair.as_slice() {
            [t, p] if t.is_finite() && p.is_finite() => (*t as i64, *p),
            _ => return Err(MappingError::MalformedPoint { index }),
        };

        if let Some(prev) = points.last() {
            if timestamp < prev.timestamp {
                return Err(MappingError::UnorderedHistory { index });
            }
        }
        points.push(PricePoint::new(timestamp, price));
    }

    Ok(points)
}

/// Exact id lookup; a miss is a normal outcome, not an error
pub fn find_by_id<'a>(id: &str, assets: &'a [Asset]) -> Option<&'a Asset> {
    assets.iter().find(|asset| asset.id == id)
}


#[cfg(test)]
mod tests {
    use super::fixtures::{raw_asset, raw_history};
    use super::*;

    #[test]
    fn test_map_asset_keeps_numbers() {
        let asset = map_asset(raw_asset("bitcoin", "BTC", 1, 67000.0, -1.5)).unwrap();
        assert_eq!(asset.symbol, "BTC");
        assert_eq!(asset.rank, 1);
        assert_eq!(asset.price, 67000.0);
        assert_eq!(asset.change_24h, -1.5);
        assert_eq!(asset.image, "https://img.example/bitcoin.png");
    }

    #[test]
    fn test_map_asset_rejects_non_finite() {
        let mut raw = raw_asset("bitcoin", "BTC", 1, 67000.0, 1.0);
        raw.current_price = Some(f64::NAN);
        assert_eq!(
            map_asset(raw),
            Err(MappingError::NonFinite {
                asset: "bitcoin".into(),
                field: "current_price"
            })
        );
    }

    #[test]
    fn test_map_asset_rejects_missing_and_zero_rank() {
        let mut raw = raw_asset("ethereum", "ETH", 2, 3500.0, 1.0);
        raw.circulating_supply = None;
        assert!(matches!(
            map_asset(raw),
            Err(MappingError::MissingField {
                field: "circulating_supply",
                ..
            })
        ));

        let raw = raw_asset("ethereum", "ETH", 0, 3500.0, 1.0);
        assert!(matches!(map_asset(raw), Err(MappingError::InvalidRank { rank: 0, .. })));
    }

    #[test]
    fn test_map_asset_list_preserves_rank_order() {
        let raw = vec![
            raw_asset("bitcoin", "BTC", 1, 67000.0, 1.0),
            raw_asset("ethereum", "ETH", 2, 3500.0, -2.0),
            raw_asset("tether", "USDT", 3, 1.0, 0.0),
        ];
        let ranks_in: Vec<u64> = raw.iter().filter_map(|r| r.market_cap_rank).collect();
        let assets = map_asset_list(raw).unwrap();
        let ranks_out: Vec<u64> = assets.iter().map(|a| a.rank as u64).collect();
        assert_eq!(ranks_in, ranks_out);
        assert_eq!(assets[1].id, "ethereum");
    }

    #[test]
    fn test_map_asset_list_fails_on_one_bad_entry() {
        let mut bad = raw_asset("ethereum", "ETH", 2, 3500.0, -2.0);
        bad.total_volume = None;
        let raw = vec![raw_asset("bitcoin", "BTC", 1, 67000.0, 1.0), bad];
        assert!(map_asset_list(raw).is_err());
    }

    #[test]
    fn test_map_price_history_length_and_order() {
        let points = map_price_history(raw_history(&[100.0, 101.5, 99.0, 102.0])).unwrap();
        assert_eq!(points.len(), 4);
        assert!(points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(points[2].price, 99.0);
        assert!(points[0].time().is_some());
    }

    #[test]
    fn test_map_price_history_rejects_bad_pairs() {
        let raw = RawPriceHistory {
            prices: vec![vec![1.0, 2.0], vec![3.0]],
            ..Default::default()
        };
        assert_eq!(
            map_price_history(raw),
            Err(MappingError::MalformedPoint { index: 1 })
        );

        let raw = RawPriceHistory {
            prices: vec![vec![2000.0, 2.0], vec![1000.0, 3.0]],
            ..Default::default()
        };
        assert_eq!(
            map_price_history(raw),
            Err(MappingError::UnorderedHistory { index: 1 })
        );
    }

    #[test]
    fn test_map_price_history_empty() {
        assert!(map_price_history(RawPriceHistory::default()).unwrap().is_empty());
    }

    #[test]
    fn test_find_by_id() {
        let assets = map_asset_list(vec![
            raw_asset("bitcoin", "BTC", 1, 67000.0, 1.0),
            raw_asset("ethereum", "ETH", 2, 3500.0, -2.0),
        ])
        .unwrap();
        assert_eq!(find_by_id("ethereum", &assets).map(|a| a.rank), Some(2));
        assert!(find_by_id("dogecoin", &assets).is_none());
        assert!(find_by_id("ETH", &assets).is_none());
    }
}
