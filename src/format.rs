//! Display strings for the presentation layer.
//!
//! en-US conventions: `$1,234.56`, `-2.50%`, `19,675,412`. Formatting happens
//! at the boundary; `AssetDisplay` keeps the raw numbers next to the strings
//! so views can still compare and color by value.

use serde::Serialize;

use crate::types::{Asset, ChangeDirection};

/// Inserts thousands separators into the integer part of a plain decimal string
fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// Prices under ten cents keep at least three significant figures
fn currency_decimals(value: f64) -> usize {
    let abs = value.abs();
    if abs >= 0.1 || abs == 0.0 {
        return 2;
    }
    let exponent = abs.log10().floor().abs() as usize;
    (exponent + 2).min(8)
}

/// Localized currency string, e.g. `$67,123.45` or `-$0.000123`
pub fn currency(value: f64) -> String {
    let decimals = currency_decimals(value);
    let body = group_thousands(&format!("{:.1$}", value.abs(), decimals));
    if value < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-${}", body)
    } else {
        format!("${}", body)
    }
}

/// Percentage with two fraction digits; input is already in percent units
pub fn percent(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    if formatted == "-0.00" {
        "0.00%".to_string()
    } else {
        format!("{}%", group_thousands(&formatted))
    }
}

/// Rounded integer with thousands separators
pub fn grouped_integer(value: f64) -> String {
    let formatted = format!("{:.0}", value);
    if formatted == "-0" {
        return "0".to_string();
    }
    group_thousands(&formatted)
}

/// An asset ready for display: formatted strings plus the numbers behind them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetDisplay {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub rank: u32,
    pub image: String,
    pub price: String,
    pub change_24h: String,
    pub market_cap: String,
    pub volume_24h: String,
    pub circulating_supply: String,
    pub direction: ChangeDirection,
    /// Raw values for sorting and comparisons
    pub price_value: f64,
    pub change_24h_value: f64,
}

impl From<&Asset> for AssetDisplay {
    fn from(asset: &Asset) -> Self {
        Self {
            id: asset.id.clone(),
            symbol: asset.symbol.clone(),
            name: asset.name.clone(),
            rank: asset.rank,
            image: asset.image.clone(),
            price: currency(asset.price),
            change_24h: percent(asset.change_24h),
            market_cap: currency(asset.market_cap),
            volume_24h: currency(asset.volume_24h),
            circulating_supply: grouped_integer(asset.circulating_supply),
            direction: asset.change_direction(),
            price_value: asset.price,
            change_24h_value: asset.change_24h,
        }
    }
}
