//! Constants for the market board
//!
//! Every tunable of the board lives here. `DashboardConfig::default()` copies
//! these values; the only runtime override is the API base URL (see `config`).

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Endpoint returning the rank-sorted market list
pub const COINGECKO_MARKETS_ENDPOINT: &str = "/coins/markets";

/// Endpoint template for per-asset history (`{id}` is substituted)
pub const COINGECKO_MARKET_CHART_ENDPOINT: &str = "/coins/{id}/market_chart";

/// Environment variable overriding the API base URL
pub const API_URL_ENV_VAR: &str = "MARKET_DATA_API_URL";

/// Quote currency for every price on the board
pub const VS_CURRENCY: &str = "usd";

/// Number of ranked assets requested per list fetch
pub const MARKET_PAGE_SIZE: u32 = 50;

/// Width of the price-history window (in days)
pub const HISTORY_DAYS: u32 = 7;

/// HTTP request timeout (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "market-board-sdk/0.1.0";

/// How long the detail panel keeps showing the previous asset after a selection change
pub const TRANSITION_DEBOUNCE_MS: u64 = 500;

/// Viewports at or below this width collapse the list when an asset is selected
pub const NARROW_VIEWPORT_MAX_WIDTH: f64 = 800.0;

/// Viewport width assumed until the embedder reports one
pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1280.0;

/// Lower axis bound = min(price) * this factor
pub const AXIS_MIN_FACTOR: f64 = 0.98;

/// Upper axis bound = max(price) * this factor
pub const AXIS_MAX_FACTOR: f64 = 1.02;

/// Smallest half-span used when the padded price range collapses to a point
pub const MIN_AXIS_HALF_SPAN: f64 = 1e-8;

/// Curve smoothing (bezier tension) applied to the price line
pub const LINE_TENSION: f64 = 0.4;

/// Stroke color for assets whose 24h change is >= 0
pub const GAIN_COLOR: (u8, u8, u8) = (22, 199, 132);

/// Stroke color for assets whose 24h change is < 0
pub const LOSS_COLOR: (u8, u8, u8) = (234, 57, 67);

/// Stroke opacity
pub const STROKE_ALPHA: f64 = 1.0;

/// Fill-under-curve opacity
pub const FILL_ALPHA: f64 = 0.1;

/// Capacity of the dashboard event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Number of latency samples kept per fetch concern
pub const MAX_METRIC_SAMPLES: usize = 100;
