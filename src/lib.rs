//! # Market Board SDK
//!
//! Core of a live cryptocurrency market board: a ranked asset list, a
//! selected asset with its 7-day price history, and a line chart kept in sync
//! with that history. Market data comes from CoinGecko by default.
//!
//! ## What it guarantees
//!
//! - Each fetch concern (asset list, price history) runs an
//!   Idle → Loading → Success | Error status machine, and only the latest
//!   request of a concern can ever update state.
//! - Selecting assets in quick succession lands only the last one; the detail
//!   panel keeps the previous asset until the transition window elapses.
//! - One chart per mounted view: drawn once, updated in place, destroyed on
//!   unmount.
//!
//! ## Usage
//!
//! ```no_run
//! use market_board_sdk::{MarketDashboard, RenderTarget};
//! # use market_board_sdk::{ChartHandle, ChartRenderer, ChartSpec, ChartError};
//! # struct Canvas;
//! # impl ChartRenderer for Canvas {
//! #     fn create(&mut self, t: &RenderTarget, _: &ChartSpec) -> Result<ChartHandle, ChartError> {
//! #         Ok(ChartHandle::new(t.clone()))
//! #     }
//! #     fn update(&mut self, _: &ChartHandle, _: &ChartSpec) -> Result<(), ChartError> { Ok(()) }
//! #     fn clear(&mut self, _: &ChartHandle) {}
//! #     fn destroy(&mut self, _: ChartHandle) {}
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dashboard = MarketDashboard::new()?;
//! dashboard
//!     .mount_detail(RenderTarget::new("detail-chart"), Box::new(Canvas))
//!     .await;
//! dashboard.start().await;
//!
//! // later, from a click handler
//! dashboard.select_asset("ethereum").await;
//!
//! if let Some(asset) = dashboard.displayed_asset().await {
//!     println!("{}: {}", asset.symbol, market_board_sdk::format::currency(asset.price));
//! }
//! # Ok(())
//! # }
//! ```

pub mod chart;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod format;
pub mod mapper;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod selection;
pub mod types;
pub mod wire;

// Re-export commonly used types
pub use chart::{ChartHandle, ChartRenderer, ChartSpec, ChartSync, RenderTarget};
pub use config::DashboardConfig;
pub use dashboard::MarketDashboard;
pub use error::{ChartError, FailureKind, MappingError, ProviderError};
pub use fetch::{FetchCoordinator, FetchSnapshot};
pub use format::AssetDisplay;
pub use metrics::FetchMetrics;
pub use selection::{SelectOutcome, SelectionController};
pub use types::{
    Asset, ChangeDirection, ComponentHealth, Concern, DashboardEvent, EventKind, HealthStatus,
    PricePoint, RequestStatus, SelectionState,
};
