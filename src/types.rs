//! Types for the market board

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FailureKind, TransitionError};

/// A tracked cryptocurrency and its current market metrics
///
/// Identity is `id`. A list of assets is replaced wholesale on every
/// successful list fetch; individual records are never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Stable API key (e.g. "bitcoin")
    pub id: String,
    /// Upper-cased ticker (e.g. "BTC")
    pub symbol: String,
    /// Human-readable name
    pub name: String,
    /// Market-cap rank, 1 = largest
    pub rank: u32,
    /// Price in the quote currency
    pub price: f64,
    /// 24h change in percent (e.g. -2.5 means -2.5%)
    pub change_24h: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub circulating_supply: f64,
    /// Icon URL
    pub image: String,
}

impl Asset {
    /// Direction of the 24h move; zero counts as a gain
    pub fn change_direction(&self) -> ChangeDirection {
        ChangeDirection::from_change(self.change_24h)
    }
}

/// Sign of a price change, used to pick the chart palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    Up,
    Down,
}

impl ChangeDirection {
    pub fn from_change(change: f64) -> Self {
        if change >= 0.0 {
            ChangeDirection::Up
        } else {
            ChangeDirection::Down
        }
    }
}

/// One sample of an asset's price history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Price in the quote currency
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: i64, price: f64) -> Self {
        Self { timestamp, price }
    }

    /// Timestamp as a UTC datetime, if it is representable
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Status of one fetch concern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Nothing requested yet
    #[default]
    Idle,
    /// A request is in flight
    Loading,
    /// The latest request succeeded; its result is readable
    Success,
    /// The latest request failed
    Error,
}

impl RequestStatus {
    /// Whether `self -> next` is a legal step of the status machine
    ///
    /// Idle -> Loading, Loading -> Success | Error, Success | Error -> Loading.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Idle, RequestStatus::Loading)
                | (RequestStatus::Loading, RequestStatus::Success)
                | (RequestStatus::Loading, RequestStatus::Error)
                | (RequestStatus::Success, RequestStatus::Loading)
                | (RequestStatus::Error, RequestStatus::Loading)
        )
    }

    /// Performs the transition or reports why it is illegal
    pub fn transition(self, next: RequestStatus) -> Result<RequestStatus, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, RequestStatus::Success | RequestStatus::Error)
    }
}

/// Independent unit of fetch/status tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concern {
    /// The ranked asset list
    AssetList,
    /// Price history of the selected asset
    PriceHistory,
}

impl Concern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Concern::AssetList => "asset_list",
            Concern::PriceHistory => "price_history",
        }
    }
}

impl std::fmt::Display for Concern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selection and layout state shown by the list/detail views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected_asset_id: Option<String>,
    pub list_expanded: bool,
    /// True for the debounce window following a selection change
    pub transitioning: bool,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            selected_asset_id: None,
            list_expanded: true,
            transitioning: false,
        }
    }
}

/// Event published on the dashboard's broadcast channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl DashboardEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            EventKind::FetchStarted { .. } => "FETCH_STARTED",
            EventKind::FetchSucceeded { .. } => "FETCH_SUCCEEDED",
            EventKind::FetchFailed { .. } => "FETCH_FAILED",
            EventKind::FetchSuperseded { .. } => "FETCH_SUPERSEDED",
            EventKind::SelectionChanged { .. } => "SELECTION_CHANGED",
            EventKind::TransitionCompleted { .. } => "TRANSITION_COMPLETED",
            EventKind::ListToggled { .. } => "LIST_TOGGLED",
            EventKind::ChartDrawn { .. } => "CHART_DRAWN",
            EventKind::ChartUpdated { .. } => "CHART_UPDATED",
            EventKind::ChartCleared { .. } => "CHART_CLEARED",
            EventKind::ChartDestroyed { .. } => "CHART_DESTROYED",
        }
    }
}

/// Payload of a `DashboardEvent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A concern entered Loading for `key`
    FetchStarted {
        concern: Concern,
        key: String,
        generation: u64,
    },
    /// The latest request of a concern succeeded
    FetchSucceeded {
        concern: Concern,
        key: String,
        generation: u64,
    },
    /// The latest request of a concern failed
    FetchFailed {
        concern: Concern,
        key: String,
        generation: u64,
        failure: FailureKind,
    },
    /// A request was superseded by a newer trigger and its result dropped
    FetchSuperseded {
        concern: Concern,
        key: String,
        generation: u64,
    },
    /// Selected asset changed
    SelectionChanged {
        asset_id: String,
        list_expanded: bool,
    },
    /// Debounce window elapsed; the detail panel now shows `asset_id`
    TransitionCompleted { asset_id: String },
    /// List expanded/collapsed by the user
    ListToggled { expanded: bool },
    ChartDrawn { target: String, asset_id: String },
    ChartUpdated { target: String, asset_id: String },
    /// Series blanked while the selected asset's history is not loaded
    ChartCleared { target: String },
    ChartDestroyed { target: String },
}

impl std::fmt::Display for DashboardEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            EventKind::FetchStarted { concern, key, .. } => {
                write!(f, "Fetching {} ({})", concern, key)
            }
            EventKind::FetchSucceeded { concern, key, .. } => {
                write!(f, "Loaded {} ({})", concern, key)
            }
            EventKind::FetchFailed {
                concern,
                key,
                failure,
                ..
            } => write!(f, "Failed to load {} ({}): {:?}", concern, key, failure),
            EventKind::FetchSuperseded {
                concern,
                key,
                generation,
            } => write!(
                f,
                "Dropped stale {} response ({}, generation {})",
                concern, key, generation
            ),
            EventKind::SelectionChanged {
                asset_id,
                list_expanded,
            } => write!(
                f,
                "Selected {} (list {})",
                asset_id,
                if *list_expanded { "expanded" } else { "collapsed" }
            ),
            EventKind::TransitionCompleted { asset_id } => {
                write!(f, "Detail panel now shows {}", asset_id)
            }
            EventKind::ListToggled { expanded } => write!(f, "List expanded: {}", expanded),
            EventKind::ChartDrawn { target, asset_id } => {
                write!(f, "Chart drawn on {} for {}", target, asset_id)
            }
            EventKind::ChartUpdated { target, asset_id } => {
                write!(f, "Chart on {} updated for {}", target, asset_id)
            }
            EventKind::ChartCleared { target } => write!(f, "Chart on {} cleared", target),
            EventKind::ChartDestroyed { target } => write!(f, "Chart on {} destroyed", target),
        }
    }
}

/// Overall system health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// System is healthy and all components are operational
    Healthy,
    /// System is degraded but still functional
    Degraded,
    /// System is unhealthy and requires attention
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
