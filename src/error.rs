//! Error types for the market board

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RequestStatus;

/// Errors that can occur when fetching data from the market-data API
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Response decoded but failed validation
    #[error("Malformed payload: {0}")]
    Malformed(#[from] MappingError),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Non-2xx answer from the API
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

/// Coarse failure classes surfaced alongside an Error status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Request rejected, timed out or answered with a non-2xx status
    NetworkFailure,
    /// Required field missing or non-numeric
    MalformedPayload,
}

impl FailureKind {
    /// Text shown to the end user; the underlying cause only goes to the logs
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::NetworkFailure => "Failed to load market data. Check your connection.",
            FailureKind::MalformedPayload => "Failed to load market data.",
        }
    }
}

impl ProviderError {
    /// Classifies this error for the per-concern Error state
    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::InvalidResponse(_) | ProviderError::Malformed(_) => {
                FailureKind::MalformedPayload
            }
            ProviderError::NetworkError(e) if e.is_decode() => FailureKind::MalformedPayload,
            ProviderError::NetworkError(_)
            | ProviderError::RateLimitExceeded
            | ProviderError::ApiError(_)
            | ProviderError::Timeout => FailureKind::NetworkFailure,
        }
    }
}

/// Validation failures raised while mapping raw payloads into domain records
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    /// A required field is absent (or null)
    #[error("asset {asset}: missing field `{field}`")]
    MissingField { asset: String, field: &'static str },

    /// A required numeric field is NaN or infinite
    #[error("asset {asset}: field `{field}` is not finite")]
    NonFinite { asset: String, field: &'static str },

    /// Rank must be a positive integer
    #[error("asset {asset}: invalid rank {rank}")]
    InvalidRank { asset: String, rank: u64 },

    /// A history entry is not a `[timestamp, price]` pair of finite numbers
    #[error("price history entry {index} is malformed")]
    MalformedPoint { index: usize },

    /// History timestamps went backwards
    #[error("price history entry {index} is older than its predecessor")]
    UnorderedHistory { index: usize },
}

/// Errors raised by the chart sync engine or a chart renderer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// `draw`/`update` called with no points
    #[error("cannot plot an empty price series")]
    EmptySeries,

    /// Renderer rejected the request
    #[error("renderer error: {0}")]
    Renderer(String),

    /// Handle does not belong to the renderer's live charts
    #[error("unknown chart handle for target {0}")]
    UnknownHandle(String),
}

/// Rejected request-status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid status transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: RequestStatus,
    pub to: RequestStatus,
}
