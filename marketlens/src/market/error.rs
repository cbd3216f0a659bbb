//! Error types for market resolution.

use thiserror::Error;

use crate::prefilter::PrefilterError;
use crate::tags::TagError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    /// Request rejected before any I/O
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Candidate fetch failed; no view was produced
    #[error(transparent)]
    Prefilter(#[from] PrefilterError),

    #[error(transparent)]
    Tag(#[from] TagError),

    /// A tag was applied before any market was resolved
    #[error("No market has been resolved yet")]
    NoMarket,

    #[error("Organization {0} is not in the current market")]
    UnknownEntity(String),
}

impl MarketError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
