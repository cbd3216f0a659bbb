//! Market resolution.
//!
//! Turns a center, radius, and tag scope into a published [`MarketView`]:
//! prefilter, exact distance ranking, identifier cross-reference, and tag
//! overlay, with supersession of stale requests.
//!
//! [`MarketView`]: crate::model::MarketView

mod config;
mod error;
mod ranking;
mod request;
mod service;

pub use config::{MarketConfig, DEFAULT_MAX_RADIUS_MILES, DEFAULT_RADIUS_MILES};
pub use error::MarketError;
pub use ranking::rank_within_radius;
pub use request::{MarketRequest, ResolveOutcome};
pub use service::{MarketResolutionService, ViewReceiver};

// Client-side filters operate on resolved markets
pub use crate::model::MarketFilter;
