//! Predictive prefetch cache.
//!
//! Tracks which entities a user opens, predicts the next ones, and fetches
//! them in the background into a short-lived [`TtlCache`]. Skips speculative
//! work entirely while the measured latency is above the threshold.
//!
//! [`TtlCache`]: crate::cache::TtlCache

mod condition;
mod config;
mod error;
mod prefetcher;
mod usage;

pub use condition::NetworkCondition;
pub use config::{
    PrefetchConfig, DEFAULT_LATENCY_THRESHOLD, DEFAULT_MAX_PREDICTIONS, DEFAULT_MAX_TRACKED,
};
pub use error::PrefetchError;
pub use prefetcher::{LatencyProbe, PredictivePrefetcher, PrefetchSource, PrefetchStats};
pub use usage::{Prediction, UsageRecord, UsageTracker};
