//! Prefetch configuration.

use std::time::Duration;

use crate::cache::DEFAULT_TTL;

/// Latency above which speculative work is skipped.
pub const DEFAULT_LATENCY_THRESHOLD: Duration = Duration::from_millis(800);

/// Entities prefetched per prediction round.
pub const DEFAULT_MAX_PREDICTIONS: usize = 3;

/// Usage records kept before the least recently seen are dropped.
pub const DEFAULT_MAX_TRACKED: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchConfig {
    /// Lifetime of speculative results
    pub ttl: Duration,
    pub latency_threshold: Duration,
    pub max_predictions: usize,
    pub max_tracked: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            latency_threshold: DEFAULT_LATENCY_THRESHOLD,
            max_predictions: DEFAULT_MAX_PREDICTIONS,
            max_tracked: DEFAULT_MAX_TRACKED,
        }
    }
}
