//! Resolution service configuration.

use std::time::Duration;

use crate::cache::DEFAULT_TTL;
use crate::prefilter::DEFAULT_MARGIN_DEGREES;
use crate::retry::DEFAULT_RETRY_DELAY;

/// Largest radius a market may be resolved with.
pub const DEFAULT_MAX_RADIUS_MILES: f64 = 100.0;

/// Radius used when the caller does not pick one.
pub const DEFAULT_RADIUS_MILES: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct MarketConfig {
    /// Half-width of the prefilter query box
    pub prefilter_margin_degrees: f64,
    pub max_radius_miles: f64,
    pub default_radius_miles: f64,
    /// Lifetime of cached identifier lookups
    pub identifier_ttl: Duration,
    /// Delay before the single automatic retry of a store call
    pub retry_delay: Duration,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            prefilter_margin_degrees: DEFAULT_MARGIN_DEGREES,
            max_radius_miles: DEFAULT_MAX_RADIUS_MILES,
            default_radius_miles: DEFAULT_RADIUS_MILES,
            identifier_ttl: DEFAULT_TTL,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}
