//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use super::file::config_directory;
use super::settings::*;
use crate::{cache, map, market, prefetch, prefilter, retry};

pub const DEFAULT_PREFILTER_MARGIN_DEGREES: f64 = prefilter::DEFAULT_MARGIN_DEGREES;
pub const DEFAULT_MAX_RADIUS_MILES: f64 = market::DEFAULT_MAX_RADIUS_MILES;
pub const DEFAULT_RADIUS_MILES: f64 = market::DEFAULT_RADIUS_MILES;

pub const DEFAULT_IDENTIFIER_TTL_SECS: u64 = cache::DEFAULT_TTL.as_secs();

pub const DEFAULT_RETRY_DELAY_MS: u64 = retry::DEFAULT_RETRY_DELAY.as_millis() as u64;

pub const DEFAULT_DEBOUNCE_MS: u64 = map::DEFAULT_DEBOUNCE.as_millis() as u64;
pub const DEFAULT_POLYGON_POINTS: usize = crate::coord::DEFAULT_POLYGON_POINTS;
pub const DEFAULT_CONTAINER_PROBE_ATTEMPTS: u32 = map::DEFAULT_PROBE_ATTEMPTS;
pub const DEFAULT_CONTAINER_PROBE_BASE_MS: u64 = map::DEFAULT_PROBE_BASE_DELAY.as_millis() as u64;

pub const DEFAULT_PREFETCH_TTL_SECS: u64 = cache::DEFAULT_TTL.as_secs();
pub const DEFAULT_LATENCY_THRESHOLD_MS: u64 =
    prefetch::DEFAULT_LATENCY_THRESHOLD.as_millis() as u64;
pub const DEFAULT_MAX_PREDICTIONS: usize = prefetch::DEFAULT_MAX_PREDICTIONS;

/// Polygons with fewer vertices do not look like circles.
pub const MIN_POLYGON_POINTS: usize = 8;
pub const MAX_POLYGON_POINTS: usize = 512;

pub const DEFAULT_LOG_FILE: &str = "marketlens.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            market: MarketSettings {
                prefilter_margin_degrees: DEFAULT_PREFILTER_MARGIN_DEGREES,
                max_radius_miles: DEFAULT_MAX_RADIUS_MILES,
                default_radius_miles: DEFAULT_RADIUS_MILES,
            },
            identifiers: IdentifierSettings {
                ttl_secs: DEFAULT_IDENTIFIER_TTL_SECS,
            },
            network: NetworkSettings {
                retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            },
            map: MapSettings {
                debounce_ms: DEFAULT_DEBOUNCE_MS,
                polygon_points: DEFAULT_POLYGON_POINTS,
                container_probe_attempts: DEFAULT_CONTAINER_PROBE_ATTEMPTS,
                container_probe_base_ms: DEFAULT_CONTAINER_PROBE_BASE_MS,
            },
            prefetch: PrefetchSettings {
                ttl_secs: DEFAULT_PREFETCH_TTL_SECS,
                latency_threshold_ms: DEFAULT_LATENCY_THRESHOLD_MS,
                max_predictions: DEFAULT_MAX_PREDICTIONS,
            },
            logging: LoggingSettings {
                file: config_directory().join("logs").join(DEFAULT_LOG_FILE),
            },
        }
    }
}
