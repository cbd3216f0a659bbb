//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub market: MarketSettings,
    pub identifiers: IdentifierSettings,
    pub network: NetworkSettings,
    pub map: MapSettings,
    pub prefetch: PrefetchSettings,
    pub logging: LoggingSettings,
}

/// Market resolution settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSettings {
    /// Half-width of the prefilter bounding box in degrees
    pub prefilter_margin_degrees: f64,
    pub max_radius_miles: f64,
    pub default_radius_miles: f64,
}

/// External identifier lookup settings.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierSettings {
    /// Cache lifetime of a lookup result in seconds
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSettings {
    /// Delay before the single retry of a failed call
    pub retry_delay_ms: u64,
}

/// Map layer synchronizer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub debounce_ms: u64,
    pub polygon_points: usize,
    pub container_probe_attempts: u32,
    pub container_probe_base_ms: u64,
}

/// Predictive prefetch settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchSettings {
    pub ttl_secs: u64,
    /// Speculative work is skipped above this latency
    pub latency_threshold_ms: u64,
    pub max_predictions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
