use std::time::Duration;

use crate::coord::DEFAULT_POLYGON_POINTS;

/// Delay between the last triggering change and layer creation.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub const DEFAULT_PROBE_ATTEMPTS: u32 = 6;
pub const DEFAULT_PROBE_BASE_DELAY: Duration = Duration::from_millis(50);

/// Map layer synchronizer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub debounce: Duration,
    /// Vertices of the radius polygon (before closing)
    pub polygon_points: usize,
    /// Container size probes after a zero-size attach
    pub container_probe_attempts: u32,
    /// First probe delay; doubles per attempt
    pub container_probe_base: Duration,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            polygon_points: DEFAULT_POLYGON_POINTS,
            container_probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            container_probe_base: DEFAULT_PROBE_BASE_DELAY,
        }
    }
}
