//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[market]
; Half-width of the coarse bounding-box query around the market center (degrees)
prefilter_margin_degrees = {}
; Largest radius a market may be resolved with (miles)
max_radius_miles = {}
; Radius used when none is given (miles)
default_radius_miles = {}

[identifiers]
; How long external identifier lookups are cached (seconds)
ttl_secs = {}

[network]
; Failed store and lookup calls are retried once after this delay (milliseconds)
retry_delay_ms = {}

[map]
; Quiet period before map layers are created (milliseconds)
debounce_ms = {}
; Vertices of the radius circle polygon ({}-{})
polygon_points = {}
; Container size probes after the map is attached with zero size
container_probe_attempts = {}
; First probe delay, doubled on each attempt (milliseconds)
container_probe_base_ms = {}

[prefetch]
; How long speculative results are kept (seconds)
ttl_secs = {}
; Skip speculative prefetching when measured latency exceeds this (milliseconds)
latency_threshold_ms = {}
; Entities prefetched after each tracked visit
max_predictions = {}

[logging]
; Log file path
file = {}
"#,
        config.market.prefilter_margin_degrees,
        config.market.max_radius_miles,
        config.market.default_radius_miles,
        config.identifiers.ttl_secs,
        config.network.retry_delay_ms,
        config.map.debounce_ms,
        super::defaults::MIN_POLYGON_POINTS,
        super::defaults::MAX_POLYGON_POINTS,
        config.map.polygon_points,
        config.map.container_probe_attempts,
        config.map.container_probe_base_ms,
        config.prefetch.ttl_secs,
        config.prefetch.latency_threshold_ms,
        config.prefetch.max_predictions,
        path_to_string(&config.logging.file),
    )
}

/// Convert path to string, using ~ for home directory.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_every_section() {
        let content = to_config_string(&ConfigFile::default());

        for section in ["[market]", "[identifiers]", "[network]", "[map]", "[prefetch]", "[logging]"] {
            assert!(content.contains(section), "missing {}", section);
        }
        assert!(content.contains("max_radius_miles = 100"));
        assert!(content.contains("debounce_ms = 300"));
    }

    #[test]
    fn test_output_parses_back() {
        let mut config = ConfigFile::default();
        config.market.prefilter_margin_degrees = 1.25;
        config.prefetch.latency_threshold_ms = 500;

        let parsed = ConfigFile::from_ini_str(&to_config_string(&config)).unwrap();

        assert_eq!(parsed.market, config.market);
        assert_eq!(parsed.prefetch, config.prefetch);
        assert_eq!(parsed.map, config.map);
    }
}
