//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::{MAX_POLYGON_POINTS, MIN_POLYGON_POINTS};
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::coord::MAX_LAT;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [market] section
    if let Some(section) = ini.section(Some("market")) {
        if let Some(v) = parse_positive_f64(section, "market", "prefilter_margin_degrees")? {
            if v > MAX_LAT {
                return Err(invalid(
                    "market",
                    "prefilter_margin_degrees",
                    &v.to_string(),
                    "must be at most 90 degrees",
                ));
            }
            config.market.prefilter_margin_degrees = v;
        }
        if let Some(v) = parse_positive_f64(section, "market", "max_radius_miles")? {
            config.market.max_radius_miles = v;
        }
        if let Some(v) = parse_positive_f64(section, "market", "default_radius_miles")? {
            config.market.default_radius_miles = v;
        }
    }
    if config.market.default_radius_miles > config.market.max_radius_miles {
        return Err(invalid(
            "market",
            "default_radius_miles",
            &config.market.default_radius_miles.to_string(),
            "must not exceed max_radius_miles",
        ));
    }

    // [identifiers] section
    if let Some(section) = ini.section(Some("identifiers")) {
        if let Some(v) = parse_number::<u64>(section, "identifiers", "ttl_secs")? {
            config.identifiers.ttl_secs = v;
        }
    }

    // [network] section
    if let Some(section) = ini.section(Some("network")) {
        if let Some(v) = parse_number::<u64>(section, "network", "retry_delay_ms")? {
            config.network.retry_delay_ms = v;
        }
    }

    // [map] section
    if let Some(section) = ini.section(Some("map")) {
        if let Some(v) = parse_number::<u64>(section, "map", "debounce_ms")? {
            config.map.debounce_ms = v;
        }
        if let Some(v) = parse_number::<usize>(section, "map", "polygon_points")? {
            if !(MIN_POLYGON_POINTS..=MAX_POLYGON_POINTS).contains(&v) {
                return Err(invalid(
                    "map",
                    "polygon_points",
                    &v.to_string(),
                    &format!(
                        "must be between {} and {}",
                        MIN_POLYGON_POINTS, MAX_POLYGON_POINTS
                    ),
                ));
            }
            config.map.polygon_points = v;
        }
        if let Some(v) = parse_number::<u32>(section, "map", "container_probe_attempts")? {
            config.map.container_probe_attempts = v;
        }
        if let Some(v) = parse_number::<u64>(section, "map", "container_probe_base_ms")? {
            config.map.container_probe_base_ms = v;
        }
    }

    // [prefetch] section
    if let Some(section) = ini.section(Some("prefetch")) {
        if let Some(v) = parse_number::<u64>(section, "prefetch", "ttl_secs")? {
            config.prefetch.ttl_secs = v;
        }
        if let Some(v) = parse_number::<u64>(section, "prefetch", "latency_threshold_ms")? {
            config.prefetch.latency_threshold_ms = v;
        }
        if let Some(v) = parse_number::<usize>(section, "prefetch", "max_predictions")? {
            config.prefetch.max_predictions = v;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parses a non-negative integer. Empty values keep the default.
fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    match section.get(key).map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section_name, key, v, "must be a non-negative integer")),
    }
}

/// Parses a finite number greater than zero. Empty values keep the default.
fn parse_positive_f64(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<f64>, ConfigFileError> {
    match section.get(key).map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => match v.parse::<f64>() {
            Ok(n) if n.is_finite() && n > 0.0 => Ok(Some(n)),
            _ => Err(invalid(section_name, key, v, "must be a number greater than 0")),
        },
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
