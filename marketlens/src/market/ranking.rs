//! Exact distance filtering of prefilter candidates.

use std::sync::Arc;

use crate::coord::{distance_miles, Coordinate};
use crate::model::{MarketEntity, Organization};

/// Entities within `radius_miles` of `center` (inclusive), nearest first.
///
/// The sort is stable: equal distances keep candidate order.
pub fn rank_within_radius(
    center: &Coordinate,
    radius_miles: f64,
    candidates: &[Arc<Organization>],
) -> Vec<MarketEntity> {
    let mut ranked: Vec<MarketEntity> = candidates
        .iter()
        .filter_map(|org| {
            let distance = distance_miles(center, &org.coordinate);
            (distance <= radius_miles).then(|| MarketEntity::new(Arc::clone(org), distance))
        })
        .collect();

    ranked.sort_by(|a, b| a.distance_miles.total_cmp(&b.distance_miles));
    ranked
}
