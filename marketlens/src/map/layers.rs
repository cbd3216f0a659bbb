//! Source/layer ids and paint for the two market layers.

use serde_json::json;

use super::surface::{LayerKind, LayerSpec};

pub const RADIUS_SOURCE_ID: &str = "market-radius-source";
pub const RADIUS_LAYER_ID: &str = "market-radius";
pub const ENTITY_SOURCE_ID: &str = "market-entities-source";
pub const ENTITY_LAYER_ID: &str = "market-entities";

pub const PARTNER_COLOR: &str = "#2e7d32";
pub const COMPETITOR_COLOR: &str = "#c62828";
pub const UNTAGGED_COLOR: &str = "#1565c0";
const RADIUS_COLOR: &str = "#1565c0";

pub fn radius_layer() -> LayerSpec {
    LayerSpec {
        id: RADIUS_LAYER_ID.to_string(),
        source: RADIUS_SOURCE_ID.to_string(),
        kind: LayerKind::Fill,
        paint: json!({
            "fill-color": RADIUS_COLOR,
            "fill-opacity": 0.12,
            "fill-outline-color": RADIUS_COLOR,
        }),
    }
}

/// Points colored by the `tag` property.
pub fn entity_layer() -> LayerSpec {
    LayerSpec {
        id: ENTITY_LAYER_ID.to_string(),
        source: ENTITY_SOURCE_ID.to_string(),
        kind: LayerKind::Circle,
        paint: json!({
            "circle-radius": 6,
            "circle-stroke-width": 1,
            "circle-stroke-color": "#ffffff",
            "circle-color": [
                "match", ["get", "tag"],
                "partner", PARTNER_COLOR,
                "competitor", COMPETITOR_COLOR,
                UNTAGGED_COLOR
            ],
        }),
    }
}
