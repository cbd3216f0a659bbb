//! GeoJSON payloads for the market layers.
//!
//! Coordinates are `[longitude, latitude]`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coord::circle_polygon;
use crate::model::{MarketEntity, MarketView};

/// Serialized with `"type": "FeatureCollection"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features
            .iter()
            .find(|f| f.id.as_deref() == Some(id))
    }
}

/// Serialized with `"type": "Feature"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point([f64; 2]),
    Polygon(Vec<Vec<[f64; 2]>>),
}

/// The market radius as a single closed polygon.
pub fn radius_collection(view: &MarketView, points: usize) -> FeatureCollection {
    let ring = circle_polygon(&view.center, view.radius_miles, points)
        .iter()
        .map(|c| c.to_lon_lat())
        .collect();

    let mut properties = Map::new();
    properties.insert("radius_miles".into(), Value::from(view.radius_miles));

    FeatureCollection {
        features: vec![Feature {
            id: Some("radius".into()),
            geometry: Geometry::Polygon(vec![ring]),
            properties,
        }],
    }
}

/// One point per entity, excluding the anchor organization.
pub fn entity_collection(view: &MarketView) -> FeatureCollection {
    let anchor = view.anchor_id.as_deref();
    FeatureCollection {
        features: view
            .entities()
            .iter()
            .filter(|entity| Some(entity.id()) != anchor)
            .map(entity_feature)
            .collect(),
    }
}

fn entity_feature(entity: &MarketEntity) -> Feature {
    let org = &entity.organization;
    let mut properties = Map::new();
    properties.insert("name".into(), Value::from(org.name.clone()));
    properties.insert("type".into(), Value::from(org.org_type.clone()));
    properties.insert("distance_miles".into(), Value::from(entity.distance_miles));
    properties.insert("tag".into(), Value::from(entity.tag.as_str()));
    properties.insert(
        "has_external_identifier".into(),
        Value::from(entity.has_external_identifier()),
    );

    Feature {
        id: Some(org.id.clone()),
        geometry: Geometry::Point(org.coordinate.to_lon_lat()),
        properties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;
    use crate::model::{Organization, Tag, TagScope};
    use std::sync::Arc;

    fn view(anchor: Option<&str>) -> MarketView {
        let center = Coordinate::new(38.6592, -90.358).unwrap();
        let entities = ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let org = Organization::new(*id, *id, center, "clinic");
                MarketEntity::new(Arc::new(org), i as f64)
            })
            .collect();
        MarketView::new(center, 10.0, TagScope::Session("s".into()), 1, entities)
            .with_anchor(anchor.map(String::from))
    }

    #[test]
    fn test_radius_polygon_is_closed() {
        let fc = radius_collection(&view(None), 64);
        assert_eq!(fc.len(), 1);

        let Geometry::Polygon(rings) = &fc.features[0].geometry else {
            panic!("Expected polygon");
        };
        assert_eq!(rings[0].len(), 65);
        assert_eq!(rings[0].first(), rings[0].last());
    }

    #[test]
    fn test_anchor_is_excluded_from_points() {
        let fc = entity_collection(&view(Some("b")));
        assert_eq!(fc.len(), 2);
        assert!(fc.feature("b").is_none());
    }

    #[test]
    fn test_point_properties() {
        let mut v = view(None);
        v = v.with_tag("a", Tag::Partner).unwrap();

        let fc = entity_collection(&v);
        let props = &fc.feature("a").unwrap().properties;

        assert_eq!(props["tag"], "partner");
        assert_eq!(props["has_external_identifier"], false);
        assert_eq!(props["distance_miles"], 0.0);
    }

    #[test]
    fn test_serializes_as_geojson() {
        let json = serde_json::to_value(entity_collection(&view(None))).unwrap();

        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");
        assert_eq!(json["features"][0]["geometry"]["coordinates"][0], -90.358);
    }
}
