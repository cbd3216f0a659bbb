//! Organizations enriched for one resolution cycle.

use serde::Serialize;
use std::sync::Arc;

use super::organization::Organization;
use super::tag::Tag;

/// An organization placed in a market: distance from the center, external
/// identifiers, and the scope's tag.
///
/// Values are never mutated in place. A tag change produces a new entity via
/// [`MarketEntity::with_tag`] that replaces the old one in a new view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketEntity {
    pub organization: Arc<Organization>,
    pub distance_miles: f64,
    pub external_identifiers: Vec<String>,
    pub tag: Tag,
}

impl MarketEntity {
    pub fn new(organization: Arc<Organization>, distance_miles: f64) -> Self {
        Self {
            organization,
            distance_miles: distance_miles.max(0.0),
            external_identifiers: Vec::new(),
            tag: Tag::None,
        }
    }

    pub fn id(&self) -> &str {
        &self.organization.id
    }

    pub fn name(&self) -> &str {
        &self.organization.name
    }

    pub fn has_external_identifier(&self) -> bool {
        !self.external_identifiers.is_empty()
    }

    /// Returns a copy carrying `tag`.
    pub fn with_tag(&self, tag: Tag) -> Self {
        Self {
            tag,
            ..self.clone()
        }
    }

    /// Returns a copy carrying `identifiers`.
    pub fn with_identifiers(&self, identifiers: Vec<String>) -> Self {
        Self {
            external_identifiers: identifiers,
            ..self.clone()
        }
    }
}
