use std::sync::Arc;

use super::error::MarketError;
use crate::coord::Coordinate;
use crate::model::{MarketView, TagScope};

/// Parameters of one market resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketRequest {
    pub center: Coordinate,
    pub radius_miles: f64,
    pub scope: TagScope,
    /// Organization the market is centered on; omitted from map points
    pub anchor_id: Option<String>,
}

impl MarketRequest {
    pub fn new(center: Coordinate, radius_miles: f64, scope: TagScope) -> Self {
        Self {
            center,
            radius_miles,
            scope,
            anchor_id: None,
        }
    }

    pub fn with_anchor(mut self, anchor_id: impl Into<String>) -> Self {
        self.anchor_id = Some(anchor_id.into());
        self
    }

    /// Same request with a different radius.
    pub fn with_radius(&self, radius_miles: f64) -> Self {
        Self {
            radius_miles,
            ..self.clone()
        }
    }

    pub fn validate(&self, max_radius_miles: f64) -> Result<(), MarketError> {
        if !self.radius_miles.is_finite() || self.radius_miles <= 0.0 {
            return Err(MarketError::Validation {
                field: "radius",
                reason: format!("{} must be a positive number of miles", self.radius_miles),
            });
        }
        if self.radius_miles > max_radius_miles {
            return Err(MarketError::Validation {
                field: "radius",
                reason: format!(
                    "{} exceeds the maximum of {} miles",
                    self.radius_miles, max_radius_miles
                ),
            });
        }
        self.center.validate().map_err(|e| MarketError::Validation {
            field: "center",
            reason: e.to_string(),
        })
    }
}

/// Result of a resolution that did not fail.
#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    /// The view is now the service's current view
    Published(Arc<MarketView>),
    /// A newer request started before this one finished; nothing was published
    Superseded,
}

impl ResolveOutcome {
    pub fn view(&self) -> Option<&Arc<MarketView>> {
        match self {
            Self::Published(view) => Some(view),
            Self::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}
