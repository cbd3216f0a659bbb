//! Rendering surface boundary.
//!
//! The synchronizer drives an interactive map through [`RenderSurface`]. The
//! adapter that owns the real map forwards its lifecycle signals as
//! [`SurfaceEvent`]s and routes clicks and hovers back in.

use serde::Serialize;
use thiserror::Error;

use super::geojson::FeatureCollection;
use crate::coord::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("Source already exists: {0}")]
    SourceExists(String),

    #[error("Layer already exists: {0}")]
    LayerExists(String),

    #[error("Not found on surface: {0}")]
    NotFound(String),

    #[error("Render surface error: {0}")]
    Backend(String),
}

/// Lifecycle signals from the map adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Container mounted with its layout size in pixels
    Attached { width: u32, height: u32 },
    /// Map instance finished loading
    Ready,
    /// Map style finished loading; may arrive before `Ready`
    StyleLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Fill,
    Line,
    Circle,
}

/// One render layer bound to a source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    pub kind: LayerKind,
    pub paint: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupTrigger {
    Click,
    Hover,
}

/// Entity detail bubble anchored at the entity's location.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub entity_id: String,
    pub title: String,
    pub lines: Vec<String>,
    pub coordinate: Coordinate,
    pub trigger: PopupTrigger,
}

/// Operations the synchronizer performs on the map.
///
/// Calls are synchronous and made from the synchronizer's own tasks.
pub trait RenderSurface: Send + Sync {
    /// Current container size in pixels; zero until laid out.
    fn layout_size(&self) -> (u32, u32);

    /// Fails with [`SurfaceError::SourceExists`] if `id` is taken.
    fn add_source(&self, id: &str, data: &FeatureCollection) -> Result<(), SurfaceError>;

    fn update_source_data(&self, id: &str, data: &FeatureCollection) -> Result<(), SurfaceError>;

    fn remove_source(&self, id: &str) -> Result<(), SurfaceError>;

    /// Fails with [`SurfaceError::LayerExists`] if the id is taken.
    fn add_layer(&self, layer: &LayerSpec) -> Result<(), SurfaceError>;

    fn remove_layer(&self, id: &str) -> Result<(), SurfaceError>;

    fn has_layer(&self, id: &str) -> bool;

    fn show_popup(&self, popup: &Popup) -> Result<(), SurfaceError>;

    fn close_popup(&self);
}
