//! Map layer synchronization.
//!
//! Renders a [`MarketView`](crate::model::MarketView) as two layers on an
//! interactive map: the radius polygon and one point per organization.
//!
//! - [`LayerState`]: per-session lifecycle
//! - [`RenderSurface`]: what the map adapter must implement
//! - [`MapLayerSynchronizer`]: debounced, idempotent layer management

mod config;
mod geojson;
mod layers;
mod state;
mod surface;
mod synchronizer;

pub use config::{MapConfig, DEFAULT_DEBOUNCE, DEFAULT_PROBE_ATTEMPTS, DEFAULT_PROBE_BASE_DELAY};
pub use geojson::{entity_collection, radius_collection, Feature, FeatureCollection, Geometry};
pub use layers::{
    entity_layer, radius_layer, COMPETITOR_COLOR, ENTITY_LAYER_ID, ENTITY_SOURCE_ID,
    PARTNER_COLOR, RADIUS_LAYER_ID, RADIUS_SOURCE_ID, UNTAGGED_COLOR,
};
pub use state::LayerState;
pub use surface::{
    LayerKind, LayerSpec, Popup, PopupTrigger, RenderSurface, SurfaceError, SurfaceEvent,
};
pub use synchronizer::{MapLayerSynchronizer, SyncStats};
