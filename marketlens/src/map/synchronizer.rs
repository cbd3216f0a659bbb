//! Keeps the map's market layers in step with the published view.
//!
//! One synchronizer serves one map session. Layer creation runs in a
//! debounced task keyed by the session generation: a newer trigger cancels the
//! pending task, and a task that wakes up after a reset finds a different
//! generation and does nothing. Creation itself re-checks state and session
//! under the lock and tolerates layers that already exist, so it is
//! idempotent. A failed creation is retried once after another debounce
//! window; a second failure is recorded and left for the next view to retry.
//!
//! After creation, views with the same center only replace source data. A
//! view with a different center resets the session and the layers are built
//! again once the surface reports ready.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::MapConfig;
use super::geojson::{entity_collection, radius_collection, FeatureCollection};
use super::layers::{
    entity_layer, radius_layer, ENTITY_LAYER_ID, ENTITY_SOURCE_ID, RADIUS_LAYER_ID,
    RADIUS_SOURCE_ID,
};
use super::state::LayerState;
use super::surface::{LayerSpec, Popup, PopupTrigger, RenderSurface, SurfaceError, SurfaceEvent};
use crate::model::{MarketEntity, MarketView, Tag};

/// Synchronizer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub layers_created: u64,
    /// In-place source data replacements
    pub data_updates: u64,
    pub resets: u64,
    pub popups_shown: u64,
    /// Creations that failed after their retry
    pub creation_failures: u64,
}

#[derive(Default)]
struct SyncCounters {
    layers_created: AtomicU64,
    data_updates: AtomicU64,
    resets: AtomicU64,
    popups_shown: AtomicU64,
    creation_failures: AtomicU64,
}

#[derive(Default)]
struct SessionState {
    layer: LayerState,
    session: u64,
    view: Option<Arc<MarketView>>,
    /// Center the current layers were built for
    rendered_center: Option<(u64, u64)>,
    pending_creation: Option<CancellationToken>,
    container_probe: Option<CancellationToken>,
    open_popup: Option<String>,
    creation_error: Option<SurfaceError>,
}

struct Shared<R> {
    surface: Arc<R>,
    config: MapConfig,
    state: Mutex<SessionState>,
    counters: SyncCounters,
}

/// Drives a [`RenderSurface`] from market views and surface events.
///
/// Must be used from within a tokio runtime; debounce and probe tasks are
/// spawned onto it.
pub struct MapLayerSynchronizer<R> {
    shared: Arc<Shared<R>>,
}

impl<R> Clone for MapLayerSynchronizer<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R: RenderSurface + 'static> MapLayerSynchronizer<R> {
    pub fn new(surface: Arc<R>, config: MapConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                surface,
                config,
                state: Mutex::new(SessionState::default()),
                counters: SyncCounters::default(),
            }),
        }
    }

    pub fn state(&self) -> LayerState {
        self.shared.state.lock().layer
    }

    /// Current session generation; bumped by every reset.
    pub fn session(&self) -> u64 {
        self.shared.state.lock().session
    }

    pub fn current_view(&self) -> Option<Arc<MarketView>> {
        self.shared.state.lock().view.clone()
    }

    pub fn open_popup(&self) -> Option<String> {
        self.shared.state.lock().open_popup.clone()
    }

    /// Error from the last layer creation that failed after its retry.
    /// Cleared when creation is scheduled again or the session resets.
    pub fn creation_error(&self) -> Option<SurfaceError> {
        self.shared.state.lock().creation_error.clone()
    }

    pub fn stats(&self) -> SyncStats {
        let c = &self.shared.counters;
        SyncStats {
            layers_created: c.layers_created.load(Ordering::Relaxed),
            data_updates: c.data_updates.load(Ordering::Relaxed),
            resets: c.resets.load(Ordering::Relaxed),
            popups_shown: c.popups_shown.load(Ordering::Relaxed),
            creation_failures: c.creation_failures.load(Ordering::Relaxed),
        }
    }

    /// Feeds a lifecycle signal from the map adapter.
    pub fn handle_event(&self, event: SurfaceEvent) {
        let mut st = self.shared.state.lock();
        let before = st.layer;

        match event {
            SurfaceEvent::Attached { width, height } if width > 0 && height > 0 => {
                cancel(&mut st.container_probe);
                st.layer = st.layer.on_container_ready();
            }
            SurfaceEvent::Attached { .. } => {
                if st.layer == LayerState::Uninitialized {
                    self.start_container_probe(&mut st);
                }
            }
            SurfaceEvent::Ready => st.layer = st.layer.on_surface_ready(),
            SurfaceEvent::StyleLoaded => st.layer = st.layer.on_style_loaded(),
        }

        debug!(?event, from = %before, to = %st.layer, "Surface event");
        self.advance(&mut st);
    }

    /// Presents `view` on the map.
    pub fn set_view(&self, view: Arc<MarketView>) {
        let mut st = self.shared.state.lock();

        if st.layer == LayerState::LayersCreated {
            if st.rendered_center == Some(view.center.bits()) {
                self.update_in_place(&mut st, view);
            } else {
                info!(center = %view.center, "Market center changed, resetting map layers");
                self.reset_locked(&mut st);
                st.view = Some(view);
            }
            return;
        }

        st.view = Some(view);
        if st.layer == LayerState::DataReady {
            // Restart the debounce window with the newer view
            self.schedule_creation(&mut st);
        } else {
            self.advance(&mut st);
        }
    }

    /// Removes all layers, cancels pending work and starts a new session.
    pub fn reset(&self) {
        let mut st = self.shared.state.lock();
        self.reset_locked(&mut st);
        st.view = None;
    }

    /// Shows the popup for a clicked point. Unknown ids are ignored.
    pub fn handle_click(&self, feature_id: &str) -> Result<Option<Popup>, SurfaceError> {
        self.show_entity_popup(feature_id, PopupTrigger::Click)
    }

    pub fn handle_hover(&self, feature_id: &str) -> Result<Option<Popup>, SurfaceError> {
        self.show_entity_popup(feature_id, PopupTrigger::Hover)
    }

    pub fn close_popup(&self) {
        let mut st = self.shared.state.lock();
        if st.open_popup.take().is_some() {
            self.shared.surface.close_popup();
        }
    }

    fn show_entity_popup(
        &self,
        feature_id: &str,
        trigger: PopupTrigger,
    ) -> Result<Option<Popup>, SurfaceError> {
        let mut st = self.shared.state.lock();
        let Some(view) = st.view.clone() else {
            return Ok(None);
        };
        let Some(entity) = view.get(feature_id) else {
            debug!(feature_id, "Popup requested for entity not in view");
            return Ok(None);
        };

        let popup = build_popup(entity, trigger);
        if st.open_popup.take().is_some() {
            self.shared.surface.close_popup();
        }
        self.shared.surface.show_popup(&popup)?;
        st.open_popup = Some(popup.entity_id.clone());
        self.shared
            .counters
            .popups_shown
            .fetch_add(1, Ordering::Relaxed);

        Ok(Some(popup))
    }

    /// Moves StyleReady + view to DataReady and schedules creation.
    fn advance(&self, st: &mut SessionState) {
        if st.view.is_some() {
            st.layer = st.layer.on_data_available();
        }
        if st.layer == LayerState::DataReady && st.pending_creation.is_none() {
            self.schedule_creation(st);
        }
    }

    fn schedule_creation(&self, st: &mut SessionState) {
        st.creation_error = None;
        self.shared.spawn_creation(st, 0);
    }

    fn start_container_probe(&self, st: &mut SessionState) {
        cancel(&mut st.container_probe);

        let token = CancellationToken::new();
        st.container_probe = Some(token.clone());

        let session = st.session;
        let attempts = self.shared.config.container_probe_attempts;
        let base = self.shared.config.container_probe_base;
        let sync = self.clone();

        tokio::spawn(async move {
            for attempt in 0..attempts {
                let delay = base * 2u32.saturating_pow(attempt);
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = sleep(delay) => {}
                }

                let (width, height) = sync.shared.surface.layout_size();
                if width > 0 && height > 0 {
                    let mut st = sync.shared.state.lock();
                    if st.session == session {
                        debug!(attempt, width, height, "Container laid out");
                        st.container_probe = None;
                        st.layer = st.layer.on_container_ready();
                        sync.advance(&mut st);
                    }
                    return;
                }
            }
            warn!(attempts, "Map container never reported a size");
        });
    }

    fn update_in_place(&self, st: &mut SessionState, view: Arc<MarketView>) {
        let shared = &self.shared;
        let radius = radius_collection(&view, shared.config.polygon_points);
        let entities = entity_collection(&view);

        let result = shared
            .surface
            .update_source_data(RADIUS_SOURCE_ID, &radius)
            .and_then(|_| shared.surface.update_source_data(ENTITY_SOURCE_ID, &entities));

        match result {
            Ok(()) => {
                shared.counters.data_updates.fetch_add(1, Ordering::Relaxed);
                debug!(entities = entities.len(), "Updated map sources in place");
            }
            Err(e) => warn!(error = %e, "Failed to update map sources"),
        }

        // Popup for an entity that left the market is stale
        if let Some(open) = st.open_popup.as_deref() {
            if !view.contains(open) {
                st.open_popup = None;
                shared.surface.close_popup();
            }
        }

        st.view = Some(view);
    }

    fn reset_locked(&self, st: &mut SessionState) {
        cancel(&mut st.pending_creation);
        cancel(&mut st.container_probe);

        let surface = &self.shared.surface;
        for layer in [ENTITY_LAYER_ID, RADIUS_LAYER_ID] {
            if surface.has_layer(layer) {
                if let Err(e) = surface.remove_layer(layer) {
                    debug!(layer, error = %e, "Layer removal failed during reset");
                }
            }
        }
        for source in [ENTITY_SOURCE_ID, RADIUS_SOURCE_ID] {
            if let Err(e) = surface.remove_source(source) {
                debug!(source, error = %e, "Source removal skipped during reset");
            }
        }
        if st.open_popup.take().is_some() {
            surface.close_popup();
        }

        st.session += 1;
        st.layer = LayerState::Uninitialized;
        st.rendered_center = None;
        st.creation_error = None;
        self.shared.counters.resets.fetch_add(1, Ordering::Relaxed);
        debug!(session = st.session, "Map session reset");
    }
}

impl<R: RenderSurface + 'static> Shared<R> {
    /// Spawns creation for the current session after the debounce window,
    /// replacing any pending attempt.
    fn spawn_creation(self: &Arc<Self>, st: &mut SessionState, attempt: u32) {
        cancel(&mut st.pending_creation);

        let token = CancellationToken::new();
        st.pending_creation = Some(token.clone());

        let session = st.session;
        let debounce = self.config.debounce;
        let shared = Arc::clone(self);

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(session, attempt, "Pending layer creation cancelled");
                }
                _ = sleep(debounce) => {
                    shared.create_layers(session, attempt);
                }
            }
        });
    }

    /// Runs after the debounce window. No-op unless the session is unchanged
    /// and still waiting for layers.
    fn create_layers(self: &Arc<Self>, session: u64, attempt: u32) {
        let mut st = self.state.lock();
        if st.session != session || st.layer != LayerState::DataReady {
            debug!(
                session,
                current = st.session,
                state = %st.layer,
                "Skipping stale layer creation"
            );
            return;
        }
        st.pending_creation = None;

        let Some(view) = st.view.clone() else {
            return;
        };

        let radius = radius_collection(&view, self.config.polygon_points);
        let entities = entity_collection(&view);

        let result = self
            .ensure_source(RADIUS_SOURCE_ID, &radius)
            .and_then(|_| self.ensure_layer(&radius_layer()))
            .and_then(|_| self.ensure_source(ENTITY_SOURCE_ID, &entities))
            .and_then(|_| self.ensure_layer(&entity_layer()));

        match result {
            Ok(()) => {
                st.layer = st.layer.on_layers_created();
                st.rendered_center = Some(view.center.bits());
                self.counters.layers_created.fetch_add(1, Ordering::Relaxed);
                info!(
                    session,
                    points = entities.len(),
                    radius_miles = view.radius_miles,
                    "Map layers created"
                );
            }
            Err(e) if attempt == 0 => {
                warn!(session, error = %e, "Map layer creation failed, retrying once");
                self.spawn_creation(&mut st, attempt + 1);
            }
            Err(e) => {
                warn!(session, attempts = attempt + 1, error = %e, "Map layer creation failed");
                self.counters
                    .creation_failures
                    .fetch_add(1, Ordering::Relaxed);
                st.creation_error = Some(e);
            }
        }
    }

    fn ensure_source(&self, id: &str, data: &FeatureCollection) -> Result<(), SurfaceError> {
        match self.surface.add_source(id, data) {
            Err(SurfaceError::SourceExists(_)) => self.surface.update_source_data(id, data),
            other => other,
        }
    }

    fn ensure_layer(&self, layer: &LayerSpec) -> Result<(), SurfaceError> {
        if self.surface.has_layer(&layer.id) {
            return Ok(());
        }
        match self.surface.add_layer(layer) {
            Err(SurfaceError::LayerExists(_)) => Ok(()),
            other => other,
        }
    }
}

fn cancel(slot: &mut Option<CancellationToken>) {
    if let Some(token) = slot.take() {
        token.cancel();
    }
}

fn build_popup(entity: &MarketEntity, trigger: PopupTrigger) -> Popup {
    let org = &entity.organization;
    let mut lines = vec![
        org.org_type.clone(),
        format!("{:.1} mi", entity.distance_miles),
    ];

    if let Some(network) = &org.network {
        lines.push(network.clone());
    }
    let address = org.address.one_line();
    if !address.is_empty() {
        lines.push(address);
    }
    if entity.tag != Tag::None {
        lines.push(format!("Tag: {}", entity.tag));
    }
    lines.push(if entity.has_external_identifier() {
        format!("Billing IDs: {}", entity.external_identifiers.join(", "))
    } else {
        "No billing ID on file".to_string()
    });

    Popup {
        entity_id: org.id.clone(),
        title: org.name.clone(),
        lines,
        coordinate: org.coordinate,
        trigger,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;
    use crate::model::{Address, Organization};

    fn entity(tag: Tag, identifiers: Vec<String>) -> MarketEntity {
        let org = Organization::new(
            "org-1",
            "Mercy Hospital",
            Coordinate::new(38.64, -90.44).unwrap(),
            "hospital",
        )
        .with_network("Mercy")
        .with_address(Address {
            city: Some("St. Louis".into()),
            ..Address::default()
        });
        MarketEntity::new(Arc::new(org), 4.26)
            .with_tag(tag)
            .with_identifiers(identifiers)
    }

    #[test]
    fn test_popup_content() {
        let popup = build_popup(
            &entity(Tag::Partner, vec!["NPI-1".into()]),
            PopupTrigger::Click,
        );

        assert_eq!(popup.title, "Mercy Hospital");
        assert_eq!(popup.entity_id, "org-1");
        assert!(popup.lines.contains(&"4.3 mi".to_string()));
        assert!(popup.lines.contains(&"Mercy".to_string()));
        assert!(popup.lines.contains(&"Tag: partner".to_string()));
        assert!(popup.lines.contains(&"Billing IDs: NPI-1".to_string()));
    }

    #[test]
    fn test_popup_without_identifiers_or_tag() {
        let popup = build_popup(&entity(Tag::None, vec![]), PopupTrigger::Hover);

        assert_eq!(popup.trigger, PopupTrigger::Hover);
        assert!(!popup.lines.iter().any(|l| l.starts_with("Tag:")));
        assert_eq!(popup.lines.last().unwrap(), "No billing ID on file");
    }
}
