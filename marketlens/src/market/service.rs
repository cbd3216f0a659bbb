//! Market resolution service.
//!
//! Orchestrates one resolution cycle and owns the published view:
//!
//! ```text
//! resolve(request)
//!   ├─ validate radius                        (no I/O on failure)
//!   ├─ prefilter(center)                      (memoized per center)
//!   ├─ rank_within_radius                     (exact haversine)
//!   ├─ identifiers.lookup(ids) ┐ concurrent   (cached + coalesced)
//!   ├─ tags.list_tags(scope)   ┘
//!   └─ publish if still the newest request    (watch channel)
//! ```
//!
//! Each call takes a new generation and cancels the previous call's token.
//! A result is only published when its generation is still the latest and
//! not older than the view already published; the check runs inside
//! `send_if_modified`, so it is atomic with the write.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::MarketConfig;
use super::error::MarketError;
use super::ranking::rank_within_radius;
use super::request::{MarketRequest, ResolveOutcome};
use crate::cache::IdentifierCrossReference;
use crate::model::{MarketView, ResolutionIssue, Tag, TagScope};
use crate::prefilter::BoundingBoxPrefilter;
use crate::store::{IdentifierSource, OrganizationStore, TagRepository};
use crate::tags::{TagChange, TagOverlayStore};

/// Latest published market view, if any.
pub type ViewReceiver = watch::Receiver<Option<Arc<MarketView>>>;

pub struct MarketResolutionService<O, I, T> {
    config: MarketConfig,
    prefilter: BoundingBoxPrefilter<O>,
    identifiers: Arc<IdentifierCrossReference<I>>,
    tags: Arc<TagOverlayStore<T>>,
    latest_generation: AtomicU64,
    in_flight: Mutex<Option<(u64, CancellationToken)>>,
    views: watch::Sender<Option<Arc<MarketView>>>,
}

impl<S> MarketResolutionService<S, S, S>
where
    S: OrganizationStore + IdentifierSource + TagRepository,
{
    /// Builds every component over one backend implementing all store traits.
    pub fn from_store(store: Arc<S>, config: MarketConfig) -> Self {
        let identifiers = IdentifierCrossReference::with_ttl(Arc::clone(&store), config.identifier_ttl)
            .with_retry_delay(config.retry_delay);
        let tags = TagOverlayStore::new(Arc::clone(&store)).with_retry_delay(config.retry_delay);
        Self::new(store, Arc::new(identifiers), Arc::new(tags), config)
    }
}

impl<O, I, T> MarketResolutionService<O, I, T>
where
    O: OrganizationStore,
    I: IdentifierSource,
    T: TagRepository,
{
    pub fn new(
        organizations: Arc<O>,
        identifiers: Arc<IdentifierCrossReference<I>>,
        tags: Arc<TagOverlayStore<T>>,
        config: MarketConfig,
    ) -> Self {
        let prefilter = BoundingBoxPrefilter::new(organizations)
            .with_margin(config.prefilter_margin_degrees)
            .with_retry_delay(config.retry_delay);
        let (views, _) = watch::channel(None);

        Self {
            config,
            prefilter,
            identifiers,
            tags,
            latest_generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            views,
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn identifiers(&self) -> &Arc<IdentifierCrossReference<I>> {
        &self.identifiers
    }

    pub fn tags(&self) -> &Arc<TagOverlayStore<T>> {
        &self.tags
    }

    pub fn prefilter(&self) -> &BoundingBoxPrefilter<O> {
        &self.prefilter
    }

    /// Receives every published view and tag patch.
    pub fn subscribe(&self) -> ViewReceiver {
        self.views.subscribe()
    }

    /// Snapshot of the current view.
    pub fn current(&self) -> Option<Arc<MarketView>> {
        self.views.borrow().clone()
    }

    /// Generation of the most recent resolve call.
    pub fn latest_generation(&self) -> u64 {
        self.latest_generation.load(Ordering::SeqCst)
    }

    /// Resolves `request` and publishes the view unless a newer request
    /// started meanwhile.
    pub async fn resolve(&self, request: MarketRequest) -> Result<ResolveOutcome, MarketError> {
        request.validate(self.config.max_radius_miles)?;

        let generation = self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        if let Some((_, previous)) = self.in_flight.lock().replace((generation, token.clone())) {
            previous.cancel();
        }

        debug!(
            generation,
            center = %request.center,
            radius = request.radius_miles,
            "Resolving market"
        );

        let result = tokio::select! {
            biased;

            _ = token.cancelled() => {
                debug!(generation, "Resolution cancelled by a newer request");
                return Ok(ResolveOutcome::Superseded);
            }

            result = self.build_view(&request, generation) => result,
        };

        self.release_token(generation);

        if self.latest_generation() != generation {
            debug!(generation, "Dropping stale resolution result");
            return Ok(ResolveOutcome::Superseded);
        }

        let view = Arc::new(result?);
        Ok(self.publish(view))
    }

    /// Cancels the running resolution, if any. Its caller sees `Superseded`.
    pub fn cancel_in_flight(&self) {
        if let Some((_, token)) = self.in_flight.lock().take() {
            token.cancel();
            // Anything still running is now stale
            self.latest_generation.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Tags an entity of the current market.
    ///
    /// The current view is patched before the write; a rejected write restores
    /// the previous tag and returns the error.
    pub async fn apply_tag(&self, entity_id: &str, tag: Tag) -> Result<(), MarketError> {
        let view = self.current().ok_or(MarketError::NoMarket)?;
        let previous = view
            .get(entity_id)
            .map(|entity| entity.tag.clone())
            .ok_or_else(|| MarketError::UnknownEntity(entity_id.to_string()))?;
        let scope = view.scope.clone();
        drop(view);

        self.patch_tag(&scope, entity_id, tag.clone());

        if let Err(e) = self.tags.set_tag(&scope, entity_id, tag).await {
            self.patch_tag(&scope, entity_id, previous);
            return Err(e.into());
        }
        Ok(())
    }

    /// Applies tag changes from the overlay store to the current view until
    /// `cancel` fires or the store goes away.
    pub async fn follow_tag_changes(&self, cancel: CancellationToken) {
        let mut changes = self.tags.subscribe();

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("Tag follower stopped");
                    break;
                }

                change = changes.recv() => match change {
                    Ok(TagChange { scope, entity_id, tag }) => {
                        self.patch_tag(&scope, &entity_id, tag);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Tag follower lagged, resynchronizing");
                        self.resync_tags().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    async fn build_view(
        &self,
        request: &MarketRequest,
        generation: u64,
    ) -> Result<MarketView, MarketError> {
        let candidates = self.prefilter.prefilter(&request.center).await?;
        let ranked = rank_within_radius(&request.center, request.radius_miles, &candidates);

        let ids: Vec<String> = ranked.iter().map(|e| e.id().to_string()).collect();
        let (xref, tags) = tokio::join!(
            self.identifiers.lookup(&ids),
            self.tags.list_tags(&request.scope)
        );

        let mut issues = Vec::new();
        if let Some(failure) = &xref.failure {
            issues.push(ResolutionIssue::IdentifierLookupFailed(failure.to_string()));
        }
        let tags = match tags {
            Ok(tags) => tags,
            Err(e) => {
                warn!(scope = %request.scope, error = %e, "Tag fetch failed, showing untagged");
                issues.push(ResolutionIssue::TagFetchFailed(e.to_string()));
                Default::default()
            }
        };

        let entities = ranked
            .into_iter()
            .map(|entity| {
                let identifiers = xref.identifiers_for(entity.id()).to_vec();
                let tag = tags.get(entity.id()).cloned().unwrap_or_default();
                let mut entity = entity.with_tag(tag);
                entity.external_identifiers = identifiers;
                entity
            })
            .collect();

        Ok(MarketView::new(
            request.center,
            request.radius_miles,
            request.scope.clone(),
            generation,
            entities,
        )
        .with_anchor(request.anchor_id.clone())
        .with_issues(issues))
    }

    fn publish(&self, view: Arc<MarketView>) -> ResolveOutcome {
        let generation = view.generation;
        let latest = &self.latest_generation;

        let published = self.views.send_if_modified(|current| {
            if latest.load(Ordering::SeqCst) != generation {
                return false;
            }
            if current.as_ref().map_or(false, |c| c.generation > generation) {
                return false;
            }
            *current = Some(Arc::clone(&view));
            true
        });

        if published {
            info!(
                generation,
                entities = view.len(),
                radius = view.radius_miles,
                issues = view.issues.len(),
                "Market view published"
            );
            ResolveOutcome::Published(view)
        } else {
            debug!(generation, "Superseded before publish");
            ResolveOutcome::Superseded
        }
    }

    /// Publishes a successor with one entity re-tagged. No-op when the
    /// current view is for another scope, lacks the entity, or already has
    /// that tag.
    fn patch_tag(&self, scope: &TagScope, entity_id: &str, tag: Tag) -> bool {
        self.views.send_if_modified(|current| {
            let Some(view) = current.as_ref() else {
                return false;
            };
            if &view.scope != scope {
                return false;
            }
            match view.get(entity_id) {
                Some(entity) if entity.tag != tag => {}
                _ => return false,
            }
            match view.with_tag(entity_id, tag) {
                Some(next) => {
                    *current = Some(Arc::new(next));
                    true
                }
                None => false,
            }
        })
    }

    async fn resync_tags(&self) {
        let Some(view) = self.current() else {
            return;
        };
        match self.tags.list_tags(&view.scope).await {
            Ok(tags) => {
                for entity in view.entities() {
                    let tag = tags.get(entity.id()).cloned().unwrap_or_default();
                    self.patch_tag(&view.scope, entity.id(), tag);
                }
            }
            Err(e) => warn!(error = %e, "Tag resynchronization failed"),
        }
    }

    fn release_token(&self, generation: u64) {
        let mut slot = self.in_flight.lock();
        // A newer call may already have replaced the slot
        if slot.as_ref().map_or(false, |(g, _)| *g == generation) {
            *slot = None;
        }
    }
}
