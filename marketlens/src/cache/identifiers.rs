//! External identifier cross-reference.
//!
//! Answers "which organizations in this set have billing/claims identifiers"
//! with one batched lookup per distinct id set. Results are cached for a TTL
//! and concurrent lookups of the same set share a single request.
//!
//! A failed lookup is not fatal: every requested id maps to an empty list and
//! the failure is reported alongside, so the caller can still publish a market.
//! Failures are never cached.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::coalesce::{wait_for_leader, CoalesceResult, CoalescerStats, RequestCoalescer};
use super::ttl::{TtlCache, TtlCacheStats, DEFAULT_TTL};
use crate::retry::{retry_once, DEFAULT_RETRY_DELAY};
use crate::store::{IdentifierMap, IdentifierSource, StoreError};

/// Canonical form of an id set: sorted and deduplicated.
///
/// Two requests with the same members in any order map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdSetKey {
    ids: Vec<String>,
}

impl IdSetKey {
    pub fn new<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let set: BTreeSet<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();
        Self {
            ids: set.into_iter().collect(),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl fmt::Display for IdSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ids.join(","))
    }
}

/// Identifier lookup failure, reported as a soft error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Identifier lookup failed: {0}")]
    Failed(#[from] StoreError),
}

/// Outcome of a cross-reference lookup.
#[derive(Debug, Clone)]
pub struct CrossReference {
    /// Every requested id, each with its (possibly empty) identifier list
    pub identifiers: Arc<IdentifierMap>,
    /// Set when the lookup failed and `identifiers` is the empty fallback
    pub failure: Option<LookupError>,
}

impl CrossReference {
    fn resolved(identifiers: Arc<IdentifierMap>) -> Self {
        Self {
            identifiers,
            failure: None,
        }
    }

    fn empty_for(key: &IdSetKey, failure: Option<LookupError>) -> Self {
        let identifiers = key
            .ids()
            .iter()
            .map(|id| (id.clone(), Vec::new()))
            .collect();
        Self {
            identifiers: Arc::new(identifiers),
            failure,
        }
    }

    fn from_outcome(key: &IdSetKey, outcome: Result<Arc<IdentifierMap>, LookupError>) -> Self {
        match outcome {
            Ok(identifiers) => Self::resolved(identifiers),
            Err(e) => Self::empty_for(key, Some(e)),
        }
    }

    /// Identifiers for `id`, empty when it has none.
    pub fn identifiers_for(&self, id: &str) -> &[String] {
        self.identifiers.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

type LookupOutcome = Result<Arc<IdentifierMap>, LookupError>;

/// Cached, coalesced identifier lookups against one [`IdentifierSource`].
pub struct IdentifierCrossReference<S> {
    source: Arc<S>,
    cache: TtlCache<IdSetKey, Arc<IdentifierMap>>,
    coalescer: RequestCoalescer<IdSetKey, LookupOutcome>,
    retry_delay: Duration,
    requests: AtomicU64,
}

impl<S: IdentifierSource> IdentifierCrossReference<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self::with_ttl(source, DEFAULT_TTL)
    }

    pub fn with_ttl(source: Arc<S>, ttl: Duration) -> Self {
        Self {
            source,
            cache: TtlCache::new(ttl),
            coalescer: RequestCoalescer::new(),
            retry_delay: DEFAULT_RETRY_DELAY,
            requests: AtomicU64::new(0),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Looks up identifiers for `ids`.
    ///
    /// An empty set resolves immediately without touching the source.
    pub async fn lookup<I, T>(&self, ids: I) -> CrossReference
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let key = IdSetKey::new(ids);
        if key.is_empty() {
            return CrossReference::empty_for(&key, None);
        }

        loop {
            if let Some(hit) = self.cache.get(&key) {
                debug!(ids = key.len(), "Identifier cache hit");
                return CrossReference::resolved(hit);
            }

            match self.coalescer.register(key.clone()) {
                CoalesceResult::Coalesced(rx) => match wait_for_leader(rx).await {
                    Some(outcome) => return CrossReference::from_outcome(&key, outcome),
                    // Leader was cancelled; try again
                    None => continue,
                },
                CoalesceResult::NewRequest(guard) => {
                    // The previous leader may have filled the cache between our
                    // miss and registration
                    if let Some(hit) = self.cache.get(&key) {
                        guard.complete(Ok(Arc::clone(&hit)));
                        return CrossReference::resolved(hit);
                    }

                    let outcome = self.fetch(&key).await;
                    if let Ok(identifiers) = &outcome {
                        // Id sets rarely repeat, so stale keys are swept on every miss
                        let purged = self.cache.purge_expired();
                        if purged > 0 {
                            debug!(purged, "Evicted expired identifier lookups");
                        }
                        self.cache.insert(key.clone(), Arc::clone(identifiers));
                    }
                    guard.complete(outcome.clone());
                    return CrossReference::from_outcome(&key, outcome);
                }
            }
        }
    }

    async fn fetch(&self, key: &IdSetKey) -> LookupOutcome {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let result = retry_once("query_by_ids", self.retry_delay, || {
            self.source.query_by_ids(key.ids())
        })
        .await;

        match result {
            Ok(mut found) => {
                for id in key.ids() {
                    found.entry(id.clone()).or_default();
                }
                debug!(
                    ids = key.len(),
                    with_identifiers = found.values().filter(|v| !v.is_empty()).count(),
                    "Identifier lookup complete"
                );
                Ok(Arc::new(found))
            }
            Err(e) => {
                warn!(
                    ids = key.len(),
                    error = %e,
                    "Identifier lookup failed, continuing without identifiers"
                );
                Err(LookupError::Failed(e))
            }
        }
    }

    /// Number of batched lookups sent to the source (retries not counted).
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn cache_stats(&self) -> TtlCacheStats {
        self.cache.stats()
    }

    pub fn coalescer_stats(&self) -> CoalescerStats {
        self.coalescer.stats()
    }

    /// Number of id sets currently held, expired ones included until swept.
    pub fn cached_sets(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
