//! Bounding-box prefilter.
//!
//! Fetches an over-inclusive candidate set with one rectangular range query
//! around the market center. Exact great-circle filtering happens afterwards
//! in the resolution service.
//!
//! The candidate set of the most recent center is kept, so moving the radius
//! slider re-ranks the same candidates instead of re-reading the store.
//!
//! ```text
//! resolve(center, 5mi)  ──► query_box(center ± 2°) ──► store   (1 read)
//! resolve(center, 20mi) ──► cached candidates                 (0 reads)
//! resolve(other, 20mi)  ──► query_box(other ± 2°)  ──► store   (1 read)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::coord::{BoundingBox, Coordinate};
use crate::model::Organization;
use crate::retry::{retry_once, DEFAULT_RETRY_DELAY};
use crate::store::{OrganizationStore, StoreError};

/// Default half-width of the query box in degrees.
pub const DEFAULT_MARGIN_DEGREES: f64 = 2.0;

/// Candidate organizations shared between resolutions of the same center.
pub type Candidates = Arc<Vec<Arc<Organization>>>;

/// Errors from the prefilter stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrefilterError {
    /// Store read failed, including the automatic retry
    #[error("Prefilter failed around {center}: {source}")]
    Failed {
        center: Coordinate,
        #[source]
        source: StoreError,
    },
}

struct CachedBox {
    center: (u64, u64),
    candidates: Candidates,
}

/// Issues the coarse spatial query and memoizes it per center.
pub struct BoundingBoxPrefilter<S> {
    store: Arc<S>,
    margin_degrees: f64,
    retry_delay: Duration,
    /// Held across the store read so concurrent calls for one center share it
    last: Mutex<Option<CachedBox>>,
    queries: AtomicU64,
}

impl<S: OrganizationStore> BoundingBoxPrefilter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            margin_degrees: DEFAULT_MARGIN_DEGREES,
            retry_delay: DEFAULT_RETRY_DELAY,
            last: Mutex::new(None),
            queries: AtomicU64::new(0),
        }
    }

    pub fn with_margin(mut self, margin_degrees: f64) -> Self {
        self.margin_degrees = margin_degrees;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn margin_degrees(&self) -> f64 {
        self.margin_degrees
    }

    /// Returns every organization inside the box around `center`.
    ///
    /// Reuses the previous result when `center` is unchanged. Organizations
    /// with out-of-range coordinates are dropped with a warning.
    pub async fn prefilter(&self, center: &Coordinate) -> Result<Candidates, PrefilterError> {
        let mut last = self.last.lock().await;

        if let Some(cached) = last.as_ref() {
            if cached.center == center.bits() {
                debug!(
                    center = %center,
                    candidates = cached.candidates.len(),
                    "Prefilter cache hit"
                );
                return Ok(Arc::clone(&cached.candidates));
            }
        }

        let bbox = BoundingBox::around(center, self.margin_degrees);
        self.queries.fetch_add(1, Ordering::Relaxed);

        let organizations = retry_once("query_box", self.retry_delay, || {
            self.store.query_box(bbox)
        })
        .await
        .map_err(|source| PrefilterError::Failed {
            center: *center,
            source,
        })?;

        let candidates: Vec<Arc<Organization>> = organizations
            .into_iter()
            .filter(|org| match org.coordinate.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(organization = %org.id, error = %e, "Skipping organization with invalid coordinate");
                    false
                }
            })
            .map(Arc::new)
            .collect();

        debug!(
            center = %center,
            margin = self.margin_degrees,
            candidates = candidates.len(),
            "Prefilter query complete"
        );

        let candidates = Arc::new(candidates);
        *last = Some(CachedBox {
            center: center.bits(),
            candidates: Arc::clone(&candidates),
        });

        Ok(candidates)
    }

    /// Drops the memoized candidate set; the next call reads the store.
    pub async fn invalidate(&self) {
        *self.last.lock().await = None;
    }

    /// Number of store queries issued (retries not counted).
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::sync::atomic::AtomicUsize;

    fn center() -> Coordinate {
        Coordinate::new(38.6592, -90.358).unwrap()
    }

    fn store_with(orgs: &[(&str, f64, f64)]) -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        for (id, lat, lon) in orgs {
            store.insert_organization(Organization::new(
                *id,
                *id,
                Coordinate::new(*lat, *lon).unwrap(),
                "clinic",
            ));
        }
        Arc::new(store)
    }

    /// Store that fails a configurable number of times before delegating.
    struct FlakyStore {
        inner: Arc<InMemoryStore>,
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    impl OrganizationStore for FlakyStore {
        async fn query_box(&self, bbox: BoundingBox) -> Result<Vec<Organization>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures_left.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_left.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            self.inner.query_box(bbox).await
        }
    }

    fn flaky(failures: usize) -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            inner: store_with(&[("a", 38.7, -90.3)]),
            failures_left: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_returns_candidates_inside_box() {
        let store = store_with(&[("near", 38.7, -90.3), ("far", 42.0, -90.3)]);
        let prefilter = BoundingBoxPrefilter::new(store);

        let candidates = prefilter.prefilter(&center()).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "near");
    }

    #[tokio::test]
    async fn test_same_center_reuses_candidates() {
        let prefilter = BoundingBoxPrefilter::new(store_with(&[("a", 38.7, -90.3)]));

        let first = prefilter.prefilter(&center()).await.unwrap();
        let second = prefilter.prefilter(&center()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(prefilter.query_count(), 1);
    }

    #[tokio::test]
    async fn test_new_center_queries_again() {
        let prefilter = BoundingBoxPrefilter::new(store_with(&[("a", 38.7, -90.3)]));

        prefilter.prefilter(&center()).await.unwrap();
        prefilter
            .prefilter(&Coordinate::new(39.0, -90.0).unwrap())
            .await
            .unwrap();

        assert_eq!(prefilter.query_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_query() {
        let prefilter = BoundingBoxPrefilter::new(store_with(&[("a", 38.7, -90.3)]));

        prefilter.prefilter(&center()).await.unwrap();
        prefilter.invalidate().await;
        prefilter.prefilter(&center()).await.unwrap();

        assert_eq!(prefilter.query_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_failure_is_retried() {
        let store = flaky(1);
        let prefilter = BoundingBoxPrefilter::new(Arc::clone(&store));

        let candidates = prefilter.prefilter(&center()).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_surfaces_prefilter_failed() {
        let store = flaky(5);
        let prefilter = BoundingBoxPrefilter::new(Arc::clone(&store));

        let err = prefilter.prefilter(&center()).await.unwrap_err();

        assert!(matches!(err, PrefilterError::Failed { .. }));
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);

        // Failure is not cached
        store.failures_left.store(0, Ordering::SeqCst);
        assert!(prefilter.prefilter(&center()).await.is_ok());
    }
}
