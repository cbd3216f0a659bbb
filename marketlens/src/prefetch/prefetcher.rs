//! Predictive prefetcher.
//!
//! Learns which entities a user keeps opening and fetches their data in the
//! background so the next visit is served from memory. All speculative work
//! is best-effort: it runs in spawned tasks, never blocks the caller, and its
//! failures are only logged.
//!
//! Before scheduling anything the prefetcher consults the last latency
//! measurement. When the network is slow or unreachable the whole round is
//! skipped so foreground requests do not compete with guesses.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::condition::NetworkCondition;
use super::config::PrefetchConfig;
use super::error::PrefetchError;
use super::usage::{Prediction, UsageTracker};
use crate::cache::TtlCache;

/// Fetches the data a visit to an entity would load.
pub trait PrefetchSource: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn fetch(
        &self,
        entity_id: &str,
        radius_miles: f64,
    ) -> impl Future<Output = Result<Self::Output, PrefetchError>> + Send;
}

/// Cheap round trip used to estimate network latency.
pub trait LatencyProbe: Send + Sync + 'static {
    fn ping(&self) -> impl Future<Output = Result<(), PrefetchError>> + Send;
}

/// Prefetch statistics for monitoring.
#[derive(Debug, Default)]
struct PrefetchCounters {
    scheduled: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped_slow_network: AtomicU64,
    skipped_in_flight: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Snapshot of prefetch statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchStats {
    pub scheduled: u64,
    pub completed: u64,
    pub failed: u64,
    /// Rounds skipped because latency exceeded the threshold
    pub skipped_slow_network: u64,
    pub skipped_in_flight: u64,
    pub hits: u64,
    pub misses: u64,
}

struct Inner<P: PrefetchSource, L> {
    source: Arc<P>,
    probe: Arc<L>,
    config: PrefetchConfig,
    results: TtlCache<String, Arc<P::Output>>,
    usage: Mutex<UsageTracker>,
    condition: Mutex<NetworkCondition>,
    in_flight: Mutex<HashSet<String>>,
    shutdown: CancellationToken,
    counters: PrefetchCounters,
}

/// Background prefetcher over a [`PrefetchSource`].
///
/// Cloning shares the same cache and tracker.
pub struct PredictivePrefetcher<P: PrefetchSource, L> {
    inner: Arc<Inner<P, L>>,
}

impl<P: PrefetchSource, L> Clone for PredictivePrefetcher<P, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: PrefetchSource, L: LatencyProbe> PredictivePrefetcher<P, L> {
    pub fn new(source: Arc<P>, probe: Arc<L>, config: PrefetchConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                probe,
                results: TtlCache::new(config.ttl),
                usage: Mutex::new(UsageTracker::new(config.max_tracked)),
                condition: Mutex::new(NetworkCondition::Unknown),
                in_flight: Mutex::new(HashSet::new()),
                shutdown: CancellationToken::new(),
                counters: PrefetchCounters::default(),
                config,
            }),
        }
    }

    /// Records a visit and schedules prefetches for the likely next ones.
    ///
    /// Returns the number of fetches started.
    pub fn track_usage(&self, entity_id: &str, radius_miles: f64, session: Duration) -> usize {
        let predictions = {
            let mut usage = self.inner.usage.lock();
            usage.record(entity_id, radius_miles, session);
            usage.predict(self.inner.config.max_predictions, Some(entity_id))
        };
        self.schedule(predictions)
    }

    /// Speculative result for `entity_id`, if one is cached and fresh.
    pub fn get_prefetched(&self, entity_id: &str) -> Option<Arc<P::Output>> {
        let hit = self.inner.results.get(&entity_id.to_string());
        let counter = if hit.is_some() {
            &self.inner.counters.hits
        } else {
            &self.inner.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        hit
    }

    /// Pings the probe once and stores the result.
    ///
    /// A probe slower than twice the threshold is abandoned and counted as
    /// unreachable.
    pub async fn measure_latency(&self) -> NetworkCondition {
        let deadline = self.inner.config.latency_threshold * 2;
        let start = Instant::now();

        let condition = match tokio::time::timeout(deadline, self.inner.probe.ping()).await {
            Ok(Ok(())) => NetworkCondition::Measured(start.elapsed()),
            Ok(Err(e)) => {
                debug!(error = %e, "Latency probe failed");
                NetworkCondition::Unreachable
            }
            Err(_) => {
                let e = PrefetchError::ProbeTimeout(deadline.as_millis() as u64);
                debug!(error = %e, "Latency probe failed");
                NetworkCondition::Unreachable
            }
        };

        *self.inner.condition.lock() = condition;
        debug!(?condition, "Network condition updated");
        condition
    }

    pub fn network_condition(&self) -> NetworkCondition {
        *self.inner.condition.lock()
    }

    /// Measures latency, then fetches `entity_ids` ahead of use.
    ///
    /// Used at startup to warm the cache with commonly opened entities.
    /// Returns the number of fetches started.
    pub async fn prewarm(&self, entity_ids: &[String], radius_miles: f64) -> usize {
        self.measure_latency().await;

        let predictions = entity_ids
            .iter()
            .map(|id| Prediction {
                entity_id: id.clone(),
                radius_miles,
            })
            .collect();
        let started = self.schedule(predictions);
        info!(requested = entity_ids.len(), started, "Prefetch prewarm scheduled");
        started
    }

    /// Re-measures latency every `interval` until shutdown.
    pub fn spawn_latency_monitor(&self, interval: Duration) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = this.inner.shutdown.cancelled() => {
                        debug!("Latency monitor stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        this.measure_latency().await;
                    }
                }
            }
        })
    }

    /// Cancels every background task. Cached results stay readable.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        info!("Prefetcher shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    pub fn stats(&self) -> PrefetchStats {
        let c = &self.inner.counters;
        PrefetchStats {
            scheduled: c.scheduled.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            skipped_slow_network: c.skipped_slow_network.load(Ordering::Relaxed),
            skipped_in_flight: c.skipped_in_flight.load(Ordering::Relaxed),
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
        }
    }

    fn schedule(&self, predictions: Vec<Prediction>) -> usize {
        if self.is_shut_down() || predictions.is_empty() {
            return 0;
        }

        let condition = self.network_condition();
        if !condition.allows_prefetch(self.inner.config.latency_threshold) {
            self.inner
                .counters
                .skipped_slow_network
                .fetch_add(1, Ordering::Relaxed);
            debug!(?condition, "Network too slow, skipping speculative prefetch");
            return 0;
        }

        let mut started = 0;
        for prediction in predictions {
            if self.inner.results.contains_fresh(&prediction.entity_id) {
                continue;
            }
            if !self.inner.in_flight.lock().insert(prediction.entity_id.clone()) {
                self.inner
                    .counters
                    .skipped_in_flight
                    .fetch_add(1, Ordering::Relaxed);
                continue;
            }
            self.spawn_fetch(prediction);
            started += 1;
        }
        started
    }

    fn spawn_fetch(&self, prediction: Prediction) {
        self.inner.counters.scheduled.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let Prediction {
                entity_id,
                radius_miles,
            } = prediction;

            let outcome = tokio::select! {
                biased;
                _ = inner.shutdown.cancelled() => None,
                result = inner.source.fetch(&entity_id, radius_miles) => Some(result),
            };

            match outcome {
                Some(Ok(output)) => {
                    inner.results.insert(entity_id.clone(), Arc::new(output));
                    inner.counters.completed.fetch_add(1, Ordering::Relaxed);
                    debug!(entity = %entity_id, "Prefetched");
                }
                Some(Err(e)) => {
                    inner.counters.failed.fetch_add(1, Ordering::Relaxed);
                    debug!(entity = %entity_id, error = %e, "Speculative prefetch failed");
                }
                None => debug!(entity = %entity_id, "Prefetch cancelled by shutdown"),
            }

            inner.in_flight.lock().remove(&entity_id);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use tokio::time::sleep;

    struct MockSource {
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
    }

    impl MockSource {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                delay,
            })
        }
    }

    impl PrefetchSource for MockSource {
        type Output = String;

        async fn fetch(&self, entity_id: &str, radius_miles: f64) -> Result<String, PrefetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sleep(self.delay).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(PrefetchError::Source(crate::store::StoreError::Timeout(100)));
            }
            Ok(format!("{}@{}", entity_id, radius_miles))
        }
    }

    struct MockProbe {
        latency: Duration,
        fail: bool,
    }

    impl LatencyProbe for MockProbe {
        async fn ping(&self) -> Result<(), PrefetchError> {
            sleep(self.latency).await;
            if self.fail {
                Err(PrefetchError::Probe("no route".into()))
            } else {
                Ok(())
            }
        }
    }

    fn probe(latency_ms: u64) -> Arc<MockProbe> {
        Arc::new(MockProbe {
            latency: Duration::from_millis(latency_ms),
            fail: false,
        })
    }

    async fn settle() {
        sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicted_entity_is_prefetched() {
        let source = MockSource::new(Duration::from_millis(10));
        let prefetcher = PredictivePrefetcher::new(Arc::clone(&source), probe(20), PrefetchConfig::default());

        prefetcher.track_usage("a", 10.0, Duration::from_secs(30));
        let started = prefetcher.track_usage("b", 15.0, Duration::from_secs(5));
        assert_eq!(started, 1);
        settle().await;

        assert_eq!(prefetcher.get_prefetched("a").as_deref(), Some(&"a@10".to_string()));
        assert!(prefetcher.get_prefetched("b").is_none());
        assert_eq!(prefetcher.stats().completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_expire_after_ttl() {
        let source = MockSource::new(Duration::ZERO);
        let prefetcher = PredictivePrefetcher::new(Arc::clone(&source), probe(20), PrefetchConfig::default());

        prefetcher.prewarm(&["a".to_string()], 10.0).await;
        settle().await;
        assert!(prefetcher.get_prefetched("a").is_some());

        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(prefetcher.get_prefetched("a").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_network_skips_prefetch() {
        let source = MockSource::new(Duration::ZERO);
        let prefetcher = PredictivePrefetcher::new(Arc::clone(&source), probe(900), PrefetchConfig::default());

        let condition = prefetcher.measure_latency().await;
        assert!(condition.latency().unwrap() >= Duration::from_millis(900));

        prefetcher.track_usage("a", 10.0, Duration::from_secs(1));
        assert_eq!(prefetcher.track_usage("b", 10.0, Duration::from_secs(1)), 0);
        settle().await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(prefetcher.stats().skipped_slow_network, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_probe_blocks_prefetch() {
        let source = MockSource::new(Duration::ZERO);
        let failing = Arc::new(MockProbe {
            latency: Duration::from_millis(5),
            fail: true,
        });
        let prefetcher = PredictivePrefetcher::new(Arc::clone(&source), failing, PrefetchConfig::default());

        assert_eq!(prefetcher.measure_latency().await, NetworkCondition::Unreachable);
        assert_eq!(prefetcher.prewarm(&["a".to_string()], 10.0).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_counts_as_unreachable() {
        let source = MockSource::new(Duration::ZERO);
        let prefetcher = PredictivePrefetcher::new(source, probe(5_000), PrefetchConfig::default());

        assert_eq!(prefetcher.measure_latency().await, NetworkCondition::Unreachable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_swallowed() {
        let source = MockSource::new(Duration::ZERO);
        source.fail.store(true, Ordering::SeqCst);
        let prefetcher = PredictivePrefetcher::new(Arc::clone(&source), probe(20), PrefetchConfig::default());

        prefetcher.prewarm(&["a".to_string()], 10.0).await;
        settle().await;

        assert!(prefetcher.get_prefetched("a").is_none());
        assert_eq!(prefetcher.stats().failed, 1);
        assert_eq!(prefetcher.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_entity_not_fetched_twice() {
        let source = MockSource::new(Duration::from_secs(1));
        let prefetcher = PredictivePrefetcher::new(Arc::clone(&source), probe(20), PrefetchConfig::default());

        let ids = vec!["a".to_string()];
        assert_eq!(prefetcher.prewarm(&ids, 10.0).await, 1);
        assert_eq!(prefetcher.prewarm(&ids, 10.0).await, 0);

        assert_eq!(prefetcher.stats().skipped_in_flight, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_fetches() {
        let source = MockSource::new(Duration::from_secs(10));
        let prefetcher = PredictivePrefetcher::new(Arc::clone(&source), probe(20), PrefetchConfig::default());

        prefetcher.prewarm(&["a".to_string()], 10.0).await;
        tokio::task::yield_now().await;
        prefetcher.shutdown();
        settle().await;

        assert!(prefetcher.get_prefetched("a").is_none());
        assert_eq!(prefetcher.in_flight_count(), 0);
        assert_eq!(prefetcher.track_usage("b", 10.0, Duration::from_secs(1)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_monitor_stops_on_shutdown() {
        let source = MockSource::new(Duration::ZERO);
        let prefetcher = PredictivePrefetcher::new(source, probe(20), PrefetchConfig::default());

        let handle = prefetcher.spawn_latency_monitor(Duration::from_secs(30));
        settle().await;
        assert!(prefetcher.network_condition().latency().is_some());

        prefetcher.shutdown();
        handle.await.unwrap();
    }
}
