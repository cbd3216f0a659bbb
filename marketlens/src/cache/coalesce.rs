//! Request coalescing for keyed lookups.
//!
//! When several callers ask for the same key while a lookup is already
//! running, only the first one (the leader) does the work. The others
//! subscribe to the leader's result.
//!
//! ```text
//! Caller A ─┐
//!           │                                  Source
//! Caller B ─┼──► RequestCoalescer ──leader──► (one call)
//!           │         │                            │
//! Caller C ─┘         ▼                            ▼
//!              [B, C subscribe]◄──── broadcast ────┘
//! ```
//!
//! The leader holds an [`InFlight`] guard. Completing it broadcasts the value
//! and clears the key. Dropping it without completing (the leader's task was
//! cancelled) also clears the key, and waiters observe a closed channel so
//! they can register again instead of hanging.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::broadcast;
use tracing::debug;

/// Only one value is ever sent per key.
const CHANNEL_CAPACITY: usize = 1;

/// Statistics for monitoring coalescing effectiveness.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CoalescerStats {
    /// Total requests received
    pub total_requests: u64,
    /// Requests that were coalesced (waited for existing work)
    pub coalesced_requests: u64,
    /// Requests that triggered new work
    pub new_requests: u64,
}

impl CoalescerStats {
    /// Returns the coalescing ratio (0.0 to 1.0)
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}

struct CoalescerInner<K, V> {
    in_flight: HashMap<K, broadcast::Sender<V>>,
    stats: CoalescerStats,
}

/// Tracks in-flight lookups by key.
///
/// The map lock is never held across an await point.
pub struct RequestCoalescer<K, V> {
    inner: Mutex<CoalescerInner<K, V>>,
}

/// Result of registering a request.
pub enum CoalesceResult<'a, K: Eq + Hash + Clone, V: Clone> {
    /// First request for the key; perform the lookup and complete the guard
    NewRequest(InFlight<'a, K, V>),
    /// Another request is in flight; wait on the receiver
    Coalesced(broadcast::Receiver<V>),
}

impl<'a, K: Eq + Hash + Clone, V: Clone> CoalesceResult<'a, K, V> {
    pub fn is_new_request(&self) -> bool {
        matches!(self, Self::NewRequest(_))
    }
}

/// Waits for a leader's result.
///
/// Returns `None` if the leader went away without completing.
pub async fn wait_for_leader<V: Clone>(mut rx: broadcast::Receiver<V>) -> Option<V> {
    rx.recv().await.ok()
}

/// Leader guard for one in-flight key.
pub struct InFlight<'a, K: Eq + Hash + Clone, V: Clone> {
    coalescer: &'a RequestCoalescer<K, V>,
    key: Option<K>,
}

impl<'a, K: Eq + Hash + Clone, V: Clone> InFlight<'a, K, V> {
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    /// Broadcasts `value` to every waiter and clears the key.
    pub fn complete(mut self, value: V) {
        if let Some(key) = self.key.take() {
            let sender = self.coalescer.inner.lock().in_flight.remove(&key);
            if let Some(tx) = sender {
                let waiters = tx.receiver_count();
                // Receivers may have been dropped
                let _ = tx.send(value);
                if waiters > 0 {
                    debug!(waiters, "Broadcast result to coalesced waiters");
                }
            }
        }
    }
}

impl<'a, K: Eq + Hash + Clone, V: Clone> Drop for InFlight<'a, K, V> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.coalescer.inner.lock().in_flight.remove(&key);
            debug!("In-flight request abandoned before completion");
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> RequestCoalescer<K, V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CoalescerInner {
                in_flight: HashMap::new(),
                stats: CoalescerStats::default(),
            }),
        }
    }

    /// Registers interest in `key`.
    pub fn register(&self, key: K) -> CoalesceResult<'_, K, V> {
        let mut inner = self.inner.lock();
        inner.stats.total_requests += 1;

        let existing = inner.in_flight.get(&key).map(|tx| tx.subscribe());
        if let Some(rx) = existing {
            inner.stats.coalesced_requests += 1;
            debug!(
                coalesced = inner.stats.coalesced_requests,
                "Coalescing request - waiting for in-flight lookup"
            );
            return CoalesceResult::Coalesced(rx);
        }

        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        inner.in_flight.insert(key.clone(), tx);
        inner.stats.new_requests += 1;
        debug!(
            in_flight_count = inner.in_flight.len(),
            "New request - starting lookup"
        );
        drop(inner);

        CoalesceResult::NewRequest(InFlight {
            coalescer: self,
            key: Some(key),
        })
    }

    pub fn stats(&self) -> CoalescerStats {
        self.inner.lock().stats
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.lock().in_flight.len()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for RequestCoalescer<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
