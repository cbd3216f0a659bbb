//! Error types for the prefetch module.

use thiserror::Error;

use crate::store::StoreError;

/// Errors from speculative fetches and latency probes.
///
/// These never reach the resolution path; the prefetcher logs and drops them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrefetchError {
    #[error("Prefetch source failed: {0}")]
    Source(#[from] StoreError),

    #[error("Latency probe failed: {0}")]
    Probe(String),

    /// Probe did not answer within the deadline
    #[error("Latency probe timed out after {0}ms")]
    ProbeTimeout(u64),
}
