//! Lookup caching.
//!
//! - [`TtlCache`]: concurrent key/value cache with a fixed entry lifetime
//! - [`RequestCoalescer`]: shares one in-flight lookup between callers
//! - [`IdentifierCrossReference`]: both of the above applied to external
//!   identifier lookups

mod coalesce;
mod identifiers;
mod ttl;

pub use coalesce::{wait_for_leader, CoalesceResult, CoalescerStats, InFlight, RequestCoalescer};
pub use identifiers::{CrossReference, IdSetKey, IdentifierCrossReference, LookupError};
pub use ttl::{CacheEntry, TtlCache, TtlCacheStats, DEFAULT_TTL};
