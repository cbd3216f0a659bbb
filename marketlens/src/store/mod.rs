//! Persistence boundary.
//!
//! The engine consumes three read/write contracts:
//!
//! - [`OrganizationStore::query_box`]: coarse spatial range query
//! - [`IdentifierSource::query_by_ids`]: batched external identifier lookup
//! - [`TagRepository`]: tag rows keyed by (scope, entity)
//!
//! [`InMemoryStore`] implements all three for fixtures and tests.

mod memory;
mod types;

pub use memory::{Fixture, InMemoryStore, TagRow};
pub use types::{IdentifierMap, IdentifierSource, OrganizationStore, StoreError, TagRepository};
