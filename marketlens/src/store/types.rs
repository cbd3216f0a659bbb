//! Persistence boundary traits.
//!
//! The engine reads organizations, identifiers, and tags through these
//! traits; the real backends live in the surrounding application. Futures are
//! `Send` so work can be spawned onto the runtime.

use std::collections::HashMap;
use std::future::Future;
use thiserror::Error;

use crate::coord::BoundingBox;
use crate::model::{Organization, Tag, TagScope};

/// Organization id → external (billing/claims) identifiers.
pub type IdentifierMap = HashMap<String, Vec<String>>;

/// Errors reported by a persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Request exceeded its deadline
    #[error("Store request timed out after {0}ms")]
    Timeout(u64),

    /// Backend rejected or failed the query
    #[error("Store query failed: {0}")]
    Query(String),

    /// Fixture data could not be loaded
    #[error("Invalid fixture: {0}")]
    Fixture(String),
}

/// Spatial reads of organizations.
pub trait OrganizationStore: Send + Sync {
    /// Every organization whose coordinate lies inside `bbox`.
    fn query_box(
        &self,
        bbox: BoundingBox,
    ) -> impl Future<Output = Result<Vec<Organization>, StoreError>> + Send;
}

/// Batched lookups against the external identifier system.
pub trait IdentifierSource: Send + Sync {
    /// Identifiers for every id in `ids`. Ids without identifiers may be
    /// absent from the result.
    fn query_by_ids(
        &self,
        ids: &[String],
    ) -> impl Future<Output = Result<IdentifierMap, StoreError>> + Send;
}

/// Tag rows keyed by (scope, entity id).
pub trait TagRepository: Send + Sync {
    fn read_tags(
        &self,
        scope: &TagScope,
    ) -> impl Future<Output = Result<HashMap<String, Tag>, StoreError>> + Send;

    /// Upsert of one row.
    fn write_tag(
        &self,
        scope: &TagScope,
        entity_id: &str,
        tag: &Tag,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the row. Removing a missing row succeeds.
    fn delete_tag(
        &self,
        scope: &TagScope,
        entity_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
