//! Error types for the tag overlay store.

use thiserror::Error;

use crate::model::TagScope;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TagError {
    /// Repository rejected the write; the optimistic change was rolled back
    #[error("Failed to write tag for {entity_id} in {scope}: {source}")]
    WriteFailed {
        scope: TagScope,
        entity_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to read tags for {scope}: {source}")]
    ReadFailed {
        scope: TagScope,
        #[source]
        source: StoreError,
    },
}

impl TagError {
    pub fn scope(&self) -> &TagScope {
        match self {
            Self::WriteFailed { scope, .. } | Self::ReadFailed { scope, .. } => scope,
        }
    }
}
