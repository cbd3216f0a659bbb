use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::error::TagError;
use crate::model::{Tag, TagScope};
use crate::retry::{retry_once, DEFAULT_RETRY_DELAY};
use crate::store::TagRepository;

/// Buffered change notifications per subscriber.
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// One effective tag change. `Tag::None` means the entity is now untagged.
#[derive(Debug, Clone, PartialEq)]
pub struct TagChange {
    pub scope: TagScope,
    pub entity_id: String,
    pub tag: Tag,
}

#[derive(Debug, Clone)]
struct PendingWrite {
    seq: u64,
    tag: Tag,
}

type RowKey = (TagScope, String);

/// Optimistic overlay over a [`TagRepository`].
///
/// Concurrent writes to one row are last-write-wins by call order: only the
/// newest pending write for a row is visible and may roll back.
pub struct TagOverlayStore<R> {
    repository: Arc<R>,
    pending: Mutex<HashMap<RowKey, PendingWrite>>,
    next_seq: AtomicU64,
    changes: broadcast::Sender<TagChange>,
    retry_delay: Duration,
}

impl<R: TagRepository> TagOverlayStore<R> {
    pub fn new(repository: Arc<R>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            repository,
            pending: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
            changes,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Receives every effective change, including rollbacks.
    pub fn subscribe(&self) -> broadcast::Receiver<TagChange> {
        self.changes.subscribe()
    }

    /// Tags `entity_id` within `scope`. `Tag::None` removes the row.
    pub async fn set_tag(&self, scope: &TagScope, entity_id: &str, tag: Tag) -> Result<(), TagError> {
        let key: RowKey = (scope.clone(), entity_id.to_string());
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        self.pending.lock().insert(
            key.clone(),
            PendingWrite {
                seq,
                tag: tag.clone(),
            },
        );
        self.broadcast(scope, entity_id, tag.clone());

        let result = if tag.is_none() {
            retry_once("delete_tag", self.retry_delay, || {
                self.repository.delete_tag(scope, entity_id)
            })
            .await
        } else {
            retry_once("write_tag", self.retry_delay, || {
                self.repository.write_tag(scope, entity_id, &tag)
            })
            .await
        };

        let still_newest = {
            let mut pending = self.pending.lock();
            let newest = pending.get(&key).map_or(false, |p| p.seq == seq);
            if newest {
                pending.remove(&key);
            }
            newest
        };

        match result {
            Ok(()) => {
                info!(scope = %scope, entity = entity_id, tag = %tag, "Tag saved");
                Ok(())
            }
            Err(source) => {
                warn!(
                    scope = %scope,
                    entity = entity_id,
                    error = %source,
                    "Tag write failed, rolling back"
                );
                if still_newest {
                    self.roll_back(scope, entity_id).await;
                }
                Err(TagError::WriteFailed {
                    scope: scope.clone(),
                    entity_id: entity_id.to_string(),
                    source,
                })
            }
        }
    }

    /// Removes any tag on `entity_id`. Clearing an untagged entity succeeds.
    pub async fn clear_tag(&self, scope: &TagScope, entity_id: &str) -> Result<(), TagError> {
        self.set_tag(scope, entity_id, Tag::None).await
    }

    /// All tags in `scope`, pending writes applied. Untagged entities are
    /// absent from the map.
    pub async fn list_tags(&self, scope: &TagScope) -> Result<HashMap<String, Tag>, TagError> {
        let mut tags = retry_once("read_tags", self.retry_delay, || {
            self.repository.read_tags(scope)
        })
        .await
        .map_err(|source| TagError::ReadFailed {
            scope: scope.clone(),
            source,
        })?;

        let pending = self.pending.lock();
        for ((row_scope, entity_id), write) in pending.iter() {
            if row_scope != scope {
                continue;
            }
            if write.tag.is_none() {
                tags.remove(entity_id);
            } else {
                tags.insert(entity_id.clone(), write.tag.clone());
            }
        }
        tags.retain(|_, tag| !tag.is_none());

        Ok(tags)
    }

    /// Number of writes not yet settled.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Republishes the repository's value after a rejected write.
    async fn roll_back(&self, scope: &TagScope, entity_id: &str) {
        match self.repository.read_tags(scope).await {
            Ok(tags) => {
                let restored = tags.get(entity_id).cloned().unwrap_or_default();
                self.broadcast(scope, entity_id, restored);
            }
            Err(e) => {
                debug!(
                    scope = %scope,
                    entity = entity_id,
                    error = %e,
                    "Could not re-read tag after rollback"
                );
            }
        }
    }

    fn broadcast(&self, scope: &TagScope, entity_id: &str, tag: Tag) {
        // No subscribers is fine
        let _ = self.changes.send(TagChange {
            scope: scope.clone(),
            entity_id: entity_id.to_string(),
            tag,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, StoreError};
    use std::sync::atomic::AtomicBool;

    fn scope() -> TagScope {
        TagScope::SavedMarket("stl-north".to_string())
    }

    /// Repository that can reject writes while delegating reads.
    struct RejectingRepository {
        inner: InMemoryStore,
        reject_writes: AtomicBool,
    }

    impl RejectingRepository {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryStore::new(),
                reject_writes: AtomicBool::new(false),
            })
        }
    }

    impl TagRepository for RejectingRepository {
        async fn read_tags(&self, scope: &TagScope) -> Result<HashMap<String, Tag>, StoreError> {
            self.inner.read_tags(scope).await
        }

        async fn write_tag(
            &self,
            scope: &TagScope,
            entity_id: &str,
            tag: &Tag,
        ) -> Result<(), StoreError> {
            if self.reject_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Query("permission denied".into()));
            }
            self.inner.write_tag(scope, entity_id, tag).await
        }

        async fn delete_tag(&self, scope: &TagScope, entity_id: &str) -> Result<(), StoreError> {
            if self.reject_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Query("permission denied".into()));
            }
            self.inner.delete_tag(scope, entity_id).await
        }
    }

    #[tokio::test]
    async fn test_read_after_write() {
        let store = TagOverlayStore::new(Arc::new(InMemoryStore::new()));

        store.set_tag(&scope(), "org-1", Tag::Partner).await.unwrap();
        let tags = store.list_tags(&scope()).await.unwrap();

        assert_eq!(tags.get("org-1"), Some(&Tag::Partner));
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_tag_then_untag_is_absent() {
        let store = TagOverlayStore::new(Arc::new(InMemoryStore::new()));

        store.set_tag(&scope(), "org-1", Tag::Competitor).await.unwrap();
        store.clear_tag(&scope(), "org-1").await.unwrap();

        let tags = store.list_tags(&scope()).await.unwrap();
        assert!(!tags.contains_key("org-1"));
    }

    #[tokio::test]
    async fn test_clearing_untagged_entity_succeeds() {
        let store = TagOverlayStore::new(Arc::new(InMemoryStore::new()));
        assert!(store.clear_tag(&scope(), "never-tagged").await.is_ok());
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let store = TagOverlayStore::new(Arc::new(InMemoryStore::new()));
        let other = TagScope::Session("s-1".to_string());

        store.set_tag(&scope(), "org-1", Tag::Partner).await.unwrap();

        assert!(store.list_tags(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = TagOverlayStore::new(Arc::new(InMemoryStore::new()));

        store.set_tag(&scope(), "org-1", Tag::Partner).await.unwrap();
        store
            .set_tag(&scope(), "org-1", Tag::Custom("watch".into()))
            .await
            .unwrap();

        let tags = store.list_tags(&scope()).await.unwrap();
        assert_eq!(tags.get("org-1"), Some(&Tag::Custom("watch".into())));
    }

    #[tokio::test]
    async fn test_changes_are_broadcast() {
        let store = TagOverlayStore::new(Arc::new(InMemoryStore::new()));
        let mut rx = store.subscribe();

        store.set_tag(&scope(), "org-1", Tag::Partner).await.unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change.entity_id, "org-1");
        assert_eq!(change.tag, Tag::Partner);
        assert_eq!(change.scope, scope());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_write_rolls_back() {
        let repo = RejectingRepository::new();
        let store = TagOverlayStore::new(Arc::clone(&repo));
        store.set_tag(&scope(), "org-1", Tag::Partner).await.unwrap();

        repo.reject_writes.store(true, Ordering::SeqCst);
        let mut rx = store.subscribe();

        let err = store
            .set_tag(&scope(), "org-1", Tag::Competitor)
            .await
            .unwrap_err();
        assert!(matches!(err, TagError::WriteFailed { .. }));

        // Optimistic change, then the rollback to the stored value
        assert_eq!(rx.recv().await.unwrap().tag, Tag::Competitor);
        assert_eq!(rx.recv().await.unwrap().tag, Tag::Partner);

        let tags = store.list_tags(&scope()).await.unwrap();
        assert_eq!(tags.get("org-1"), Some(&Tag::Partner));
        assert_eq!(store.pending_count(), 0);
    }
}
