//! In-memory persistence backend.
//!
//! Implements all three store traits over plain maps. Used by the CLI to run
//! against JSON fixtures and by tests that need a well-behaved store.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::types::{IdentifierMap, IdentifierSource, OrganizationStore, StoreError, TagRepository};
use crate::coord::BoundingBox;
use crate::model::{Organization, Tag, TagScope};

/// One persisted tag row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRow {
    pub scope: TagScope,
    pub entity_id: String,
    pub tag: Tag,
}

/// Serializable snapshot of an in-memory store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub identifiers: IdentifierMap,
    #[serde(default)]
    pub tags: Vec<TagRow>,
}

impl Fixture {
    /// Reads a JSON fixture and validates every coordinate.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Fixture(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, StoreError> {
        let fixture: Fixture =
            serde_json::from_str(content).map_err(|e| StoreError::Fixture(e.to_string()))?;

        for org in &fixture.organizations {
            org.coordinate
                .validate()
                .map_err(|e| StoreError::Fixture(format!("organization {}: {}", org.id, e)))?;
        }

        Ok(fixture)
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    organizations: RwLock<Vec<Organization>>,
    identifiers: RwLock<IdentifierMap>,
    tags: RwLock<HashMap<TagScope, HashMap<String, Tag>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let store = Self::new();
        *store.organizations.write() = fixture.organizations;
        *store.identifiers.write() = fixture.identifiers;
        {
            let mut tags = store.tags.write();
            for row in fixture.tags.into_iter().filter(|row| !row.tag.is_none()) {
                tags.entry(row.scope).or_default().insert(row.entity_id, row.tag);
            }
        }
        store
    }

    pub fn insert_organization(&self, organization: Organization) {
        let mut orgs = self.organizations.write();
        orgs.retain(|o| o.id != organization.id);
        orgs.push(organization);
    }

    pub fn insert_identifiers(&self, id: impl Into<String>, identifiers: Vec<String>) {
        self.identifiers.write().insert(id.into(), identifiers);
    }

    pub fn organization_count(&self) -> usize {
        self.organizations.read().len()
    }
}

impl OrganizationStore for InMemoryStore {
    async fn query_box(&self, bbox: BoundingBox) -> Result<Vec<Organization>, StoreError> {
        Ok(self
            .organizations
            .read()
            .iter()
            .filter(|org| bbox.contains(&org.coordinate))
            .cloned()
            .collect())
    }
}

impl IdentifierSource for InMemoryStore {
    async fn query_by_ids(&self, ids: &[String]) -> Result<IdentifierMap, StoreError> {
        let identifiers = self.identifiers.read();
        Ok(ids
            .iter()
            .filter_map(|id| identifiers.get(id).map(|v| (id.clone(), v.clone())))
            .collect())
    }
}

impl TagRepository for InMemoryStore {
    async fn read_tags(&self, scope: &TagScope) -> Result<HashMap<String, Tag>, StoreError> {
        Ok(self.tags.read().get(scope).cloned().unwrap_or_default())
    }

    async fn write_tag(
        &self,
        scope: &TagScope,
        entity_id: &str,
        tag: &Tag,
    ) -> Result<(), StoreError> {
        self.tags
            .write()
            .entry(scope.clone())
            .or_default()
            .insert(entity_id.to_string(), tag.clone());
        Ok(())
    }

    async fn delete_tag(&self, scope: &TagScope, entity_id: &str) -> Result<(), StoreError> {
        if let Some(rows) = self.tags.write().get_mut(scope) {
            rows.remove(entity_id);
        }
        Ok(())
    }
}
