//! The denormalized market view shared by the table and the map.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::entity::MarketEntity;
use super::filter::MarketFilter;
use super::tag::{Tag, TagScope};
use crate::coord::Coordinate;

/// A sub-lookup that failed while the view was still produced.
///
/// Shown as a non-blocking indicator next to the partial data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResolutionIssue {
    IdentifierLookupFailed(String),
    TagFetchFailed(String),
}

impl fmt::Display for ResolutionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdentifierLookupFailed(msg) => {
                write!(f, "External identifiers unavailable: {}", msg)
            }
            Self::TagFetchFailed(msg) => write!(f, "Tags unavailable: {}", msg),
        }
    }
}

/// Counts shown above the market table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarketSummary {
    pub total: usize,
    pub partners: usize,
    pub competitors: usize,
    pub custom_tagged: usize,
    pub with_identifiers: usize,
    pub by_type: BTreeMap<String, usize>,
}

/// Organizations within `radius_miles` of `center`, nearest first.
///
/// A view is immutable. Any change (center, radius, entity set, a tag)
/// produces a successor; consumers hold `Arc<MarketView>` snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct MarketView {
    pub center: Coordinate,
    pub radius_miles: f64,
    /// Organization the market is centered on, if any. Not drawn as a point.
    pub anchor_id: Option<String>,
    pub scope: TagScope,
    pub generated_at: DateTime<Utc>,
    /// Resolution request that produced this view
    pub generation: u64,
    pub issues: Vec<ResolutionIssue>,
    entities: Vec<MarketEntity>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl MarketView {
    /// Builds a view from entities already sorted by distance.
    ///
    /// Duplicate ids keep the first (nearest) occurrence.
    pub fn new(
        center: Coordinate,
        radius_miles: f64,
        scope: TagScope,
        generation: u64,
        entities: Vec<MarketEntity>,
    ) -> Self {
        let mut index = HashMap::with_capacity(entities.len());
        let mut unique = Vec::with_capacity(entities.len());
        for entity in entities {
            if index.contains_key(entity.id()) {
                continue;
            }
            index.insert(entity.id().to_string(), unique.len());
            unique.push(entity);
        }

        Self {
            center,
            radius_miles,
            anchor_id: None,
            scope,
            generated_at: Utc::now(),
            generation,
            issues: Vec::new(),
            entities: unique,
            index,
        }
    }

    pub fn with_anchor(mut self, anchor_id: Option<String>) -> Self {
        self.anchor_id = anchor_id;
        self
    }

    pub fn with_issues(mut self, issues: Vec<ResolutionIssue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn get(&self, id: &str) -> Option<&MarketEntity> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Entities in ascending distance order.
    pub fn entities(&self) -> &[MarketEntity] {
        &self.entities
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.id())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Successor view with `id` re-tagged, or `None` if `id` is not in the
    /// market. Everything except the one entity and the timestamp is shared.
    pub fn with_tag(&self, id: &str, tag: Tag) -> Option<Self> {
        let &position = self.index.get(id)?;
        let mut next = self.clone();
        next.entities[position] = self.entities[position].with_tag(tag);
        next.generated_at = Utc::now();
        Some(next)
    }

    /// Entities passing a client-side filter, in distance order.
    pub fn filtered<'a>(&'a self, filter: &MarketFilter) -> Vec<&'a MarketEntity> {
        self.entities.iter().filter(|e| filter.matches(e)).collect()
    }

    pub fn summary(&self) -> MarketSummary {
        let mut summary = MarketSummary {
            total: self.entities.len(),
            ..MarketSummary::default()
        };

        for entity in &self.entities {
            match entity.tag {
                Tag::Partner => summary.partners += 1,
                Tag::Competitor => summary.competitors += 1,
                Tag::Custom(_) => summary.custom_tagged += 1,
                Tag::None => {}
            }
            if entity.has_external_identifier() {
                summary.with_identifiers += 1;
            }
            *summary
                .by_type
                .entry(entity.organization.org_type.clone())
                .or_default() += 1;
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Organization;
    use std::sync::Arc;

    fn entity(id: &str, org_type: &str, distance: f64) -> MarketEntity {
        let org = Organization::new(id, id, Coordinate::new(38.6, -90.3).unwrap(), org_type);
        MarketEntity::new(Arc::new(org), distance)
    }

    fn view() -> MarketView {
        MarketView::new(
            Coordinate::new(38.6592, -90.358).unwrap(),
            10.0,
            TagScope::Session("s1".into()),
            1,
            vec![
                entity("a", "hospital", 1.0),
                entity("b", "clinic", 2.0),
                entity("c", "hospital", 3.0),
            ],
        )
    }

    #[test]
    fn test_lookup_by_id() {
        let view = view();
        assert_eq!(view.len(), 3);
        assert_eq!(view.get("b").unwrap().distance_miles, 2.0);
        assert!(view.get("zzz").is_none());
        assert_eq!(view.ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_ids_keep_nearest() {
        let view = MarketView::new(
            Coordinate::new(0.0, 0.0).unwrap(),
            5.0,
            TagScope::Session("s".into()),
            1,
            vec![entity("a", "clinic", 1.0), entity("a", "clinic", 4.0)],
        );
        assert_eq!(view.len(), 1);
        assert_eq!(view.get("a").unwrap().distance_miles, 1.0);
    }

    #[test]
    fn test_with_tag_produces_successor() {
        let original = view();
        let next = original.with_tag("b", Tag::Competitor).unwrap();

        assert_eq!(original.get("b").unwrap().tag, Tag::None);
        assert_eq!(next.get("b").unwrap().tag, Tag::Competitor);
        assert_eq!(next.generation, original.generation);
        assert_eq!(next.ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(original.with_tag("missing", Tag::Partner).is_none());
    }

    #[test]
    fn test_summary_counts() {
        let view = view()
            .with_tag("a", Tag::Partner)
            .and_then(|v| v.with_tag("c", Tag::Custom("referral".into())))
            .unwrap();

        let summary = view.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.partners, 1);
        assert_eq!(summary.competitors, 0);
        assert_eq!(summary.custom_tagged, 1);
        assert_eq!(summary.by_type.get("hospital"), Some(&2));
        assert_eq!(summary.by_type.get("clinic"), Some(&1));
    }

    #[test]
    fn test_filtered_keeps_distance_order() {
        let view = view();
        let hospitals = view.filtered(&MarketFilter::default().with_type("hospital"));
        let ids: Vec<_> = hospitals.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_issue_display() {
        let issue = ResolutionIssue::IdentifierLookupFailed("timeout".into());
        assert!(issue.to_string().contains("timeout"));
    }
}
