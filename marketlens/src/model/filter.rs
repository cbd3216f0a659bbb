//! Client-side filtering of a resolved market.
//!
//! Filters are pure predicates over entities already in a view; they never
//! trigger store or network calls.

use super::entity::MarketEntity;
use super::tag::Tag;

/// Free-text, type, and tag filters from the surrounding UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketFilter {
    /// Case-insensitive substring over name, network, city, and id
    pub search: Option<String>,
    /// Exact organization type (case-insensitive)
    pub org_type: Option<String>,
    pub tag: Option<Tag>,
}

impl MarketFilter {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_type(mut self, org_type: impl Into<String>) -> Self {
        self.org_type = Some(org_type.into());
        self
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.org_type.is_none()
            && self.tag.is_none()
    }

    pub fn matches(&self, entity: &MarketEntity) -> bool {
        let org = &entity.organization;

        if let Some(ref wanted) = self.org_type {
            if !org.org_type.eq_ignore_ascii_case(wanted) {
                return false;
            }
        }

        if let Some(ref tag) = self.tag {
            if &entity.tag != tag {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [
                    Some(org.name.as_str()),
                    Some(org.id.as_str()),
                    org.network.as_deref(),
                    org.address.city.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}
