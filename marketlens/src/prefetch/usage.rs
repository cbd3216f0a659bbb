//! Visit tracking used to predict the next entity a user opens.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub visits: u32,
    /// Accumulated time spent on the entity
    pub total_session: Duration,
    /// Radius of the most recent visit; reused for the speculative fetch
    pub last_radius_miles: f64,
    pub last_seen: Instant,
}

/// A predicted next request.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub entity_id: String,
    pub radius_miles: f64,
}

/// Bounded per-entity usage history.
#[derive(Debug)]
pub struct UsageTracker {
    records: HashMap<String, UsageRecord>,
    max_tracked: usize,
}

impl UsageTracker {
    pub fn new(max_tracked: usize) -> Self {
        Self {
            records: HashMap::new(),
            max_tracked: max_tracked.max(1),
        }
    }

    pub fn record(&mut self, entity_id: &str, radius_miles: f64, session: Duration) {
        let now = Instant::now();
        match self.records.get_mut(entity_id) {
            Some(record) => {
                record.visits = record.visits.saturating_add(1);
                record.total_session += session;
                record.last_radius_miles = radius_miles;
                record.last_seen = now;
            }
            None => {
                if self.records.len() >= self.max_tracked {
                    self.evict_oldest();
                }
                self.records.insert(
                    entity_id.to_string(),
                    UsageRecord {
                        visits: 1,
                        total_session: session,
                        last_radius_miles: radius_miles,
                        last_seen: now,
                    },
                );
            }
        }
    }

    /// Up to `limit` entities ranked by visits, then accumulated session time.
    pub fn predict(&self, limit: usize, exclude: Option<&str>) -> Vec<Prediction> {
        let mut ranked: Vec<(&String, &UsageRecord)> = self
            .records
            .iter()
            .filter(|(id, _)| Some(id.as_str()) != exclude)
            .collect();

        ranked.sort_by(|(a_id, a), (b_id, b)| {
            b.visits
                .cmp(&a.visits)
                .then(b.total_session.cmp(&a.total_session))
                .then(a_id.cmp(b_id))
        });

        ranked
            .into_iter()
            .take(limit)
            .map(|(id, record)| Prediction {
                entity_id: id.clone(),
                radius_miles: record.last_radius_miles,
            })
            .collect()
    }

    pub fn get(&self, entity_id: &str) -> Option<&UsageRecord> {
        self.records.get(entity_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .records
            .iter()
            .min_by_key(|(_, record)| record.last_seen)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            self.records.remove(&id);
        }
    }
}
