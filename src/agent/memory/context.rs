//! Per-session entity context
//!
//! Maps venue display names to the canonical ids that search results
//! actually returned, so a later turn can say "book Lilia" and the model
//! can reuse the id without another search. The store never invents
//! identity.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::VenueSummary;

/// A venue identity captured from a search result
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Display name as returned by the index
    pub name: String,
    /// Canonical reservation-provider venue id
    pub venue_id: String,
    pub category: Option<String>,
    pub locality: Option<String>,
    pub rating: Option<f64>,
    pub distance_score: Option<f64>,
}

impl From<&VenueSummary> for EntityRecord {
    fn from(venue: &VenueSummary) -> Self {
        Self {
            name: venue.name.clone(),
            venue_id: venue.resy_id.clone(),
            category: venue.venue_type.clone(),
            locality: venue.locality.clone(),
            rating: venue.rating,
            distance_score: venue.distance_score,
        }
    }
}

#[derive(Default)]
pub struct EntityContextStore {
    entries: RwLock<HashMap<String, EntityRecord>>,
}

impl EntityContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert keyed by case-normalized name; last write wins.
    pub async fn record(&self, record: EntityRecord) {
        let key = record.name.to_lowercase();
        self.entries.write().await.insert(key, record);
    }

    pub async fn lookup(&self, name: &str) -> Option<EntityRecord> {
        self.entries.read().await.get(&name.to_lowercase()).cloned()
    }

    /// Text block describing every known venue, for injection into the
    /// system prompt of the next turn. `None` when nothing is known yet.
    pub async fn summary(&self) -> Option<String> {
        let entries = self.entries.read().await;
        if entries.is_empty() {
            return None;
        }
        let mut records: Vec<&EntityRecord> = entries.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));

        let lines: Vec<String> = records
            .iter()
            .map(|record| {
                let mut line = format!("- {} (venue_id: {})", record.name, record.venue_id);
                if let Some(category) = &record.category {
                    line.push_str(&format!(", {}", category));
                }
                if let Some(locality) = &record.locality {
                    line.push_str(&format!(", {}", locality));
                }
                line
            })
            .collect();
        Some(lines.join("\n"))
    }

    pub async fn reset(&self) {
        self.entries.write().await.clear();
    }
}
