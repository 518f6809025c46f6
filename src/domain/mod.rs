//! Core domain types and the ports the agent core consumes
//!
//! The vector index and the reservation provider are external
//! collaborators. The core only sees the [`SearchPort`] and
//! [`ReservationPort`] traits; concrete HTTP clients live in `adapters`.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A venue as returned by the search index. Fields the index may not know
/// are `Option` and serialize as `null`; zero is never used to mean
/// "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueSummary {
    /// Canonical reservation-provider venue id
    pub resy_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub venue_type: Option<String>,
    pub description: Option<String>,
    pub neighborhood: Option<String>,
    pub locality: Option<String>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub price_range_id: Option<u32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Relevance score from the vector query (lower is closer)
    pub distance_score: Option<f64>,
}

/// Metadata pre-filter for venue search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
}

/// A bookable time slot at a venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlot {
    /// Raw slot timestamp as reported by the provider
    pub start: String,
    /// Token required to book this slot
    pub booking_token: String,
}

/// Ranked venue search over the vector index
#[async_trait]
pub trait SearchPort: Send + Sync {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filter: Option<&VenueFilter>,
    ) -> anyhow::Result<Vec<VenueSummary>>;
}

/// Reservation-provider REST API
#[async_trait]
pub trait ReservationPort: Send + Sync {
    /// The user's reservation records, optionally restricted to open ones
    async fn list_reservations(&self, only_open: bool) -> anyhow::Result<Vec<Value>>;

    /// Dates with availability for a venue within a year of `start_date`
    async fn available_dates(
        &self,
        venue_id: &str,
        start_date: NaiveDate,
        party_size: u32,
    ) -> anyhow::Result<Vec<String>>;

    /// Bookable slots for a venue on one date
    async fn time_slots(
        &self,
        venue_id: &str,
        date: NaiveDate,
        party_size: u32,
        lat: f64,
        long: f64,
    ) -> anyhow::Result<Vec<TimeSlot>>;
}
