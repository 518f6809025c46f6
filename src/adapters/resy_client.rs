//! HTTP client for the Resy-compatible reservation provider
//!
//! Three endpoints are consumed: the user's reservation list, the venue
//! availability calendar, and the per-day slot finder. Credentials come
//! from the environment at construction time. Every response is decoded
//! into typed structs here; fields the rest of the system relies on are
//! required and produce a decode error when absent.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ResySettings;
use crate::domain::{ReservationPort, TimeSlot};

pub struct ResyClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    auth_token: String,
}

impl ResyClient {
    pub fn new(settings: &ResySettings) -> anyhow::Result<Self> {
        let api_key = env::var(&settings.api_key_env).with_context(|| {
            format!("environment variable {} not set", settings.api_key_env)
        })?;
        let auth_token = env::var(&settings.auth_token_env).with_context(|| {
            format!("environment variable {} not set", settings.auth_token_env)
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("failed to build reservation HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            auth_token,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header(
                "Authorization",
                format!("ResyAPI api_key=\"{}\"", self.api_key),
            )
            .header("X-Resy-Auth-Token", &self.auth_token)
    }
}

async fn require_success(
    response: reqwest::Response,
    what: &str,
) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        bail!("{} returned {}: {}", what, status, body);
    }
}

#[async_trait]
impl ReservationPort for ResyClient {
    async fn list_reservations(&self, only_open: bool) -> anyhow::Result<Vec<Value>> {
        let response = self
            .get("/3/user/reservations")
            .send()
            .await
            .context("reservation list request failed")?;
        let response = require_success(response, "reservation list").await?;

        let decoded: ReservationsResponse = response
            .json()
            .await
            .context("failed to decode reservation list response")?;
        let records = decoded
            .reservations
            .context("reservation list response is missing `reservations`")?;

        decode_reservations(records, only_open)
    }

    async fn available_dates(
        &self,
        venue_id: &str,
        start_date: NaiveDate,
        party_size: u32,
    ) -> anyhow::Result<Vec<String>> {
        let end_date = start_date + chrono::Duration::days(365);
        let response = self
            .get("/4/venue/calendar")
            .query(&[
                ("venue_id", venue_id),
                ("num_seats", &party_size.to_string()),
                ("start_date", &start_date.to_string()),
                ("end_date", &end_date.to_string()),
            ])
            .send()
            .await
            .context("venue calendar request failed")?;
        let response = require_success(response, "venue calendar").await?;

        let decoded: CalendarResponse = response
            .json()
            .await
            .context("failed to decode venue calendar response")?;

        Ok(decode_available_dates(decoded))
    }

    async fn time_slots(
        &self,
        venue_id: &str,
        date: NaiveDate,
        party_size: u32,
        lat: f64,
        long: f64,
    ) -> anyhow::Result<Vec<TimeSlot>> {
        let response = self
            .get("/4/find")
            .query(&[
                ("lat", lat.to_string()),
                ("long", long.to_string()),
                ("day", date.to_string()),
                ("party_size", party_size.to_string()),
                ("venue_id", venue_id.to_string()),
            ])
            .send()
            .await
            .context("slot finder request failed")?;
        let response = require_success(response, "slot finder").await?;

        let decoded: FindResponse = response
            .json()
            .await
            .context("failed to decode slot finder response")?;

        decode_time_slots(decoded, venue_id)
    }
}

fn decode_reservations(
    records: Vec<ReservationRecord>,
    only_open: bool,
) -> anyhow::Result<Vec<Value>> {
    records
        .into_iter()
        .filter(|record| !only_open || record.is_open())
        .map(|record| serde_json::to_value(record).context("failed to re-encode reservation"))
        .collect()
}

fn decode_available_dates(response: CalendarResponse) -> Vec<String> {
    response
        .scheduled
        .into_iter()
        .filter(|day| {
            day.inventory
                .as_ref()
                .and_then(|inv| inv.reservation.as_deref())
                == Some("available")
        })
        .map(|day| day.date)
        .collect()
}

fn decode_time_slots(response: FindResponse, venue_id: &str) -> anyhow::Result<Vec<TimeSlot>> {
    let venues = response
        .results
        .context("slot finder response is missing `results`")?
        .venues;
    let Some(venue) = venues.into_iter().next() else {
        bail!("venue {} not present in slot finder response", venue_id);
    };

    Ok(venue
        .slots
        .into_iter()
        .map(|slot| TimeSlot {
            start: slot.date.start,
            booking_token: slot.config.token,
        })
        .collect())
}

// Reservation provider response types

#[derive(Debug, Deserialize)]
struct ReservationsResponse {
    reservations: Option<Vec<ReservationRecord>>,
}

/// A reservation record. Only the status is interpreted here; everything
/// else is carried through verbatim for display.
#[derive(Debug, Serialize, Deserialize)]
struct ReservationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<ReservationStatus>,
    #[serde(flatten)]
    rest: serde_json::Map<String, Value>,
}

impl ReservationRecord {
    /// A reservation is open unless the provider marked it finished.
    fn is_open(&self) -> bool {
        !matches!(
            self.status.as_ref().and_then(|s| s.finished),
            Some(1)
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ReservationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finished: Option<i64>,
    #[serde(flatten)]
    rest: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct CalendarResponse {
    #[serde(default)]
    scheduled: Vec<CalendarDay>,
}

#[derive(Debug, Deserialize)]
struct CalendarDay {
    date: String,
    inventory: Option<CalendarInventory>,
}

#[derive(Debug, Deserialize)]
struct CalendarInventory {
    reservation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    results: Option<FindResults>,
}

#[derive(Debug, Deserialize)]
struct FindResults {
    #[serde(default)]
    venues: Vec<FindVenue>,
}

#[derive(Debug, Deserialize)]
struct FindVenue {
    #[serde(default)]
    slots: Vec<FindSlot>,
}

#[derive(Debug, Deserialize)]
struct FindSlot {
    date: SlotDate,
    config: SlotConfig,
}

#[derive(Debug, Deserialize)]
struct SlotDate {
    start: String,
}

#[derive(Debug, Deserialize)]
struct SlotConfig {
    token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_keeps_only_available_days() {
        let raw = r#"{
            "scheduled": [
                { "date": "2024-01-15", "inventory": { "reservation": "available" } },
                { "date": "2024-01-16", "inventory": { "reservation": "sold-out" } },
                { "date": "2024-01-17", "inventory": {} },
                { "date": "2024-01-18", "inventory": { "reservation": "available" } }
            ]
        }"#;
        let response: CalendarResponse = serde_json::from_str(raw).unwrap();

        assert_eq!(
            decode_available_dates(response),
            vec!["2024-01-15".to_string(), "2024-01-18".to_string()]
        );
    }

    #[test]
    fn slots_are_extracted_from_the_first_venue() {
        let raw = r#"{
            "results": {
                "venues": [{
                    "slots": [
                        { "date": { "start": "2024-01-15 19:00:00" }, "config": { "token": "tok-19" } },
                        { "date": { "start": "2024-01-15 21:30:00" }, "config": { "token": "tok-2130" } }
                    ]
                }]
            }
        }"#;
        let response: FindResponse = serde_json::from_str(raw).unwrap();

        let slots = decode_time_slots(response, "834").unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start, "2024-01-15 19:00:00");
        assert_eq!(slots[1].booking_token, "tok-2130");
    }

    #[test]
    fn missing_venue_in_find_response_is_an_error() {
        let raw = r#"{ "results": { "venues": [] } }"#;
        let response: FindResponse = serde_json::from_str(raw).unwrap();
        let err = decode_time_slots(response, "834").unwrap_err();
        assert!(err.to_string().contains("834"));
    }

    #[test]
    fn open_filter_drops_finished_reservations() {
        let raw = r#"[
            { "venue": "Lilia", "status": { "finished": 0 } },
            { "venue": "Old Spot", "status": { "finished": 1 } },
            { "venue": "No Status Yet" }
        ]"#;
        let records: Vec<ReservationRecord> = serde_json::from_str(raw).unwrap();

        let open = decode_reservations(records, true).unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0]["venue"], "Lilia");
        assert_eq!(open[1]["venue"], "No Status Yet");

        let records: Vec<ReservationRecord> =
            serde_json::from_str(raw).unwrap();
        let all = decode_reservations(records, false).unwrap();
        assert_eq!(all.len(), 3);
    }
}
