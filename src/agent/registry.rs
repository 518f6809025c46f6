//! Action registry: the fixed catalog of backend actions
//!
//! Parsing raw (name, arguments) pairs into [`ActionRequest`] lives in
//! `domain::action`; this module owns the schema catalog offered to the
//! model and the executor that dispatches a validated request to the bound
//! collaborator port. Collaborator failures are wrapped into
//! [`AgentError::ActionExecution`]; raw transport errors never reach the
//! loop.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Map};

use crate::agent::domain::{
    ActionRequest, ActionResult, ToolDefinition, CHECK_AVAILABILITY, GET_TIME_SLOTS,
    LIST_RESERVATIONS, SEARCH_RESTAURANTS,
};
use crate::agent::error::{AgentError, AgentResult};
use crate::domain::{ReservationPort, SearchPort};

pub struct ActionRegistry {
    search: Arc<dyn SearchPort>,
    reservations: Arc<dyn ReservationPort>,
}

impl ActionRegistry {
    pub fn new(search: Arc<dyn SearchPort>, reservations: Arc<dyn ReservationPort>) -> Self {
        Self {
            search,
            reservations,
        }
    }

    /// The schema catalog offered to the model on every decision round
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new(
                SEARCH_RESTAURANTS,
                "Search for restaurants and venues using semantic similarity. Use descriptive \
                 terms like 'Italian restaurants', 'romantic date spots', 'casual lunch places'. \
                 Optionally pre-filter by neighborhood or locality.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Plain text query to search for restaurant venues"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Number of results to return (default: 5)"
                        },
                        "filter": {
                            "type": "object",
                            "description": "Optional metadata filter",
                            "properties": {
                                "neighborhood": { "type": "string" },
                                "locality": { "type": "string" }
                            }
                        }
                    },
                    "required": ["query"]
                }),
            ),
            ToolDefinition::new(
                CHECK_AVAILABILITY,
                "Check available dates for a specific venue. Use this after finding a restaurant \
                 to see when it has availability. Requires the numeric venue id from search \
                 results.",
                json!({
                    "type": "object",
                    "properties": {
                        "venue_id": {
                            "type": "string",
                            "description": "The numeric venue id from search results"
                        },
                        "start_date": {
                            "type": "string",
                            "description": "Start date in YYYY-MM-DD format"
                        },
                        "party_size": {
                            "type": "integer",
                            "description": "Number of seats needed (default: 2)"
                        }
                    },
                    "required": ["venue_id", "start_date"]
                }),
            ),
            ToolDefinition::new(
                GET_TIME_SLOTS,
                "Get available time slots and booking tokens for a specific date and venue. Use \
                 this after checking availability to see specific times.",
                json!({
                    "type": "object",
                    "properties": {
                        "venue_id": {
                            "type": "string",
                            "description": "The numeric venue id"
                        },
                        "date": {
                            "type": "string",
                            "description": "Date in YYYY-MM-DD format"
                        },
                        "party_size": {
                            "type": "integer",
                            "description": "Number of seats needed (default: 2)"
                        },
                        "lat": {
                            "type": "number",
                            "description": "Venue latitude from search metadata"
                        },
                        "long": {
                            "type": "number",
                            "description": "Venue longitude from search metadata"
                        }
                    },
                    "required": ["venue_id", "date"]
                }),
            ),
            ToolDefinition::new(
                LIST_RESERVATIONS,
                "List the user's reservations. By default only open (upcoming) reservations are \
                 returned; pass only_open=false to include past ones.",
                json!({
                    "type": "object",
                    "properties": {
                        "only_open": {
                            "type": "boolean",
                            "description": "Whether to only return open reservations (default: true)"
                        }
                    },
                    "required": []
                }),
            ),
        ]
    }

    /// Execute a validated request against its bound collaborator.
    pub async fn execute(&self, request: &ActionRequest) -> AgentResult<ActionResult> {
        let value = match request {
            ActionRequest::SearchRestaurants {
                query,
                limit,
                filter,
            } => {
                let venues = self
                    .search
                    .search(query, *limit, filter.as_ref())
                    .await
                    .map_err(|e| execution_error(request, e))?;
                json!({
                    "query": query,
                    "venues": venues,
                    "count": venues.len(),
                    "searched_at": Utc::now().to_rfc3339(),
                })
            }
            ActionRequest::CheckAvailability {
                venue_id,
                start_date,
                party_size,
            } => {
                let dates = self
                    .reservations
                    .available_dates(venue_id, *start_date, *party_size)
                    .await
                    .map_err(|e| execution_error(request, e))?;
                json!({
                    "venue_id": venue_id,
                    "requested_seats": party_size,
                    "search_start_date": start_date.to_string(),
                    "available_dates": dates,
                    "count": dates.len(),
                    "checked_at": Utc::now().to_rfc3339(),
                })
            }
            ActionRequest::GetTimeSlots {
                venue_id,
                date,
                party_size,
                lat,
                long,
            } => {
                let slots = self
                    .reservations
                    .time_slots(
                        venue_id,
                        *date,
                        *party_size,
                        lat.unwrap_or(0.0),
                        long.unwrap_or(0.0),
                    )
                    .await
                    .map_err(|e| execution_error(request, e))?;

                let mut formatted = Map::with_capacity(slots.len());
                for slot in &slots {
                    let key = format_slot_time(&slot.start).unwrap_or_else(|| slot.start.clone());
                    formatted.insert(
                        key,
                        json!({
                            "booking_token": slot.booking_token,
                            "original_timestamp": slot.start,
                        }),
                    );
                }
                json!({
                    "venue_id": venue_id,
                    "date": date.to_string(),
                    "requested_seats": party_size,
                    "available_slots": formatted,
                    "slot_count": formatted.len(),
                    "retrieved_at": Utc::now().to_rfc3339(),
                })
            }
            ActionRequest::ListReservations { only_open } => {
                let reservations = self
                    .reservations
                    .list_reservations(*only_open)
                    .await
                    .map_err(|e| execution_error(request, e))?;
                json!({
                    "reservations": reservations,
                    "count": reservations.len(),
                    "retrieved_at": Utc::now().to_rfc3339(),
                })
            }
        };

        Ok(ActionResult::new(value))
    }
}

fn execution_error(request: &ActionRequest, cause: anyhow::Error) -> AgentError {
    AgentError::ActionExecution {
        action: request.name(),
        cause: cause.to_string(),
    }
}

/// Render a provider slot timestamp as a human-readable time ("07:00 PM").
/// Returns `None` when the timestamp doesn't parse; the caller then keeps
/// the raw string as the slot key.
fn format_slot_time(raw: &str) -> Option<String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.format("%I:%M %p").to_string());
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(parsed.format("%I:%M %p").to_string());
        }
    }
    None
}
