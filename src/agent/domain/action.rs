//! Typed action requests and results
//!
//! Every action the model may request is a variant of [`ActionRequest`];
//! construction goes through [`ActionRequest::parse`], which checks the raw
//! argument mapping against the action's schema and reports the first
//! missing or mistyped field. Downstream code dispatches exhaustively on the
//! variants, so an unvalidated argument can never reach a backend.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Map, Value};

use crate::agent::error::{AgentError, AgentResult};
use crate::domain::VenueFilter;

pub const SEARCH_RESTAURANTS: &str = "search_restaurants";
pub const CHECK_AVAILABILITY: &str = "check_availability";
pub const GET_TIME_SLOTS: &str = "get_time_slots";
pub const LIST_RESERVATIONS: &str = "list_reservations";

/// A validated request for exactly one backend action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    /// Semantic venue search over the vector index
    SearchRestaurants {
        query: String,
        limit: usize,
        filter: Option<VenueFilter>,
    },
    /// Available calendar dates for a venue
    CheckAvailability {
        venue_id: String,
        start_date: NaiveDate,
        party_size: u32,
    },
    /// Bookable time slots for a venue on a given date
    GetTimeSlots {
        venue_id: String,
        date: NaiveDate,
        party_size: u32,
        lat: Option<f64>,
        long: Option<f64>,
    },
    /// The user's reservations at the provider
    ListReservations { only_open: bool },
}

impl ActionRequest {
    /// Parse a named action with a raw argument mapping into a typed request.
    ///
    /// Fails with [`AgentError::UnknownAction`] for unregistered names and
    /// [`AgentError::InvalidArguments`] naming the first offending field.
    pub fn parse(name: &str, arguments: &Value) -> AgentResult<Self> {
        match name {
            SEARCH_RESTAURANTS => {
                let args = as_object(SEARCH_RESTAURANTS, arguments)?;
                Ok(ActionRequest::SearchRestaurants {
                    query: require_str(SEARCH_RESTAURANTS, args, "query")?,
                    limit: optional_uint(SEARCH_RESTAURANTS, args, "limit")?.unwrap_or(5) as usize,
                    filter: parse_filter(args)?,
                })
            }
            CHECK_AVAILABILITY => {
                let args = as_object(CHECK_AVAILABILITY, arguments)?;
                Ok(ActionRequest::CheckAvailability {
                    venue_id: require_venue_id(CHECK_AVAILABILITY, args)?,
                    start_date: require_date(CHECK_AVAILABILITY, args, "start_date")?,
                    party_size: optional_uint(CHECK_AVAILABILITY, args, "party_size")?.unwrap_or(2),
                })
            }
            GET_TIME_SLOTS => {
                let args = as_object(GET_TIME_SLOTS, arguments)?;
                Ok(ActionRequest::GetTimeSlots {
                    venue_id: require_venue_id(GET_TIME_SLOTS, args)?,
                    date: require_date(GET_TIME_SLOTS, args, "date")?,
                    party_size: optional_uint(GET_TIME_SLOTS, args, "party_size")?.unwrap_or(2),
                    lat: optional_float(GET_TIME_SLOTS, args, "lat")?,
                    long: optional_float(GET_TIME_SLOTS, args, "long")?,
                })
            }
            LIST_RESERVATIONS => {
                let args = as_object(LIST_RESERVATIONS, arguments)?;
                Ok(ActionRequest::ListReservations {
                    only_open: optional_bool(LIST_RESERVATIONS, args, "only_open")?.unwrap_or(true),
                })
            }
            other => Err(AgentError::UnknownAction(other.to_string())),
        }
    }

    /// The registered name of this action
    pub fn name(&self) -> &'static str {
        match self {
            ActionRequest::SearchRestaurants { .. } => SEARCH_RESTAURANTS,
            ActionRequest::CheckAvailability { .. } => CHECK_AVAILABILITY,
            ActionRequest::GetTimeSlots { .. } => GET_TIME_SLOTS,
            ActionRequest::ListReservations { .. } => LIST_RESERVATIONS,
        }
    }

    /// Only idempotent, slow-changing reads are cacheable. Availability and
    /// slot data is time-sensitive and must never be served stale.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, ActionRequest::SearchRestaurants { .. })
    }

    /// Normalized argument mapping for cache keying. Defaults are applied,
    /// so invocations that only differ in spelled-out defaults collide.
    pub fn canonical_arguments(&self) -> Value {
        match self {
            ActionRequest::SearchRestaurants {
                query,
                limit,
                filter,
            } => {
                let mut args = Map::new();
                args.insert("query".to_string(), Value::from(query.as_str()));
                args.insert("limit".to_string(), Value::from(*limit as u64));
                if let Some(filter) = filter {
                    args.insert(
                        "filter".to_string(),
                        serde_json::to_value(filter).unwrap_or(Value::Null),
                    );
                }
                Value::Object(args)
            }
            ActionRequest::CheckAvailability {
                venue_id,
                start_date,
                party_size,
            } => json!({
                "venue_id": venue_id,
                "start_date": start_date.to_string(),
                "party_size": party_size,
            }),
            ActionRequest::GetTimeSlots {
                venue_id,
                date,
                party_size,
                lat,
                long,
            } => json!({
                "venue_id": venue_id,
                "date": date.to_string(),
                "party_size": party_size,
                "lat": lat,
                "long": long,
            }),
            ActionRequest::ListReservations { only_open } => json!({ "only_open": only_open }),
        }
    }
}

/// Result of a successfully executed action. Immutable once created.
#[derive(Debug, Clone)]
pub struct ActionResult {
    /// Structured result payload, in the shape embedded into the transcript
    pub value: Value,
    /// When the backend produced this result
    pub produced_at: DateTime<Utc>,
}

impl ActionResult {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            produced_at: Utc::now(),
        }
    }
}

fn as_object<'a>(action: &'static str, arguments: &'a Value) -> AgentResult<&'a Map<String, Value>> {
    arguments.as_object().ok_or(AgentError::InvalidArguments {
        action,
        message: "arguments must be a JSON object".to_string(),
    })
}

fn invalid(action: &'static str, message: String) -> AgentError {
    AgentError::InvalidArguments { action, message }
}

fn require_str(
    action: &'static str,
    args: &Map<String, Value>,
    field: &str,
) -> AgentResult<String> {
    match args.get(field) {
        None | Some(Value::Null) => Err(invalid(action, format!("missing required field `{}`", field))),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(invalid(action, format!("field `{}` must not be empty", field))),
        Some(_) => Err(invalid(action, format!("field `{}` must be a string", field))),
    }
}

fn require_venue_id(action: &'static str, args: &Map<String, Value>) -> AgentResult<String> {
    let id = require_str(action, args, "venue_id")?;
    // The model sometimes passes a restaurant name where an ID belongs;
    // reject anything that is not a plain decimal identifier before it can
    // reach the reservation provider.
    if id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(id)
    } else {
        Err(invalid(
            action,
            format!("field `venue_id` must be a numeric venue id, got `{}`", id),
        ))
    }
}

fn require_date(
    action: &'static str,
    args: &Map<String, Value>,
    field: &str,
) -> AgentResult<NaiveDate> {
    let raw = require_str(action, args, field)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
        invalid(
            action,
            format!("field `{}` must be a date in YYYY-MM-DD format, got `{}`", field, raw),
        )
    })
}

fn optional_uint(
    action: &'static str,
    args: &Map<String, Value>,
    field: &str,
) -> AgentResult<Option<u32>> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match value.as_u64() {
            Some(n) if n >= 1 => Ok(Some(n.min(u32::MAX as u64) as u32)),
            Some(_) => Err(invalid(action, format!("field `{}` must be at least 1", field))),
            None => Err(invalid(
                action,
                format!("field `{}` must be a positive integer", field),
            )),
        },
    }
}

fn optional_float(
    action: &'static str,
    args: &Map<String, Value>,
    field: &str,
) -> AgentResult<Option<f64>> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            invalid(action, format!("field `{}` must be a number", field))
        }),
    }
}

fn optional_bool(
    action: &'static str,
    args: &Map<String, Value>,
    field: &str,
) -> AgentResult<Option<bool>> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_bool().map(Some).ok_or_else(|| {
            invalid(action, format!("field `{}` must be a boolean", field))
        }),
    }
}

fn parse_filter(args: &Map<String, Value>) -> AgentResult<Option<VenueFilter>> {
    match args.get("filter") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(filter)) => {
            let neighborhood = filter_field(filter, "neighborhood")?;
            let locality = filter_field(filter, "locality")?;
            if neighborhood.is_none() && locality.is_none() {
                Ok(None)
            } else {
                Ok(Some(VenueFilter {
                    neighborhood,
                    locality,
                }))
            }
        }
        Some(_) => Err(invalid(
            SEARCH_RESTAURANTS,
            "field `filter` must be an object".to_string(),
        )),
    }
}

fn filter_field(filter: &Map<String, Value>, field: &str) -> AgentResult<Option<String>> {
    match filter.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(
            SEARCH_RESTAURANTS,
            format!("filter field `{}` must be a string", field),
        )),
    }
}
