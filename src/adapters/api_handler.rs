//! REST API handlers over the agent core
//!
//! `/chat` drives the orchestration loop; the remaining action endpoints
//! invoke the Action Registry executor directly, bypassing the LLM
//! decision step, through the same parse/validate path the loop uses.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::adapters::metrics_handler::MetricsCollector;
use crate::agent::domain::{
    ActionRequest, Message, CHECK_AVAILABILITY, GET_TIME_SLOTS, LIST_RESERVATIONS,
    SEARCH_RESTAURANTS,
};
use crate::agent::error::AgentError;
use crate::agent::memory::Session;
use crate::agent::registry::ActionRegistry;
use crate::agent::Orchestrator;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub registry: Arc<ActionRegistry>,
    pub session: Arc<Session>,
    pub metrics: Arc<MetricsCollector>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    fn json(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            error: message.into(),
        })
    }
}

/// `POST /chat`: one orchestration-loop run over the supplied history
pub async fn chat(State(state): State<ApiState>, Json(request): Json<ChatRequest>) -> Response {
    let history: Vec<Message> = request
        .conversation_history
        .iter()
        .filter_map(to_history_message)
        .collect();

    match state
        .orchestrator
        .run(&state.session, &history, &request.message)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err @ AgentError::DecisionProvider(_)) => {
            tracing::error!(error = %err, "chat request failed at the decision provider");
            (StatusCode::BAD_GATEWAY, ErrorResponse::json(err.to_string())).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "chat request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::json(err.to_string()),
            )
                .into_response()
        }
    }
}

/// Replayed history only ever contains user and assistant turns; anything
/// else a client sends is dropped (the system instruction is ours to seed).
fn to_history_message(message: &ChatMessage) -> Option<Message> {
    match message.role.as_str() {
        "user" => Some(Message::user(&message.content)),
        "assistant" => Some(Message::assistant(&message.content)),
        other => {
            tracing::debug!(role = other, "dropping unsupported history role");
            None
        }
    }
}

/// `POST /search-restaurants`
pub async fn search_restaurants(
    State(state): State<ApiState>,
    Json(arguments): Json<Value>,
) -> Response {
    execute_direct(&state, SEARCH_RESTAURANTS, arguments).await
}

/// `POST /check-availability`
pub async fn check_availability(
    State(state): State<ApiState>,
    Json(arguments): Json<Value>,
) -> Response {
    execute_direct(&state, CHECK_AVAILABILITY, arguments).await
}

/// `POST /get-time-slots`
pub async fn get_time_slots(
    State(state): State<ApiState>,
    Json(arguments): Json<Value>,
) -> Response {
    execute_direct(&state, GET_TIME_SLOTS, arguments).await
}

/// `GET /current-reservations`
pub async fn current_reservations(State(state): State<ApiState>) -> Response {
    execute_direct(&state, LIST_RESERVATIONS, json!({ "only_open": true })).await
}

/// `GET /all-reservations`
pub async fn all_reservations(State(state): State<ApiState>) -> Response {
    execute_direct(&state, LIST_RESERVATIONS, json!({ "only_open": false })).await
}

/// `POST /reset-context`: forget every remembered venue and cached result
pub async fn reset_context(State(state): State<ApiState>) -> Response {
    state.session.reset().await;
    tracing::info!("session context and result cache cleared");
    (StatusCode::OK, Json(json!({ "status": "reset" }))).into_response()
}

async fn execute_direct(state: &ApiState, action: &'static str, arguments: Value) -> Response {
    let request = match ActionRequest::parse(action, &arguments) {
        Ok(request) => request,
        Err(err) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::json(err.to_string()),
            )
                .into_response();
        }
    };

    match state.registry.execute(&request).await {
        Ok(result) => {
            state
                .metrics
                .action_executions
                .with_label_values(&[action, "ok"])
                .inc();
            (StatusCode::OK, Json(result.value)).into_response()
        }
        Err(err) => {
            state
                .metrics
                .action_executions
                .with_label_values(&[action, "error"])
                .inc();
            tracing::error!(action, error = %err, "direct action invocation failed");
            (StatusCode::BAD_GATEWAY, ErrorResponse::json(err.to_string())).into_response()
        }
    }
}
