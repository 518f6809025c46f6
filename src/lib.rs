//! # Hestia - Restaurant Reservation Agent
//!
//! Hestia is a single-process reservation assistant service. A tool-call
//! orchestration loop asks an LLM which backend action to take at each
//! conversational turn, executes at most one action per round against the
//! venue search index or the reservation provider, and feeds the bounded
//! result back into the transcript until the model produces a final answer.
//!
//! ## Architecture
//!
//! Hestia follows Hexagonal Architecture:
//! - **Domain**: Venue model and the collaborator ports
//! - **Agent**: The orchestration loop, action registry, session memory
//! - **Adapters**: HTTP handlers and the collaborator clients
//! - **Config**: Configuration management
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clap::Parser;
//! use hestia::cli::Cli;
//! use hestia::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse_from(["hestia"]);
//!     let settings = Settings::new(&cli)?;
//!     // Server will start on settings.server.host:settings.server.port
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod agent;
pub mod cli;
pub mod config;
pub mod domain;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use crate::adapters::api_handler::{self, ApiState};
use crate::adapters::health_handler::HealthHandler;
use crate::adapters::metrics_handler::MetricsCollector;

/// Creates the Axum application router with all endpoints configured.
pub fn create_app(
    api_state: ApiState,
    health_handler: Arc<HealthHandler>,
    metrics: Arc<MetricsCollector>,
) -> Router {
    let router = Router::new()
        // Health check endpoints
        .route(
            "/health",
            get({
                let handler = health_handler.clone();
                move || {
                    let h = handler.clone();
                    async move { h.health().await }
                }
            }),
        )
        .route(
            "/health/live",
            get({
                let handler = health_handler.clone();
                move || {
                    let h = handler.clone();
                    async move { h.live().await }
                }
            }),
        )
        // Metrics endpoint
        .route(
            "/metrics",
            get({
                let metrics = metrics.clone();
                move || {
                    let m = metrics.clone();
                    async move {
                        match m.render() {
                            Ok(text) => (StatusCode::OK, text).into_response(),
                            Err(e) => {
                                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
                            }
                        }
                    }
                }
            }),
        )
        // Conversational endpoint (the orchestration loop)
        .route("/chat", post(api_handler::chat))
        // Direct action endpoints, bypassing the LLM decision step
        .route("/search-restaurants", post(api_handler::search_restaurants))
        .route("/check-availability", post(api_handler::check_availability))
        .route("/get-time-slots", post(api_handler::get_time_slots))
        .route("/current-reservations", get(api_handler::current_reservations))
        .route("/all-reservations", get(api_handler::all_reservations))
        // Session management
        .route("/reset-context", post(api_handler::reset_context))
        .with_state(api_state);

    router.layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}
