use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use hestia::adapters::api_handler::ApiState;
use hestia::adapters::health_handler::HealthHandler;
use hestia::adapters::metrics_handler::MetricsCollector;
use hestia::adapters::resy_client::ResyClient;
use hestia::adapters::venue_index::VenueIndexClient;
use hestia::agent::llm::{LlmProvider, OpenAiProvider};
use hestia::agent::{ActionRegistry, Orchestrator, Session};
use hestia::cli::Cli;
use hestia::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::new(&cli)?;
    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting Hestia reservation agent on {}:{}", host, port);

    // Collaborator clients
    let search = Arc::new(VenueIndexClient::new(&settings.search)?);
    let reservations = Arc::new(ResyClient::new(&settings.resy)?);
    let llm = Arc::new(OpenAiProvider::new(&settings.llm)?);
    info!(model = llm.model(), "decision provider ready");

    // Agent core: one process-wide session, injected into the loop
    let metrics = Arc::new(MetricsCollector::new()?);
    let registry = Arc::new(ActionRegistry::new(search, reservations));
    let session = Arc::new(Session::new(Duration::from_secs(
        settings.agent.cache_ttl_seconds,
    )));
    let orchestrator = Arc::new(Orchestrator::new(
        llm,
        registry.clone(),
        settings.agent.clone(),
        metrics.clone(),
    ));

    let api_state = ApiState {
        orchestrator,
        registry,
        session,
        metrics: metrics.clone(),
    };
    let health_handler = Arc::new(HealthHandler::new());

    let app = hestia::create_app(api_state, health_handler, metrics);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
