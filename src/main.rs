//! Assistant relay
//!
//! Streams answers from a hosted assistant back to HTTP callers as chunked
//! plain text, running the assistant's tool calls locally.

mod api;
mod config;
mod provider;
mod relay;
mod tools;

use api::{create_router, AppState};
use config::RelayConfig;
use provider::{AzureAssistantsClient, LoggingProvider};
use relay::{AssistantSettings, Orchestrator};
use std::net::SocketAddr;
use std::sync::Arc;
use tools::ToolRegistry;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assistant_relay=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    config.log_summary();

    // Provider and tools
    let client = AzureAssistantsClient::new(&config.provider)?;
    let provider = Arc::new(LoggingProvider::new(Arc::new(client)));
    let tools = Arc::new(ToolRegistry::standard(&config.email)?);
    tracing::info!(tools = ?tools.names(), "Tool registry initialized");

    let assistant = AssistantSettings::new(
        config.provider.assistant_id.clone(),
        &config.provider.deployment,
        &tools,
    );
    let state = AppState::new(Orchestrator::new(provider, tools, assistant));

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Assistant relay listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
