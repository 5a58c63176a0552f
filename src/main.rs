// Main entry point - Dependency injection and server setup
use anyhow::Context;
use axum::{Router, routing::get};
use std::{net::SocketAddr, sync::Arc};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use broker_dashboard::application::metrics_service::MetricsService;
use broker_dashboard::application::step_planner::StepPlanner;
use broker_dashboard::infrastructure::config::{load_service_config, load_widgets_config};
use broker_dashboard::infrastructure::http_repository::HttpMetricsRepository;
use broker_dashboard::presentation::app_state::AppState;
use broker_dashboard::presentation::handlers::{get_chart, get_tiles, health_check};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let service_config = load_service_config().context("Failed to load config/service")?;
    let widgets_config = load_widgets_config().context("Failed to load config/widgets")?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(HttpMetricsRepository::new(service_config.broker_api.clone())?);

    // Create services (application layer)
    let planner = StepPlanner::new(service_config.planner.clone());
    let metrics_service = MetricsService::new(repository, planner, widgets_config);

    // Create application state
    let state = Arc::new(AppState { metrics_service });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/brokers/:broker/charts/:chart", get(get_chart))
        .route("/brokers/:broker/tiles", get(get_tiles))
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = service_config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", service_config.server.bind))?;
    tracing::info!(
        "Starting broker-dashboard on {} (broker API {})",
        addr,
        service_config.broker_api.base_url
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
