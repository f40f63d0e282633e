// API Server Binary Entry Point
//
// Purpose: Start the Axum API server for consumption, emissions and diet endpoints
// Usage: cargo run --features api --bin api_server

use food_emissions::{AppState, Config, create_router};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "food_emissions=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");

    // Configuration from environment variables
    let config = Config::from_env()?;

    tracing::info!("Configuration:");
    tracing::info!("  DATA_DIR: {:?}", config.data_dir);
    tracing::info!("  LUKE_API_URL: {}", config.luke_api_url);
    tracing::info!("  YEARS: {}-{}", config.years.start, config.years.end);
    tracing::info!("  PORT: {}", config.port);

    // Initialize application state (loads emissions, warms consumption cache)
    tracing::info!("Initializing application state...");
    let state = AppState::new(&config).await?;
    tracing::info!("Application state initialized successfully");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await?;

    Ok(())
}
