/*
 * Hermes - DEX quote aggregator
 * Main entry point for the service
 */

use hermes::{api, config::Config, service::AggregatorService};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Hermes DEX quote aggregator");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {e}");
        e
    })?;

    info!(venues = config.venues.len(), "Configuration loaded");

    let service = AggregatorService::from_config(&config).map_err(|e| {
        error!("Failed to initialize aggregator: {e}");
        e
    })?;

    let state = api::ApiState {
        service: Arc::new(service),
    };

    info!(port = config.port, "Starting API server");

    let rocket = api::create_rocket(state, config.port);
    rocket.launch().await?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hermes=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
