mod api;
mod config;

use anyhow::{Context, Result};
use para_staking::GatewayClient;
use poem::listener::TcpListener;
use poem::{Route, Server};
use poem_openapi::OpenApiService;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "staking_service=info,para_staking=info,poem=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "staking-config.toml".to_string());

    tracing::info!("Loading configuration from: {}", config_path);

    let config = config::ConfigFile::load(&config_path)?;

    let mut networks = HashMap::new();
    for network in &config.networks {
        let profile = network.profile()?;
        let client = GatewayClient::new(network.gateway_url.as_str(), network.timeout())
            .context(format!("Failed to create gateway client for {}", network.key))?;

        tracing::info!(
            "Network {}: {} ({} decimals, {}h eras, {:?} requests) via {}",
            profile.key,
            profile.symbol,
            profile.decimals,
            profile.era_length_hours,
            profile.request_storage,
            client.base_url()
        );

        networks.insert(profile.key.clone(), api::StakingNetwork { profile, client });
    }

    // Create API service
    let api = api::Api {
        networks: Arc::new(networks),
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let api_service = OpenApiService::new(api, "Parachain Staking", "0.1.0")
        .server(format!("http://{}", addr));

    let ui = api_service.scalar();
    let spec = api_service.spec_endpoint();

    let app = Route::new()
        .nest("/", api_service)
        .nest("/docs", ui)
        .nest("/spec", spec);

    tracing::info!("Server listening on {}", addr);
    tracing::info!("API documentation: http://{}/docs", addr);
    tracing::info!("OpenAPI spec: http://{}/spec", addr);

    Server::new(TcpListener::bind(&addr))
        .run_with_graceful_shutdown(app, shutdown_signal(), None)
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
