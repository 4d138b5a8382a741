//! Main binary entry point for the trigger relay service

use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trigger_relay_service::{RelayServiceConfig, TriggerRelayService};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = match RelayServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = init_tracing(&config.observability.log_level, &config.observability.log_format)
    {
        eprintln!("Failed to initialize tracing: {}", e);
        process::exit(1);
    }

    info!(
        "Starting trigger relay service v{}",
        env!("CARGO_PKG_VERSION")
    );

    log_settings(&config);

    let service = match TriggerRelayService::new(config) {
        Ok(service) => {
            info!("Trigger relay service initialized successfully");
            service
        }
        Err(e) => {
            error!("Failed to initialize service: {}", e);
            process::exit(1);
        }
    };

    // Blocks until shutdown
    if let Err(e) = service.start().await {
        error!("Service error: {}", e);
        process::exit(1);
    }

    info!("Trigger relay service shutdown complete");
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, log_format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_new(log_level).or_else(|_| EnvFilter::try_new("info"))?;

    match log_format {
        "json" => {
            // JSON formatted logs for production
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        "pretty" | "text" => {
            // Pretty formatted logs for development
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_file(true)
                        .with_line_number(true)
                        .with_target(false),
                )
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .try_init()?;
        }
    }

    Ok(())
}

fn log_settings(config: &RelayServiceConfig) {
    info!("Store API: {}", config.store_api.base_url);
    info!("Webhook route: POST {}", config.server.webhook_path);

    if config.store_api.access_token.is_none() {
        warn!("Store API access token not configured, requests go out unauthenticated");
    }

    if config.observability.metrics_enabled {
        info!(
            "Metrics collection: enabled at {}",
            config.observability.metrics_path
        );
    } else {
        info!("Metrics collection: disabled");
    }
}
