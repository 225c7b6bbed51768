mod bot;
mod config;
mod error;
mod phone;
mod platform;
mod supervisor;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::platform::telegram::TelegramTransport;
use crate::supervisor::Supervisor;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,phonelinks_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Optional config file with [polling] overrides
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    if let Some(path) = &config_path {
        info!("Loading configuration from: {}", path.display());
    }
    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let policy = config.polling.retry_policy();
    info!("Configuration loaded successfully");
    info!(
        "  Retry: initial {:?}, max {:?}, {} attempts",
        policy.initial_delay, policy.max_delay, policy.max_retries
    );
    info!("  Request timeout: {:?}", config.polling.request_timeout());

    let (transport, events) =
        match TelegramTransport::new(&config.telegram.bot_token, &config.polling) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Failed to create Telegram transport: {:#}", e);
                return ExitCode::FAILURE;
            }
        };

    let supervisor = Supervisor::new(Arc::new(transport), events, policy);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match supervisor.run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}
