//! # Kanban Services
//!
//! One binary for the identity, board, list and card services. The service is
//! chosen by the first argument; everything else comes from the environment.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p kanban-services -- board
//! ```

use anyhow::Context;
use kanban_services::config::{ServiceConfig, ServiceKind};
use kanban_services::runtime;
use kanban_shared::config::load_dotenv;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kanban_services=debug,kanban_shared=debug".into());
    let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    let kind: ServiceKind = std::env::args()
        .nth(1)
        .context("usage: kanban-services <identity|board|list|card>")?
        .parse()?;
    let config = ServiceConfig::from_env(kind)?;

    tracing::info!(
        service = %kind,
        "Kanban services v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                signal.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Cannot listen for shutdown signal"),
        }
    });

    runtime::run(config, shutdown).await
}
