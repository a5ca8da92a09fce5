//! # Kanban Gateway
//!
//! HTTP edge server. Dials the internal services in the background and
//! serves REST until interrupted; routes whose backend is not ready answer
//! 503 in the meantime.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p kanban-gateway
//! ```

use anyhow::Context;
use kanban_gateway::{
    app::{build_router, AppState},
    config::Config,
    pool::ClientPool,
};
use kanban_shared::config::load_dotenv;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kanban_gateway=debug,tower_http=debug".into());
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

    tracing::info!("Kanban gateway v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let addr = config.bind_address();

    let shutdown = CancellationToken::new();
    let clients = ClientPool::new(&config.services, config.rpc_timeout);
    let supervisors = clients.spawn_supervisors(shutdown.clone());

    let app = build_router(AppState::new(config, clients));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    let signal = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown signal received"),
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
            }
            signal.cancel();
        })
        .await;

    shutdown.cancel();
    for supervisor in supervisors {
        if let Err(e) = supervisor.await {
            tracing::warn!(error = %e, "Supervisor ended abnormally");
        }
    }

    served.context("server error")
}
