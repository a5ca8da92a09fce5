/// Service bootstrap
///
/// Builds the long-lived dependencies for one service (database pool, role
/// oracle, event publisher, consumer) and serves its RPC router until the
/// shutdown token is cancelled.

use crate::board::{self, BoardState};
use crate::card::{self, consumer::CardEvents, CardState};
use crate::config::{ServiceConfig, ServiceKind};
use crate::identity::{self, mailer::LogMailer, IdentityState};
use crate::list::{self, consumer::ListEvents, ListState};
use anyhow::{Context, Result};
use kanban_shared::authz::oracle::RoleOracle;
use kanban_shared::contracts::identity::IdentityClient;
use kanban_shared::db::{migrations, pool};
use kanban_shared::events::rabbitmq::{run_consumer, LapinPublisher};
use kanban_shared::events::{EventBusConfig, EventHandler, EventPublisher};
use kanban_shared::rpc::client::RpcClient;
use kanban_shared::rpc::server::{serve, RpcServer};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Delay before a failed consumer reconnects
const CONSUMER_BACKOFF: Duration = Duration::from_secs(1);

pub async fn run(config: ServiceConfig, shutdown: CancellationToken) -> Result<()> {
    tracing::info!(config = %config.summary(), "Starting service");

    let db = pool::create_pool(config.database.clone())
        .await
        .context("failed to connect to the database")?;

    if config.run_migrations {
        migrations::run_migrations(&db)
            .await
            .context("failed to apply migrations")?;
    }

    let (server, consumer) = match config.kind {
        ServiceKind::Identity => {
            let secret = config
                .secret_key
                .clone()
                .context("SECRET_KEY is required for the identity service")?;
            let state = IdentityState::new(db.clone(), secret, Arc::new(LogMailer));
            (identity::rpc_server(state), None)
        }
        ServiceKind::Board => {
            let state = BoardState {
                pool: db.clone(),
                publisher: publisher(&config).await?,
                oracle: oracle(&config)?,
            };
            (board::rpc_server(state), None)
        }
        ServiceKind::List => {
            let state = ListState {
                pool: db.clone(),
                publisher: publisher(&config).await?,
                oracle: oracle(&config)?,
            };
            let events: Arc<dyn EventHandler> = Arc::new(ListEvents::new(db.clone()));
            (list::rpc_server(state), Some(events))
        }
        ServiceKind::Card => {
            let state = CardState {
                pool: db.clone(),
                publisher: publisher(&config).await?,
                oracle: oracle(&config)?,
            };
            let events: Arc<dyn EventHandler> = Arc::new(CardEvents::new(db.clone()));
            (card::rpc_server(state), Some(events))
        }
    };

    let consumer_task = match (consumer, config.event_bus.clone()) {
        (Some(handler), Some(bus)) => Some(spawn_consumer(config.kind, bus, handler, shutdown.clone())),
        _ => None,
    };

    let router = server_router(server, &config);
    let served = serve(router, config.addr, shutdown.clone()).await;

    shutdown.cancel();
    if let Some(task) = consumer_task {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Consumer task ended abnormally");
        }
    }
    pool::close_pool(db).await;

    served.with_context(|| format!("{} service failed on {}", config.kind, config.addr))
}

fn server_router(server: RpcServer, config: &ServiceConfig) -> axum::Router {
    tracing::debug!(service = %config.kind, methods = server.methods().len(), "Router built");
    server.default_deadline(config.rpc_timeout).into_router()
}

async fn publisher(config: &ServiceConfig) -> Result<Arc<dyn EventPublisher>> {
    let bus = config
        .event_bus
        .as_ref()
        .context("RABBITMQ_URL is required for this service")?;
    let publisher = LapinPublisher::connect(bus)
        .await
        .context("failed to connect to the event bus")?;
    Ok(Arc::new(publisher))
}

fn oracle(config: &ServiceConfig) -> Result<Arc<dyn RoleOracle>> {
    let addr = config
        .identity_addr
        .as_deref()
        .context("USER_SERVICE_ADDR is required for this service")?;
    let rpc = RpcClient::new(addr, config.rpc_timeout)
        .map_err(|status| anyhow::anyhow!("invalid identity service address {}: {}", addr, status))?;
    Ok(Arc::new(IdentityClient::new(rpc)))
}

/// Keeps one consumer running until shutdown, reconnecting after broker failures
fn spawn_consumer(
    kind: ServiceKind,
    bus: EventBusConfig,
    handler: Arc<dyn EventHandler>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let tag = format!("{}-{}", kind, Uuid::new_v4());
        while !shutdown.is_cancelled() {
            match run_consumer(&bus, &tag, handler.clone(), shutdown.clone()).await {
                Ok(()) => break,
                Err(e) => {
                    tracing::error!(consumer = %tag, error = %e, "Event consumer failed, reconnecting");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(CONSUMER_BACKOFF) => {}
                    }
                }
            }
        }
        tracing::info!(consumer = %tag, "Event consumer stopped");
    })
}
