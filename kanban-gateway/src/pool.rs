/// Supervised client pool for the internal services
///
/// One slot per target service holds the typed client while the target is
/// ready. Each slot has a single supervisor task that owns every write to
/// it:
///
/// 1. dial: build the client and probe `GET /health`; on failure wait
///    [`SupervisorTiming::retry`] and try again, forever
/// 2. publish the client into the slot
/// 3. probe health every [`SupervisorTiming::health`]; when a probe fails,
///    empty the slot and go back to 1
///
/// Handlers never dial. They read the slot and get either the cached client
/// or [`PoolError::NotReady`], which the error layer turns into a 503.

use kanban_shared::contracts::board::BoardClient;
use kanban_shared::contracts::card::CardClient;
use kanban_shared::contracts::identity::IdentityClient;
use kanban_shared::contracts::list::ListClient;
use kanban_shared::rpc::client::RpcClient;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ServiceAddrs;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("{0} service is not ready")]
    NotReady(&'static str),

    #[error("cannot reach {service} service at {addr}: {reason}")]
    Dial {
        service: &'static str,
        addr: String,
        reason: String,
    },
}

/// Typed client the pool can build from a raw RPC client
pub trait ServiceClient: Clone + Send + Sync + 'static {
    const NAME: &'static str;

    fn from_rpc(rpc: RpcClient) -> Self;

    fn rpc(&self) -> &RpcClient;
}

impl ServiceClient for IdentityClient {
    const NAME: &'static str = "identity";

    fn from_rpc(rpc: RpcClient) -> Self {
        IdentityClient::new(rpc)
    }

    fn rpc(&self) -> &RpcClient {
        IdentityClient::rpc(self)
    }
}

impl ServiceClient for BoardClient {
    const NAME: &'static str = "board";

    fn from_rpc(rpc: RpcClient) -> Self {
        BoardClient::new(rpc)
    }

    fn rpc(&self) -> &RpcClient {
        BoardClient::rpc(self)
    }
}

impl ServiceClient for ListClient {
    const NAME: &'static str = "list";

    fn from_rpc(rpc: RpcClient) -> Self {
        ListClient::new(rpc)
    }

    fn rpc(&self) -> &RpcClient {
        ListClient::rpc(self)
    }
}

impl ServiceClient for CardClient {
    const NAME: &'static str = "card";

    fn from_rpc(rpc: RpcClient) -> Self {
        CardClient::new(rpc)
    }

    fn rpc(&self) -> &RpcClient {
        CardClient::rpc(self)
    }
}

/// Supervisor intervals
#[derive(Debug, Clone, Copy)]
pub struct SupervisorTiming {
    /// Wait between failed dials
    pub retry: Duration,

    /// Interval between health probes of a ready target
    pub health: Duration,
}

impl Default for SupervisorTiming {
    fn default() -> Self {
        Self {
            retry: Duration::from_secs(1),
            health: Duration::from_secs(5),
        }
    }
}

struct Slot<C> {
    addr: String,
    client: RwLock<Option<C>>,
}

impl<C: ServiceClient> Slot<C> {
    fn new(addr: &str) -> Arc<Self> {
        Arc::new(Self {
            addr: addr.to_string(),
            client: RwLock::new(None),
        })
    }

    async fn get(&self) -> Result<C, PoolError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(PoolError::NotReady(C::NAME))
    }

    async fn is_ready(&self) -> bool {
        self.client.read().await.is_some()
    }

    async fn replace(&self, client: Option<C>) {
        // the previous client, if any, is dropped with its connections
        *self.client.write().await = client;
    }
}

/// Readiness of every target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub identity: bool,
    pub board: bool,
    pub list: bool,
    pub card: bool,
}

impl Readiness {
    pub fn all_ready(&self) -> bool {
        self.identity && self.board && self.list && self.card
    }
}

#[derive(Clone)]
pub struct ClientPool {
    identity: Arc<Slot<IdentityClient>>,
    board: Arc<Slot<BoardClient>>,
    list: Arc<Slot<ListClient>>,
    card: Arc<Slot<CardClient>>,
    timeout: Duration,
    timing: SupervisorTiming,
}

impl ClientPool {
    /// Creates an empty pool; nothing is ready until [`ClientPool::spawn_supervisors`]
    pub fn new(addrs: &ServiceAddrs, timeout: Duration) -> Self {
        Self {
            identity: Slot::new(&addrs.identity),
            board: Slot::new(&addrs.board),
            list: Slot::new(&addrs.list),
            card: Slot::new(&addrs.card),
            timeout,
            timing: SupervisorTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: SupervisorTiming) -> Self {
        self.timing = timing;
        self
    }

    pub async fn identity(&self) -> Result<IdentityClient, PoolError> {
        self.identity.get().await
    }

    pub async fn board(&self) -> Result<BoardClient, PoolError> {
        self.board.get().await
    }

    pub async fn list(&self) -> Result<ListClient, PoolError> {
        self.list.get().await
    }

    pub async fn card(&self) -> Result<CardClient, PoolError> {
        self.card.get().await
    }

    pub async fn readiness(&self) -> Readiness {
        Readiness {
            identity: self.identity.is_ready().await,
            board: self.board.is_ready().await,
            list: self.list.is_ready().await,
            card: self.card.is_ready().await,
        }
    }

    /// Starts one supervisor per target; they stop when `shutdown` is cancelled
    pub fn spawn_supervisors(&self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            spawn(self.identity.clone(), self.timeout, self.timing, shutdown.clone()),
            spawn(self.board.clone(), self.timeout, self.timing, shutdown.clone()),
            spawn(self.list.clone(), self.timeout, self.timing, shutdown.clone()),
            spawn(self.card.clone(), self.timeout, self.timing, shutdown),
        ]
    }
}

fn spawn<C: ServiceClient>(
    slot: Arc<Slot<C>>,
    timeout: Duration,
    timing: SupervisorTiming,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        supervise(&slot, timeout, timing, &shutdown).await;
        slot.replace(None).await;
        tracing::debug!(target_service = C::NAME, "Supervisor stopped");
    })
}

async fn supervise<C: ServiceClient>(
    slot: &Slot<C>,
    timeout: Duration,
    timing: SupervisorTiming,
    shutdown: &CancellationToken,
) {
    loop {
        let client = loop {
            match dial::<C>(&slot.addr, timeout).await {
                Ok(client) => break client,
                Err(e) => {
                    tracing::warn!(target_service = C::NAME, error = %e, "Dial failed, retrying");
                    if !pause(shutdown, timing.retry).await {
                        return;
                    }
                }
            }
        };

        let probe = client.clone();
        slot.replace(Some(client)).await;
        tracing::info!(target_service = C::NAME, addr = %slot.addr, "Service ready");

        loop {
            if !pause(shutdown, timing.health).await {
                return;
            }
            if !probe.rpc().health(timeout).await {
                tracing::warn!(target_service = C::NAME, addr = %slot.addr, "Health check failed, reconnecting");
                slot.replace(None).await;
                break;
            }
        }
    }
}

async fn dial<C: ServiceClient>(addr: &str, timeout: Duration) -> Result<C, PoolError> {
    let rpc = RpcClient::new(addr, timeout).map_err(|status| PoolError::Dial {
        service: C::NAME,
        addr: addr.to_string(),
        reason: status.message,
    })?;

    if !rpc.health(timeout).await {
        return Err(PoolError::Dial {
            service: C::NAME,
            addr: addr.to_string(),
            reason: "health check failed".to_string(),
        });
    }

    Ok(C::from_rpc(rpc))
}

/// Sleeps for `delay`; false if shutdown came first
async fn pause(shutdown: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;

    fn addrs(addr: &str) -> ServiceAddrs {
        ServiceAddrs {
            identity: addr.to_string(),
            board: addr.to_string(),
            list: addr.to_string(),
            card: addr.to_string(),
        }
    }

    fn fast() -> SupervisorTiming {
        SupervisorTiming {
            retry: Duration::from_millis(50),
            health: Duration::from_millis(50),
        }
    }

    async fn wait_for(pool: &ClientPool, done: impl Fn(&Readiness) -> bool) -> Readiness {
        for _ in 0..100 {
            let readiness = pool.readiness().await;
            if done(&readiness) {
                return readiness;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        pool.readiness().await
    }

    #[tokio::test]
    async fn test_empty_pool_is_not_ready() {
        let pool = ClientPool::new(&addrs("127.0.0.1:1"), Duration::from_millis(100));

        assert!(matches!(pool.card().await, Err(PoolError::NotReady("card"))));
        assert!(!pool.readiness().await.all_ready());
    }

    #[tokio::test]
    async fn test_supervisor_connects_and_recovers() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server_stop = CancellationToken::new();
        let stop = server_stop.clone();
        let server = tokio::spawn(async move {
            let app = Router::new().route("/health", get(|| async { "ok" }));
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
                .unwrap();
        });

        let pool = ClientPool::new(&addrs(&addr.to_string()), Duration::from_millis(200)).with_timing(fast());
        let shutdown = CancellationToken::new();
        let handles = pool.spawn_supervisors(shutdown.clone());

        assert!(wait_for(&pool, Readiness::all_ready).await.all_ready());
        assert!(pool.board().await.is_ok());

        server_stop.cancel();
        server.await.unwrap();
        let down = wait_for(&pool, |r| !(r.identity || r.board || r.list || r.card)).await;
        assert!(!down.identity && !down.board && !down.list && !down.card);
        assert!(matches!(pool.list().await, Err(PoolError::NotReady("list"))));

        shutdown.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
