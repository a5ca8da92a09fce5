#![allow(dead_code)]

/// Shared fixtures for gateway integration tests
///
/// Starts in-process fake identity and board services on `127.0.0.1:0`
/// and a gateway router whose pool points at them. The list and card
/// services point at a closed port, so they never become ready.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use kanban_gateway::app::{build_router, AppState};
use kanban_gateway::config::{Config, ServerConfig, ServiceAddrs};
use kanban_gateway::pool::{ClientPool, SupervisorTiming};
use kanban_shared::contracts::{board, identity};
use kanban_shared::error::Status;
use kanban_shared::rpc::chain::handler_fn;
use kanban_shared::rpc::server::RpcServer;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const GOOD_TOKEN: &str = "good-token";
pub const CALLER_ID: i64 = 7;

pub struct TestGateway {
    pub app: Router,
    pub clients: ClientPool,
    shutdown: CancellationToken,
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn fake_identity() -> Router {
    RpcServer::new(identity::SERVICE)
        .method(
            identity::method::AUTHENTICATE,
            handler_fn(|req| async move {
                match req.body["token"].as_str() {
                    Some(GOOD_TOKEN) => Ok(json!({ "userId": CALLER_ID })),
                    _ => Err(Status::unauthenticated("invalid token")),
                }
            }),
        )
        .into_router()
}

fn fake_board() -> Router {
    RpcServer::new(board::SERVICE)
        .method(
            board::method::CREATE_BOARD,
            handler_fn(|req| async move {
                if req.metadata.user_id.as_deref() != Some("7") {
                    return Err(Status::forbidden("caller missing from metadata"));
                }
                Ok(json!({
                    "id": 1,
                    "name": req.body["name"],
                    "visibility": "private",
                    "archived": false,
                    "createdAt": "2025-01-01T00:00:00Z",
                    "updatedAt": "2025-01-01T00:00:00Z",
                }))
            }),
        )
        .method(
            board::method::DELETE_BOARD,
            handler_fn(|req| async move {
                if req.metadata.board_id.as_deref() != Some("1") {
                    return Err(Status::forbidden("board scope missing"));
                }
                Err(Status::conflict("board must be archived before deletion"))
            }),
        )
        .into_router()
}

async fn spawn(router: Router, shutdown: CancellationToken) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .unwrap();
    });
    addr.to_string()
}

fn closed_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

impl TestGateway {
    pub async fn start() -> Self {
        let shutdown = CancellationToken::new();
        let identity = spawn(fake_identity(), shutdown.clone()).await;
        let board = spawn(fake_board(), shutdown.clone()).await;
        let dead = closed_addr();

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            services: ServiceAddrs {
                identity,
                board,
                list: dead.clone(),
                card: dead,
            },
            rpc_timeout: Duration::from_secs(2),
        };

        let clients = ClientPool::new(&config.services, Duration::from_millis(500)).with_timing(
            SupervisorTiming {
                retry: Duration::from_millis(50),
                health: Duration::from_millis(200),
            },
        );
        clients.spawn_supervisors(shutdown.clone());

        for _ in 0..100 {
            let readiness = clients.readiness().await;
            if readiness.identity && readiness.board {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Self {
            app: build_router(AppState::new(config, clients.clone())),
            clients,
            shutdown,
        }
    }

    /// Sends a request, with the good bearer token when `auth` is set
    pub async fn send(&self, method: &str, uri: &str, auth: bool, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if auth {
            builder = builder.header("authorization", format!("Bearer {}", GOOD_TOKEN));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self.app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
