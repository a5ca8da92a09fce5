/// RPC server: method registry, interceptor chain and HTTP binding
///
/// Each registered method is composed with the service's interceptors once,
/// at router build time. Requests arrive as `POST /rpc/<service>/<method>`;
/// the whole chain runs under the caller's deadline (`x-deadline-ms`, or the
/// server default), and expiry is reported as `unavailable`.
///
/// # Example
///
/// ```no_run
/// use kanban_shared::rpc::chain::handler_fn;
/// use kanban_shared::rpc::server::{serve, RpcServer};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> std::io::Result<()> {
/// let router = RpcServer::new("kanban.echo.EchoService")
///     .method("kanban.echo.EchoService/Echo", handler_fn(|req| async move { Ok(req.body) }))
///     .into_router();
///
/// serve(router, "127.0.0.1:50060".parse().unwrap(), CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```

use super::chain::{compose, handler_fn, Handler, Interceptor, RpcRequest};
use super::context::RequestContext;
use super::metadata::Metadata;
use crate::error::{Code, FieldViolation, Status};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Budget applied when the caller sends no `x-deadline-ms`
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

pub struct RpcServer {
    service: &'static str,
    handlers: Vec<(&'static str, Handler)>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    default_deadline: Duration,
}

struct ServerState {
    service: &'static str,
    handlers: HashMap<&'static str, Handler>,
    fallback: Handler,
    default_deadline: Duration,
}

impl RpcServer {
    pub fn new(service: &'static str) -> Self {
        Self {
            service,
            handlers: Vec::new(),
            interceptors: Vec::new(),
            default_deadline: DEFAULT_DEADLINE,
        }
    }

    /// Appends an interceptor; interceptors run in the order added
    pub fn interceptor(mut self, interceptor: impl Interceptor) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn method(mut self, name: &'static str, handler: Handler) -> Self {
        self.handlers.push((name, handler));
        self
    }

    pub fn default_deadline(mut self, deadline: Duration) -> Self {
        self.default_deadline = deadline;
        self
    }

    /// Registered method names
    pub fn methods(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|(name, _)| *name).collect()
    }

    pub fn into_router(self) -> Router {
        let interceptors = self.interceptors;
        let handlers = self
            .handlers
            .into_iter()
            .map(|(name, handler)| (name, compose(&interceptors, handler)))
            .collect();

        // unregistered methods still pass through the chain, so authorization
        // answers them uniformly
        let fallback = compose(
            &interceptors,
            handler_fn(|_req| async { Err(Status::forbidden("unknown method")) }),
        );

        let state = Arc::new(ServerState {
            service: self.service,
            handlers,
            fallback,
            default_deadline: self.default_deadline,
        });

        Router::new()
            .route("/health", get(health))
            .route("/rpc/:service/:method", post(dispatch))
            .with_state(state)
    }
}

async fn health(State(state): State<Arc<ServerState>>) -> Json<Value> {
    Json(json!({ "status": "ok", "service": state.service }))
}

async fn dispatch(
    State(state): State<Arc<ServerState>>,
    Path((service, method)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let method = format!("{}/{}", service, method);
    let metadata = Metadata::from_headers(&headers);
    let request_id = metadata
        .request_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let budget = metadata
        .deadline_ms
        .map(Duration::from_millis)
        .unwrap_or(state.default_deadline);

    let body = match decode_body(&body) {
        Ok(body) => body,
        Err(status) => return status_response(&method, &request_id, status),
    };

    let handler = state
        .handlers
        .get(method.as_str())
        .unwrap_or(&state.fallback)
        .clone();

    let request = RpcRequest {
        method: method.clone(),
        metadata,
        body,
        context: RequestContext::new(request_id.clone(), Instant::now() + budget),
    };

    let started = Instant::now();
    let outcome = match tokio::time::timeout(budget, handler(request)).await {
        Ok(result) => result,
        Err(_) => Err(Status::unavailable("deadline exceeded")),
    };

    match outcome {
        Ok(value) => {
            tracing::debug!(
                method = %method,
                request_id = %request_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "RPC completed"
            );
            (StatusCode::OK, Json(value)).into_response()
        }
        Err(status) => status_response(&method, &request_id, status),
    }
}

fn decode_body(body: &[u8]) -> Result<Value, Status> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| {
        Status::validation(vec![FieldViolation::new("body", "malformed", e.to_string())])
    })
}

fn status_response(method: &str, request_id: &str, status: Status) -> Response {
    match status.code {
        Code::Internal => {
            tracing::error!(method = %method, request_id = %request_id, error = %status, "RPC failed")
        }
        Code::Unavailable => {
            tracing::warn!(method = %method, request_id = %request_id, error = %status, "RPC unavailable")
        }
        _ => tracing::debug!(method = %method, request_id = %request_id, error = %status, "RPC rejected"),
    }

    let code = StatusCode::from_u16(status.code.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, Json(status)).into_response()
}

/// Binds `addr` and serves `router` until `shutdown` is cancelled
pub async fn serve(router: Router, addr: SocketAddr, shutdown: CancellationToken) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "RPC server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const ECHO: &str = "kanban.echo.EchoService/Echo";
    const SLOW: &str = "kanban.echo.EchoService/Slow";

    fn router() -> Router {
        RpcServer::new("kanban.echo.EchoService")
            .method(ECHO, handler_fn(|req| async move { Ok(req.body) }))
            .method(
                SLOW,
                handler_fn(|_req| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Value::Null)
                }),
            )
            .into_router()
    }

    async fn call(router: Router, method: &str, body: &'static str, deadline: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/rpc/{}", method))
            .header("content-type", "application/json");
        if let Some(ms) = deadline {
            builder = builder.header("x-deadline-ms", ms);
        }
        let response = router
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_echo() {
        let (status, body) = call(router(), ECHO, r#"{"name":"B1"}"#, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "B1");
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_object() {
        let (status, body) = call(router(), ECHO, "", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (status, body) = call(router(), ECHO, "{not json", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_failed");
        assert_eq!(body["details"][0]["field"], "body");
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (status, body) = call(router(), "kanban.echo.EchoService/Nope", "{}", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "unknown method");
    }

    #[tokio::test]
    async fn test_deadline_is_enforced() {
        let (status, body) = call(router(), SLOW, "{}", Some("20")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "unavailable");
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
