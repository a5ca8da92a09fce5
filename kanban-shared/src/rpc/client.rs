/// RPC client
///
/// One [`RpcClient`] per target service. The per-call timeout is the
/// remaining budget carried in the metadata, or the client default; the
/// budget is forwarded as `x-deadline-ms` so the server enforces the same
/// limit. Transport failures and timeouts surface as `unavailable`.
///
/// # Example
///
/// ```no_run
/// use kanban_shared::rpc::client::RpcClient;
/// use kanban_shared::rpc::metadata::Metadata;
/// use serde_json::{json, Value};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), kanban_shared::error::Status> {
/// let client = RpcClient::new("http://127.0.0.1:50052", Duration::from_secs(5))?;
/// let md = Metadata::new().with_user(1);
/// let board: Value = client
///     .call("kanban.board.BoardService/CreateBoard", &md, &json!({"name": "B1"}))
///     .await?;
/// # Ok(())
/// # }
/// ```

use super::metadata::Metadata;
use crate::error::{Status, StatusResult};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RpcClient {
    /// Builds a client for `base_url` (`http://host:port`, or bare `host:port`)
    pub fn new(base_url: &str, timeout: Duration) -> StatusResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Status::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: normalize_base_url(base_url),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Calls `method` (fully qualified, `Service/Method`)
    pub async fn call<Req, Resp>(&self, method: &str, metadata: &Metadata, request: &Req) -> StatusResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let budget = metadata
            .deadline_ms
            .map(Duration::from_millis)
            .unwrap_or(self.timeout);
        if budget.is_zero() {
            return Err(Status::unavailable("deadline exceeded"));
        }

        let mut builder = self
            .http
            .post(format!("{}/rpc/{}", self.base_url, method))
            .timeout(budget)
            .json(request);
        for (name, value) in metadata.header_pairs(budget) {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| transport_error(method, e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| transport_error(method, e))?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|e| {
                Status::internal(format!("malformed response from {}: {}", method, e))
            });
        }

        // non-2xx bodies carry a status envelope; anything else is a broken peer
        Err(serde_json::from_slice::<Status>(&bytes).unwrap_or_else(|_| {
            Status::internal(format!("{} answered HTTP {} without a status", method, status.as_u16()))
        }))
    }

    /// True if the service answers `GET /health` within `timeout`
    pub async fn health(&self, timeout: Duration) -> bool {
        match self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(target_url = %self.base_url, error = %e, "Health probe failed");
                false
            }
        }
    }
}

fn transport_error(method: &str, err: reqwest::Error) -> Status {
    if err.is_timeout() {
        Status::unavailable(format!("{}: deadline exceeded", method))
    } else {
        Status::unavailable(format!("{}: {}", method, err))
    }
}

fn normalize_base_url(addr: &str) -> String {
    let addr = addr.trim().trim_end_matches('/');
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Code;
    use crate::rpc::chain::handler_fn;
    use crate::rpc::server::RpcServer;
    use serde_json::{json, Value};

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("localhost:50051"), "http://localhost:50051");
        assert_eq!(normalize_base_url("http://board:50052/"), "http://board:50052");
    }

    async fn spawn_echo() -> String {
        let router = RpcServer::new("kanban.echo.EchoService")
            .method(
                "kanban.echo.EchoService/Echo",
                handler_fn(|req| async move {
                    Ok(json!({ "body": req.body, "user": req.metadata.user_id }))
                }),
            )
            .method(
                "kanban.echo.EchoService/Fail",
                handler_fn(|_req| async { Err(Status::conflict("board must be archived")) }),
            )
            .into_router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr.to_string()
    }

    #[tokio::test]
    async fn test_call_round_trip_and_status() {
        let addr = spawn_echo().await;
        let client = RpcClient::new(&addr, Duration::from_secs(2)).unwrap();
        let md = Metadata::new().with_user(3);

        let out: Value = client
            .call("kanban.echo.EchoService/Echo", &md, &json!({"x": 1}))
            .await
            .unwrap();
        assert_eq!(out["body"]["x"], 1);
        assert_eq!(out["user"], "3");

        let err = client
            .call::<_, Value>("kanban.echo.EchoService/Fail", &md, &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err, Status::conflict("board must be archived"));

        assert!(client.health(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_unreachable_is_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RpcClient::new(&addr.to_string(), Duration::from_millis(500)).unwrap();
        let err = client
            .call::<_, Value>("kanban.echo.EchoService/Echo", &Metadata::new(), &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code, Code::Unavailable);
        assert!(!client.health(Duration::from_millis(200)).await);
    }
}
