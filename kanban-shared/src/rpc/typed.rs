/// Typed handler adapters
///
/// Service handlers are plain async functions over typed messages:
///
/// ```no_run
/// use kanban_shared::error::StatusResult;
/// use kanban_shared::rpc::context::RequestContext;
/// use kanban_shared::rpc::typed::unary;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone)]
/// struct State;
///
/// #[derive(Deserialize)]
/// struct Ping { n: i64 }
///
/// #[derive(Serialize)]
/// struct Pong { n: i64 }
///
/// async fn ping(_state: State, _ctx: RequestContext, req: Ping) -> StatusResult<Pong> {
///     Ok(Pong { n: req.n + 1 })
/// }
///
/// let handler = unary(State, ping);
/// ```

use super::chain::{handler_fn, Handler};
use super::context::RequestContext;
use super::validate::decode;
use crate::error::{Status, StatusResult};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;

/// Wraps `f` into a [`Handler`] that decodes `Req` and encodes `Resp`
pub fn unary<S, Req, Resp, F, Fut>(state: S, f: F) -> Handler
where
    S: Clone + Send + Sync + 'static,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    F: Fn(S, RequestContext, Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = StatusResult<Resp>> + Send + 'static,
{
    handler_fn(move |req| {
        let state = state.clone();
        let f = f.clone();
        async move {
            let message: Req = decode(&req.body)?;
            let response = f(state, req.context, message).await?;
            serde_json::to_value(response)
                .map_err(|e| Status::internal(format!("failed to encode response: {}", e)))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::chain::RpcRequest;
    use crate::rpc::metadata::Metadata;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Add {
        a: i64,
        b: i64,
    }

    #[derive(Serialize)]
    struct Sum {
        sum: i64,
        offset: i64,
    }

    async fn add(offset: i64, _ctx: RequestContext, req: Add) -> StatusResult<Sum> {
        Ok(Sum { sum: req.a + req.b + offset, offset })
    }

    #[tokio::test]
    async fn test_unary_decodes_and_encodes() {
        let handler = unary(10i64, add);
        let out = handler(RpcRequest {
            method: "m".to_string(),
            metadata: Metadata::new(),
            body: json!({"a": 1, "b": 2}),
            context: RequestContext::new("r", tokio::time::Instant::now()),
        })
        .await
        .unwrap();

        assert_eq!(out, json!({"sum": 13, "offset": 10}));
    }
}
