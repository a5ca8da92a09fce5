/// Handler and interceptor types
///
/// A [`Handler`] takes a decoded request and yields a JSON response or a
/// [`Status`]. An [`Interceptor`] wraps the next handler into a new one; a
/// chain is an ordered list of interceptors folded around a terminal handler,
/// first element outermost.
///
/// # Example
///
/// ```
/// use kanban_shared::rpc::chain::{compose, handler_fn, Handler, Interceptor};
/// use std::sync::Arc;
///
/// struct Deny;
///
/// impl Interceptor for Deny {
///     fn wrap(&self, _next: Handler) -> Handler {
///         handler_fn(|_req| async { Err(kanban_shared::error::Status::forbidden("no")) })
///     }
/// }
///
/// let terminal = handler_fn(|_req| async { Ok(serde_json::json!({})) });
/// let chain = compose(&[Arc::new(Deny) as Arc<dyn Interceptor>], terminal);
/// ```

use super::context::RequestContext;
use super::metadata::Metadata;
use crate::error::StatusResult;
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// One inbound call as seen by interceptors and handlers
#[derive(Debug, Clone)]
pub struct RpcRequest {
    /// Fully qualified method name, e.g. `kanban.board.BoardService/CreateBoard`
    pub method: String,
    pub metadata: Metadata,
    pub body: Value,
    pub context: RequestContext,
}

pub type HandlerFuture = BoxFuture<'static, StatusResult<Value>>;

pub type Handler = Arc<dyn Fn(RpcRequest) -> HandlerFuture + Send + Sync>;

/// Wraps `next` into a new handler
pub trait Interceptor: Send + Sync + 'static {
    fn wrap(&self, next: Handler) -> Handler;
}

/// Lifts an async closure into a [`Handler`]
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(RpcRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StatusResult<Value>> + Send + 'static,
{
    Arc::new(move |req| Box::pin(f(req)))
}

/// Folds interceptors around `terminal`; `interceptors[0]` runs first
pub fn compose(interceptors: &[Arc<dyn Interceptor>], terminal: Handler) -> Handler {
    interceptors
        .iter()
        .rev()
        .fold(terminal, |next, interceptor| interceptor.wrap(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct Trace {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Interceptor for Trace {
        fn wrap(&self, next: Handler) -> Handler {
            let name = self.name;
            let log = self.log.clone();
            handler_fn(move |req| {
                let next = next.clone();
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(name);
                    next(req).await
                }
            })
        }
    }

    fn request() -> RpcRequest {
        RpcRequest {
            method: "svc/Method".to_string(),
            metadata: Metadata::new(),
            body: Value::Null,
            context: RequestContext::new("r", Instant::now()),
        }
    }

    #[tokio::test]
    async fn test_compose_runs_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let interceptors: Vec<Arc<dyn Interceptor>> = vec![
            Arc::new(Trace { name: "validate", log: log.clone() }),
            Arc::new(Trace { name: "authorize", log: log.clone() }),
        ];
        let inner_log = log.clone();
        let terminal = handler_fn(move |_req| {
            let log = inner_log.clone();
            async move {
                log.lock().unwrap().push("handler");
                Ok(Value::Bool(true))
            }
        });

        let chain = compose(&interceptors, terminal);
        assert_eq!(chain(request()).await.unwrap(), Value::Bool(true));
        assert_eq!(*log.lock().unwrap(), vec!["validate", "authorize", "handler"]);
    }
}
