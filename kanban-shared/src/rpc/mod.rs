/// Internal RPC fabric
///
/// Services talk to each other with JSON messages over HTTP:
/// `POST /rpc/<fully.qualified.Service>/<Method>`. Responses are either the
/// response message (HTTP 200) or a [`Status`](crate::error::Status)
/// envelope with the matching HTTP code.
///
/// # Modules
///
/// - [`metadata`]: `userid`, `boardid`, request id and deadline headers
/// - [`context`]: request-scoped values set by interceptors
/// - [`chain`]: handler and interceptor types, chain composition
/// - [`validate`]: per-method request shape validation
/// - [`authorize`]: method policy tables and the authorization interceptor
/// - [`server`]: method registry and HTTP binding
/// - [`client`]: outgoing calls with deadline propagation
/// - [`typed`]: typed handler adapters

pub mod authorize;
pub mod chain;
pub mod client;
pub mod context;
pub mod metadata;
pub mod server;
pub mod typed;
pub mod validate;

pub use chain::{Handler, Interceptor, RpcRequest};
pub use client::RpcClient;
pub use context::RequestContext;
pub use metadata::Metadata;
