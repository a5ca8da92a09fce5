/// Middleware for the gateway
///
/// - `auth`: bearer authentication and per-request RPC metadata
/// - `security`: security response headers

pub mod auth;
pub mod security;
