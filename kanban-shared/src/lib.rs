//! # Kanban Shared Library
//!
//! Types, repositories and plumbing shared by the kanban gateway and the
//! internal services (identity, board, list, card).
//!
//! ## Module Organization
//!
//! - `error`: status taxonomy carried across every boundary
//! - `config`: environment helpers
//! - `db`: connection pool and migrations
//! - `models`: database models and their queries
//! - `auth`: password hashing, JWT, email and refresh token helpers
//! - `authz`: board roles and the role oracle
//! - `ordering`: dense position ordering for lists and cards
//! - `rpc`: internal RPC fabric (metadata, interceptor chain, server, client)
//! - `contracts`: per-service method names, messages and typed clients
//! - `events`: topic event bus (publisher and consumer loop)

pub mod auth;
pub mod authz;
pub mod config;
pub mod contracts;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod ordering;
pub mod rpc;

/// Current version of the kanban shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
