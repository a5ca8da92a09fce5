//! # Kanban Gateway Library
//!
//! HTTP edge for the kanban backend. Authenticates bearer tokens through the
//! identity service and turns REST calls into RPCs against the internal
//! services.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration from the environment
//! - `error`: status taxonomy to HTTP response mapping
//! - `middleware`: bearer authentication and security headers
//! - `pool`: supervised clients for the internal services
//! - `routes`: route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod pool;
pub mod routes;
