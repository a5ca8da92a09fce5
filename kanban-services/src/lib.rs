//! # Kanban Services Library
//!
//! The four internal services behind the gateway. Each exposes its methods
//! over the internal RPC fabric from `kanban-shared`, guarded by shape
//! validation and board-role authorization.
//!
//! ## Modules
//!
//! - `identity`: users, credentials, tokens and the board role oracle
//! - `board`: boards, memberships and labels
//! - `list`: lists and their ordering; cascades `board.delete`
//! - `card`: cards, labels on cards, comments and attachments; cascades
//!   `board.delete`, `list.delete` and `card.delete`
//! - `config`: per-service configuration from the environment
//! - `runtime`: wiring and serving one service

pub mod board;
pub mod card;
pub mod config;
pub mod identity;
pub mod list;
pub mod runtime;

mod support;
