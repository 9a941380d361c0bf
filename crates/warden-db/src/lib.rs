//! Warden Database: SurrealDB persistence for the RBAC engine.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repository implementations of the `warden-core` traits
//!   ([`repository`])
//! - Error types ([`DbError`])

mod connection;
mod error;
mod filter;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
