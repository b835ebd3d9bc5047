//! Tessera Database: SurrealDB connection management, schema
//! migrations and implementations of the `tessera-core` repository
//! traits.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Error types ([`DbError`])
//! - Repository implementations bundled as [`SurrealStore`]

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::SurrealStore;
pub use schema::{run_migrations, schema_v1};
