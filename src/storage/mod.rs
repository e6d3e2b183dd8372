//! Database access layer
//!
//! - `Database`: owns the single lazily opened connection and executes raw and
//!   prepared queries against it
//! - `Backend`: Postgres / MySQL selection and connection strings
//! - `Row` / `Value`: decoded results and bind parameters
//! - `migrations`, `users`: schema and the users table built on top

pub mod backend;
pub mod config;
pub mod connection;
pub mod database;
pub mod error;
pub mod migrations;
mod mysql;
pub mod placeholders;
mod postgres;
pub mod users;
pub mod value;

// Re-exports for convenience
pub use backend::{Backend, SslMode};
pub use config::DbConfig;
pub use connection::Connection;
pub use database::Database;
pub use error::{DbError, DbResult};
pub use value::{Row, Value};
