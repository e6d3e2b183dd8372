//! tgbase - Telegram bot backed by a single PostgreSQL or MySQL connection
//!
//! # Module Structure
//!
//! - `core`: configuration, errors and logging
//! - `storage`: connection manager, query execution, migrations and users
//! - `telegram`: bot commands and dispatcher schema
//! - `cli`: command line interface

pub mod cli;
pub mod core;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use storage::{Backend, Database, DbConfig, DbError, DbResult, Row, Value};
