//! Telegram bot handler tree
//!
//! The same schema is used by polling and webhook mode.

mod commands;
mod schema;
mod types;

pub use commands::{start_reply, FAILURE_TEXT, LOCKED_TEXT};
pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
