//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, start_reply, HandlerDeps, HandlerError, FAILURE_TEXT, LOCKED_TEXT};
pub use teloxide::Bot;
