//! Configuration, errors and logging shared by the bot and the CLI

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use error::{AppError, AppResult};
pub use logging::init_logger;
