//! Handler types and dependencies

use std::sync::Arc;

use crate::storage::Database;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone, Debug)]
pub struct HandlerDeps {
    pub db: Arc<Database>,
    pub bot_name: String,
}

impl HandlerDeps {
    pub fn new(db: Arc<Database>, bot_name: impl Into<String>) -> Self {
        Self {
            db,
            bot_name: bot_name.into(),
        }
    }
}
