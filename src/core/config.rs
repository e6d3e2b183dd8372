use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Bot token
/// Read from TELEGRAM_TOKEN or BOT_TOKEN environment variable
pub static TELEGRAM_TOKEN: Lazy<String> =
    Lazy::new(|| non_empty("TELEGRAM_TOKEN").or_else(|| non_empty("BOT_TOKEN")).unwrap_or_default());

/// Bot display name used in greetings
/// Read from BOT_NAME environment variable
pub static BOT_NAME: Lazy<String> = Lazy::new(|| non_empty("BOT_NAME").unwrap_or_else(|| "tgbase".to_string()));

/// Custom Bot API server (local telegram-bot-api or the test environment)
/// Read from BOT_API_URL environment variable
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| non_empty("BOT_API_URL"));

/// Public URL Telegram posts updates to in webhook mode
/// Read from WEBHOOK_URL environment variable
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| non_empty("WEBHOOK_URL"));

/// Local address the webhook server binds to
/// Read from WEBHOOK_ADDR environment variable
/// Default: 0.0.0.0:8443
pub static WEBHOOK_ADDR: Lazy<String> =
    Lazy::new(|| non_empty("WEBHOOK_ADDR").unwrap_or_else(|| "0.0.0.0:8443".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| non_empty("LOG_FILE_PATH").unwrap_or_else(|| "app.log".to_string()));

/// Log level (error, warn, info, debug, trace)
/// Read from LOG_LEVEL environment variable
/// Default: info
pub static LOG_LEVEL: Lazy<String> = Lazy::new(|| non_empty("LOG_LEVEL").unwrap_or_else(|| "info".to_string()));

pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    /// Must exceed the long polling timeout
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}
