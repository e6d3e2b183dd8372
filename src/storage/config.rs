//! Database connection settings
//!
//! Read once from the environment when the [`Database`](super::Database) manager is built.
//! Later changes to the environment have no effect on an existing manager.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use super::backend::SslMode;
use super::error::{DbError, DbResult};

/// Default timeout for opening the connection (in seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database host
pub const DEFAULT_HOST: &str = "localhost";

/// Immutable database configuration.
///
/// The connector identifier is kept as the raw string: it is only resolved into a
/// [`Backend`](super::Backend) when the connection is first opened, so an unknown or
/// missing connector surfaces from `Database::connection()` rather than at startup.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Raw backend identifier (`DB_CONNECTOR`), e.g. `pgsql` or `mysql`
    pub connector: Option<String>,
    pub host: String,
    /// Port; `None` falls back to the backend's default port
    pub port: Option<u16>,
    pub database: String,
    pub username: String,
    pub password: SecretString,
    /// `None` leaves TLS negotiation to the driver default
    pub ssl_mode: Option<SslMode>,
    pub ssl_root_cert: Option<PathBuf>,
    pub ssl_cert: Option<PathBuf>,
    pub ssl_key: Option<PathBuf>,
    pub connect_timeout: Duration,
}

impl DbConfig {
    /// Build the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Config` if `DB_PORT`, `DB_SSL_MODE` or `DB_CONNECT_TIMEOUT`
    /// hold malformed values.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> DbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = get("DB_PORT")
            .map(|raw| {
                raw.parse::<u16>()
                    .map_err(|e| DbError::Config(format!("DB_PORT={raw:?}: {e}")))
            })
            .transpose()?;

        let ssl_mode = get("DB_SSL_MODE").map(|raw| SslMode::from_str(&raw)).transpose()?;

        let connect_timeout = match get("DB_CONNECT_TIMEOUT") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .map_err(|e| DbError::Config(format!("DB_CONNECT_TIMEOUT={raw:?}: {e}")))?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            connector: get("DB_CONNECTOR"),
            host: get("DB_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database: get("DB_DATABASE").unwrap_or_default(),
            username: get("DB_USERNAME").unwrap_or_default(),
            // Passwords are not trimmed: surrounding whitespace may be significant
            password: SecretString::from(lookup("DB_PASSWORD").unwrap_or_default()),
            ssl_mode,
            ssl_root_cert: get("DB_SSL_CA").map(PathBuf::from),
            ssl_cert: get("DB_SSL_CERT").map(PathBuf::from),
            ssl_key: get("DB_SSL_KEY").map(PathBuf::from),
            connect_timeout,
        })
    }

    /// Configuration pointing at `connector` on localhost with everything else defaulted.
    pub fn for_connector(connector: impl Into<String>) -> Self {
        Self {
            connector: Some(connector.into()),
            host: DEFAULT_HOST.to_string(),
            port: None,
            database: String::new(),
            username: String::new(),
            password: SecretString::from(String::new()),
            ssl_mode: None,
            ssl_root_cert: None,
            ssl_cert: None,
            ssl_key: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}
