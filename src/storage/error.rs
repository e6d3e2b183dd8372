use std::time::Duration;

use thiserror::Error;

use super::backend::Backend;

/// Errors produced by the database access layer.
///
/// Configuration problems (`UnknownConnector`, `MissingConnector`, `Config`) are raised
/// before any socket is opened. `Connection` and `ConnectTimeout` come from opening the
/// single managed connection. Everything else is an execution or decoding failure of a
/// particular query and is returned to the caller as-is.
#[derive(Error, Debug)]
pub enum DbError {
    /// The backend identifier is not one of the supported connectors
    #[error("Unknown database connector: {0:?}")]
    UnknownConnector(String),

    /// No backend identifier was configured at all
    #[error("Database connector is not configured (set DB_CONNECTOR)")]
    MissingConnector,

    /// Malformed configuration value
    #[error("Invalid database configuration: {0}")]
    Config(String),

    /// Network or authentication failure while opening the connection
    #[error("Failed to connect to {backend} database: {source}")]
    Connection {
        backend: Backend,
        #[source]
        source: sqlx::Error,
    },

    /// The server did not accept the connection within the configured timeout
    #[error("Timed out after {0:?} while connecting to the database")]
    ConnectTimeout(Duration),

    /// Malformed SQL, constraint violation, binding mismatch
    #[error("Query failed: {0}")]
    Execution(#[from] sqlx::Error),

    /// A column value could not be decoded into its native type
    #[error("Failed to decode column `{column}`: {source}")]
    Decode {
        column: String,
        #[source]
        source: sqlx::Error,
    },

    /// The driver returned a column type this layer does not map to a `Value`
    #[error("Column `{column}` has unsupported type {type_name}")]
    UnsupportedType { column: String, type_name: String },

    #[error("Column `{0}` not found in row")]
    ColumnNotFound(String),

    #[error("Column `{column}` holds {found}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Migration {version} failed: {reason}")]
    Migration { version: i64, reason: String },
}

/// Type alias for Result with DbError
pub type DbResult<T> = Result<T, DbError>;
