//! Connection manager, query executor and health check

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;

use super::backend::Backend;
use super::config::DbConfig;
use super::connection::Connection;
use super::error::{DbError, DbResult};
use super::value::{Row, Value};

/// Query used by [`Database::test_connection`]
pub const HEALTH_CHECK_QUERY: &str = "SELECT 1";

/// Owner of the application's one database connection.
///
/// The connection is opened lazily on first use and cached for the lifetime of the
/// manager. Concurrent first callers wait on the same initialisation, so exactly one
/// connection is ever opened; a failed attempt caches nothing and the next call tries
/// again. Share it as `Arc<Database>` with every component that needs storage.
///
/// # Example
///
/// ```no_run
/// use tgbase::storage::{Database, Value};
///
/// # async fn demo() -> Result<(), tgbase::storage::DbError> {
/// let db = Database::from_env()?;
/// let rows = db
///     .prepared_query("SELECT name FROM users WHERE telegram_id = ?", &[Value::Int(123)])
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Database {
    config: DbConfig,
    connection: OnceCell<Arc<Connection>>,
    opened: AtomicUsize,
}

impl Database {
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            connection: OnceCell::new(),
            opened: AtomicUsize::new(0),
        }
    }

    /// Manager configured from the `DB_*` environment variables
    pub fn from_env() -> DbResult<Self> {
        Ok(Self::new(DbConfig::from_env()?))
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Backend selected by the configured connector
    pub fn backend(&self) -> DbResult<Backend> {
        Backend::from_connector(self.config.connector.as_deref())
    }

    /// Return the shared connection, opening it on first call.
    ///
    /// # Errors
    ///
    /// - `UnknownConnector` / `MissingConnector` before any network activity
    /// - `Connection` on network or authentication failure
    /// - `ConnectTimeout` if the server does not answer within `DB_CONNECT_TIMEOUT`
    pub async fn connection(&self) -> DbResult<Arc<Connection>> {
        let connection = self.connection.get_or_try_init(|| self.open()).await?;
        Ok(Arc::clone(connection))
    }

    async fn open(&self) -> DbResult<Arc<Connection>> {
        let backend = self.backend()?;
        let url = backend.connection_url(&self.config)?;

        log::info!(
            "Connecting to {} database at {}:{}/{}",
            backend,
            self.config.host,
            self.config.port.unwrap_or_else(|| backend.default_port()),
            self.config.database
        );

        let timeout = self.config.connect_timeout;
        let connection = tokio::time::timeout(timeout, Connection::open(backend, &url))
            .await
            .map_err(|_| DbError::ConnectTimeout(timeout))??;

        self.opened.fetch_add(1, Ordering::SeqCst);
        log::info!("Database connection established ({})", backend);

        Ok(Arc::new(connection))
    }

    /// Whether the connection has been opened and cached
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    /// How many connections this manager has opened; never more than one
    pub fn connections_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Execute `sql` verbatim and return every row.
    ///
    /// No escaping is performed: never interpolate untrusted input into `sql`,
    /// use [`prepared_query`](Self::prepared_query) instead.
    pub async fn raw_query(&self, sql: &str) -> DbResult<Vec<Row>> {
        self.connection().await?.raw_query(sql).await
    }

    /// Execute `sql` with `params` bound to its `?` placeholders, in order.
    pub async fn prepared_query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        self.connection().await?.prepared_query(sql, params).await
    }

    /// Round-trip a trivial query.
    ///
    /// Returns `false` on any failure (configuration, connection or query); the reason is
    /// only logged. Callers needing the error should use [`raw_query`](Self::raw_query).
    pub async fn test_connection(&self) -> bool {
        match self.raw_query(HEALTH_CHECK_QUERY).await {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Database health check failed: {}", e);
                false
            }
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    #[serial_test::serial]
    fn test_from_env_reads_db_variables() {
        std::env::set_var("DB_CONNECTOR", "mariadb");
        std::env::set_var("DB_HOST", "db.test");
        std::env::set_var("DB_PORT", "3307");

        let db = Database::from_env().unwrap();

        std::env::remove_var("DB_CONNECTOR");
        std::env::remove_var("DB_HOST");
        std::env::remove_var("DB_PORT");

        assert_eq!(db.backend().unwrap(), Backend::MySql);
        assert_eq!(db.config().host, "db.test");
        assert_eq!(db.config().port, Some(3307));
        assert!(!db.is_connected());
    }

    #[tokio::test]
    async fn test_unknown_connector_opens_nothing() {
        let db = Database::new(DbConfig::for_connector("oracle"));

        let err = db.connection().await.unwrap_err();

        assert!(matches!(err, DbError::UnknownConnector(ref name) if name == "oracle"));
        assert!(!db.is_connected());
        assert_eq!(db.connections_opened(), 0);
    }

    #[tokio::test]
    async fn test_failed_construction_is_not_cached() {
        let db = Database::new(DbConfig::for_connector("sqlsrv"));

        assert!(db.connection().await.is_err());
        // Second attempt re-runs construction and fails the same way
        assert!(matches!(db.connection().await, Err(DbError::UnknownConnector(_))));
        assert!(!db.is_connected());
    }

    #[tokio::test]
    async fn test_missing_connector() {
        let mut config = DbConfig::for_connector("pgsql");
        config.connector = None;
        let db = Database::new(config);

        assert!(matches!(db.raw_query("SELECT 1").await, Err(DbError::MissingConnector)));
    }

    #[tokio::test]
    async fn test_queries_propagate_configuration_errors() {
        let db = Database::new(DbConfig::for_connector("oracle"));

        assert!(matches!(db.raw_query("SELECT 1").await, Err(DbError::UnknownConnector(_))));
        assert!(matches!(
            db.prepared_query("SELECT ?", &[Value::Int(1)]).await,
            Err(DbError::UnknownConnector(_))
        ));
    }

    #[tokio::test]
    async fn test_health_check_false_for_unknown_connector() {
        let db = Database::new(DbConfig::for_connector("oracle"));
        assert!(!db.test_connection().await);
    }

    #[tokio::test]
    async fn test_health_check_false_for_unreachable_server() {
        // Port 1 on loopback: refused immediately on any sane host
        let mut config = DbConfig::for_connector("pgsql");
        config.host = "127.0.0.1".to_string();
        config.port = Some(1);
        config.connect_timeout = Duration::from_secs(2);
        let db = Database::new(config);

        assert!(!db.test_connection().await);
        assert!(!db.is_connected());
        assert_eq!(db.connections_opened(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let mut config = DbConfig::for_connector("mysql");
        config.host = "127.0.0.1".to_string();
        config.port = Some(1);
        config.connect_timeout = Duration::from_secs(2);
        let db = Database::new(config);

        let err = db.connection().await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Connection { backend: Backend::MySql, .. } | DbError::ConnectTimeout(_)
        ));
    }
}
