//! The single live database handle

use sqlx::mysql::MySqlConnection;
use sqlx::postgres::PgConnection;
use tokio::sync::Mutex;

use super::backend::Backend;
use super::error::DbResult;
use super::value::{Row, Value};
use super::{mysql, placeholders, postgres};

enum Handle {
    Postgres(PgConnection),
    MySql(MySqlConnection),
}

/// An open connection to the configured backend.
///
/// A driver connection executes one statement at a time, so queries from concurrent
/// callers are serialised through an async mutex. The handle is never reconnected: once
/// it goes stale every query fails with an execution error until the process restarts.
pub struct Connection {
    backend: Backend,
    handle: Mutex<Handle>,
}

impl Connection {
    /// Open a connection to `url` using `backend`'s driver.
    pub(crate) async fn open(backend: Backend, url: &str) -> DbResult<Self> {
        let handle = match backend {
            Backend::Postgres => Handle::Postgres(postgres::connect(url).await?),
            Backend::MySql => Handle::MySql(mysql::connect(url).await?),
        };
        Ok(Self {
            backend,
            handle: Mutex::new(handle),
        })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Execute `sql` verbatim, without parameter binding.
    ///
    /// Statements that produce no result set (DDL, plain INSERTs) yield an empty vector.
    pub async fn raw_query(&self, sql: &str) -> DbResult<Vec<Row>> {
        let mut handle = self.handle.lock().await;
        match &mut *handle {
            Handle::Postgres(conn) => postgres::raw_query(conn, sql).await,
            Handle::MySql(conn) => mysql::raw_query(conn, sql).await,
        }
    }

    /// Prepare `sql`, bind `params` in order and execute.
    ///
    /// `?` placeholders are adapted to the backend first, see [`placeholders`].
    pub async fn prepared_query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        let sql = placeholders::for_backend(self.backend, sql);
        let sql = sql.as_ref();
        let mut handle = self.handle.lock().await;
        match &mut *handle {
            Handle::Postgres(conn) => postgres::prepared_query(conn, sql, params).await,
            Handle::MySql(conn) => mysql::prepared_query(conn, sql, params).await,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("backend", &self.backend).finish_non_exhaustive()
    }
}
