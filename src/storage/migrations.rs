//! Versioned schema migrations
//!
//! Migrations are compiled into the binary and applied from the CLI
//! (`tgbase migrate up|down|status`), independently of the running bot.
//! Applied versions are recorded in `schema_migrations`.

use super::backend::Backend;
use super::database::Database;
use super::error::{DbError, DbResult};
use super::value::Value;

/// Backend-specific SQL for one direction of a migration
#[derive(Debug, Clone, Copy)]
pub struct Sql {
    pub postgres: &'static str,
    pub mysql: &'static str,
}

impl Sql {
    pub fn for_backend(&self, backend: Backend) -> &'static str {
        match backend {
            Backend::Postgres => self.postgres,
            Backend::MySql => self.mysql,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: Sql,
    pub down: Option<Sql>,
}

/// All migrations, in ascending version order
pub static MIGRATIONS: &[Migration] = &[Migration {
    version: 20241013130804,
    description: "Users table",
    up: Sql {
        postgres: "CREATE TABLE users (
            id bigserial NOT NULL,
            name VARCHAR(255) NOT NULL,
            roles json,
            telegram_id int8 NOT NULL,
            locked boolean NOT NULL DEFAULT false,
            PRIMARY KEY(id)
        )",
        mysql: "CREATE TABLE users (
            id BIGINT NOT NULL AUTO_INCREMENT,
            name VARCHAR(255) NOT NULL,
            roles JSON,
            telegram_id BIGINT NOT NULL,
            locked BOOLEAN NOT NULL DEFAULT false,
            PRIMARY KEY(id)
        )",
    },
    down: Some(Sql {
        postgres: "DROP TABLE users",
        mysql: "DROP TABLE users",
    }),
}];

const CREATE_TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version BIGINT NOT NULL PRIMARY KEY,
    description VARCHAR(255) NOT NULL,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// A migration and whether it has been applied
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub version: i64,
    pub description: &'static str,
    pub applied: bool,
}

async fn ensure_tracking_table(db: &Database) -> DbResult<()> {
    db.raw_query(CREATE_TRACKING_TABLE).await?;
    Ok(())
}

async fn applied_versions(db: &Database) -> DbResult<Vec<i64>> {
    let rows = db
        .raw_query("SELECT version FROM schema_migrations ORDER BY version")
        .await?;
    rows.iter().map(|row| row.get_i64("version")).collect()
}

/// Versions in `migrations` not yet in `applied`, preserving order
fn pending<'a>(migrations: &'a [Migration], applied: &[i64]) -> Vec<&'a Migration> {
    migrations.iter().filter(|m| !applied.contains(&m.version)).collect()
}

/// Apply every pending migration in version order.
///
/// Returns the versions applied by this call. Stops at the first failure; migrations
/// applied before it stay recorded.
pub async fn migrate_up(db: &Database) -> DbResult<Vec<i64>> {
    let backend = db.backend()?;
    ensure_tracking_table(db).await?;
    let applied = applied_versions(db).await?;

    let mut done = Vec::new();
    for migration in pending(MIGRATIONS, &applied) {
        log::info!("Applying migration {} ({})", migration.version, migration.description);
        db.raw_query(migration.up.for_backend(backend))
            .await
            .map_err(|e| DbError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;
        db.prepared_query(
            "INSERT INTO schema_migrations (version, description) VALUES (?, ?)",
            &[Value::Int(migration.version), Value::from(migration.description)],
        )
        .await?;
        done.push(migration.version);
    }

    if done.is_empty() {
        log::info!("Schema is up to date");
    }
    Ok(done)
}

/// Revert the most recently applied migration.
///
/// Returns the reverted version, or `None` when nothing is applied.
///
/// # Errors
///
/// `DbError::Migration` when the latest migration has no `down` step or is not
/// known to this binary.
pub async fn migrate_down(db: &Database) -> DbResult<Option<i64>> {
    let backend = db.backend()?;
    ensure_tracking_table(db).await?;
    let Some(&latest) = applied_versions(db).await?.last() else {
        log::info!("No applied migrations to revert");
        return Ok(None);
    };

    let migration = MIGRATIONS
        .iter()
        .find(|m| m.version == latest)
        .ok_or_else(|| DbError::Migration {
            version: latest,
            reason: "applied migration is unknown to this binary".to_string(),
        })?;
    let down = migration.down.ok_or_else(|| DbError::Migration {
        version: latest,
        reason: "migration is irreversible".to_string(),
    })?;

    log::info!("Reverting migration {} ({})", migration.version, migration.description);
    db.raw_query(down.for_backend(backend))
        .await
        .map_err(|e| DbError::Migration {
            version: latest,
            reason: e.to_string(),
        })?;
    db.prepared_query("DELETE FROM schema_migrations WHERE version = ?", &[Value::Int(latest)])
        .await?;

    Ok(Some(latest))
}

/// Every known migration with its applied flag, in version order
pub async fn migration_status(db: &Database) -> DbResult<Vec<MigrationStatus>> {
    ensure_tracking_table(db).await?;
    let applied = applied_versions(db).await?;
    Ok(MIGRATIONS
        .iter()
        .map(|m| MigrationStatus {
            version: m.version,
            description: m.description,
            applied: applied.contains(&m.version),
        })
        .collect())
}
