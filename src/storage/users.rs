//! Users table access
//!
//! Rows are keyed by the Telegram chat id (`telegram_id`); `id` is the database's own
//! auto-incremented key.

use serde_json::Value as JsonValue;

use super::database::Database;
use super::error::{DbError, DbResult};
use super::value::{Row, Value};
use super::Backend;

const SELECT_USER: &str = "SELECT id, name, roles, telegram_id, locked FROM users WHERE telegram_id = ?";

/// A registered bot user
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub roles: Vec<String>,
    pub telegram_id: i64,
    pub locked: bool,
}

impl User {
    /// Decode a `users` row. A NULL `roles` column means no roles.
    ///
    /// MariaDB stores `JSON` as `LONGTEXT`, so a text `roles` value is parsed as JSON.
    pub fn from_row(row: &Row) -> DbResult<Self> {
        let roles = match row.get("roles") {
            None => return Err(DbError::ColumnNotFound("roles".to_string())),
            Some(Value::Null) => Vec::new(),
            Some(Value::Json(json)) => roles_from_json(json)?,
            Some(Value::Text(text)) => {
                let json: JsonValue = serde_json::from_str(text).map_err(|_| roles_mismatch("text"))?;
                roles_from_json(&json)?
            }
            Some(other) => return Err(roles_mismatch(other.kind())),
        };

        Ok(Self {
            id: row.get_i64("id")?,
            name: row.get_str("name")?.to_string(),
            roles,
            telegram_id: row.get_i64("telegram_id")?,
            locked: row.get_bool("locked")?,
        })
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

fn roles_mismatch(found: &'static str) -> DbError {
    DbError::TypeMismatch {
        column: "roles".to_string(),
        expected: "json array",
        found,
    }
}

fn roles_from_json(json: &JsonValue) -> DbResult<Vec<String>> {
    match json {
        JsonValue::Array(items) => Ok(items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()),
        _ => Err(roles_mismatch("json")),
    }
}

/// Look up a user by Telegram chat id.
pub async fn get_user(db: &Database, telegram_id: i64) -> DbResult<Option<User>> {
    let rows = db.prepared_query(SELECT_USER, &[Value::Int(telegram_id)]).await?;
    rows.first().map(User::from_row).transpose()
}

/// Register a new, unlocked user without roles and return it.
pub async fn create_user(db: &Database, telegram_id: i64, name: &str) -> DbResult<User> {
    db.prepared_query(
        "INSERT INTO users (name, telegram_id, locked) VALUES (?, ?, ?)",
        &[Value::from(name), Value::Int(telegram_id), Value::Bool(false)],
    )
    .await?;

    get_user(db, telegram_id)
        .await?
        .ok_or(DbError::Execution(sqlx::Error::RowNotFound))
}

/// Fetch the user, registering them under `name` on first contact.
///
/// Returns the user and whether it was created by this call.
pub async fn get_or_create_user(db: &Database, telegram_id: i64, name: &str) -> DbResult<(User, bool)> {
    match get_user(db, telegram_id).await? {
        Some(user) => Ok((user, false)),
        None => Ok((create_user(db, telegram_id, name).await?, true)),
    }
}

pub async fn set_locked(db: &Database, telegram_id: i64, locked: bool) -> DbResult<()> {
    db.prepared_query(
        "UPDATE users SET locked = ? WHERE telegram_id = ?",
        &[Value::Bool(locked), Value::Int(telegram_id)],
    )
    .await?;
    Ok(())
}

/// Replace the user's role set.
pub async fn set_roles(db: &Database, telegram_id: i64, roles: &[String]) -> DbResult<()> {
    let encoded = serde_json::to_string(roles).map_err(|e| DbError::Config(format!("roles: {e}")))?;
    // Bound as text and cast server-side so the parameter matches a `json` column
    let sql = match db.connection().await?.backend() {
        Backend::Postgres => "UPDATE users SET roles = CAST(? AS json) WHERE telegram_id = ?",
        Backend::MySql => "UPDATE users SET roles = CAST(? AS JSON) WHERE telegram_id = ?",
    };
    db.prepared_query(sql, &[Value::Text(encoded), Value::Int(telegram_id)])
        .await?;
    Ok(())
}
