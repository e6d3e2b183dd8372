//! Integration tests against a live database
//!
//! Configure the `DB_*` variables (or a `.env` file) and run with:
//! cargo test --test database_integration -- --ignored

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serial_test::serial;
use serde_json::json;
use tgbase::storage::migrations::{migrate_up, migration_status};
use tgbase::storage::users;
use tgbase::storage::{Backend, Database, Value};
use tgbase::telegram::{start_reply, HandlerDeps, LOCKED_TEXT};

fn database() -> Database {
    let _ = dotenvy::dotenv();
    Database::from_env().expect("DB_* environment must be valid")
}

fn temp_table() -> String {
    format!("tgbase_it_{}", uuid::Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_connection_is_shared() {
    let db = database();

    let first = db.connection().await.unwrap();
    let second = db.connection().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(db.connections_opened(), 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_concurrent_first_use_opens_one_connection() {
    let db = Arc::new(database());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = Arc::clone(&db);
            tokio::spawn(async move { db.connection().await.unwrap() })
        })
        .collect();

    let mut connections = Vec::new();
    for handle in handles {
        connections.push(handle.await.unwrap());
    }

    assert!(connections.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(db.connections_opened(), 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_health_check() {
    let db = database();
    assert!(db.test_connection().await);
    assert!(db.is_connected());
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_select_one() {
    let db = database();

    let rows = db.raw_query("SELECT 1 AS one").await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), 1);
    assert_eq!(rows[0].get_i64("one").unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_prepared_filter_and_quoting() {
    let db = database();
    let table = temp_table();

    let created = db
        .raw_query(&format!(
            "CREATE TABLE {table} (id BIGINT NOT NULL, name VARCHAR(64) NOT NULL, telegram_id BIGINT NOT NULL)"
        ))
        .await
        .unwrap();
    assert!(created.is_empty());

    let insert = format!("INSERT INTO {table} (id, name, telegram_id) VALUES (?, ?, ?)");
    db.prepared_query(&insert, &[Value::Int(1), Value::from("O'Brien"), Value::Int(123)])
        .await
        .unwrap();
    db.prepared_query(&insert, &[Value::Int(2), Value::from("bob"), Value::Int(456)])
        .await
        .unwrap();

    let rows = db
        .prepared_query(
            &format!("SELECT name FROM {table} WHERE telegram_id = ?"),
            &[Value::Int(123)],
        )
        .await
        .unwrap();

    // An empty match is an empty vector, not an error
    let none = db
        .prepared_query(
            &format!("SELECT name FROM {table} WHERE telegram_id = ?"),
            &[Value::Int(789)],
        )
        .await
        .unwrap();

    db.raw_query(&format!("DROP TABLE {table}")).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("name").unwrap(), "O'Brien");
    assert!(none.is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_invalid_sql_is_execution_error() {
    let db = database();

    let err = db.raw_query("SELEC 1").await.unwrap_err();

    assert!(matches!(err, tgbase::DbError::Execution(_)));
    // The connection stays usable
    assert!(db.test_connection().await);
}

#[tokio::test]
#[serial]
#[ignore = "requires database"]
async fn test_migrations_and_users() {
    let db = database();

    migrate_up(&db).await.unwrap();
    // Second run has nothing left to apply
    assert!(migrate_up(&db).await.unwrap().is_empty());
    assert!(migration_status(&db).await.unwrap().iter().all(|m| m.applied));

    let telegram_id = 9_000_000_000 + i64::from(rand_suffix());
    let (user, created) = users::get_or_create_user(&db, telegram_id, "O'Brien").await.unwrap();
    assert!(created);
    assert_eq!(user.name, "O'Brien");
    assert!(!user.locked);

    users::set_locked(&db, telegram_id, true).await.unwrap();
    users::set_roles(&db, telegram_id, &["admin".to_string()]).await.unwrap();

    let (user, created) = users::get_or_create_user(&db, telegram_id, "ignored").await.unwrap();
    assert!(!created);
    assert!(user.locked);
    assert_eq!(user.roles, vec!["admin".to_string()]);

    db.prepared_query("DELETE FROM users WHERE telegram_id = ?", &[Value::Int(telegram_id)])
        .await
        .unwrap();
    assert_eq!(users::get_user(&db, telegram_id).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_null_parameters_fit_any_column() {
    let db = database();
    let table = temp_table();
    let json_type = match db.backend().unwrap() {
        Backend::Postgres => "json",
        Backend::MySql => "JSON",
    };

    db.raw_query(&format!(
        "CREATE TABLE {table} (id BIGINT, roles {json_type}, note VARCHAR(32))"
    ))
    .await
    .unwrap();

    let insert = format!("INSERT INTO {table} (id, roles, note) VALUES (?, ?, ?)");
    let first = db.prepared_query(&insert, &[Value::Int(1), Value::Null, Value::Null]).await;
    let second = db
        .prepared_query(&insert, &[Value::Null, Value::Json(json!(["admin"])), Value::from("x")])
        .await;
    let rows = db
        .raw_query(&format!("SELECT id, roles, note FROM {table} ORDER BY id"))
        .await;

    db.raw_query(&format!("DROP TABLE {table}")).await.unwrap();

    first.unwrap();
    second.unwrap();
    let rows = rows.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r.get("roles") == Some(&Value::Null)));
    assert!(rows.iter().any(|r| r.get("id") == Some(&Value::Null)));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_postgres_numeric_and_array_results() {
    let db = database();
    if db.backend().unwrap() != Backend::Postgres {
        return;
    }

    let sum = db
        .raw_query("SELECT SUM(x) AS s FROM (VALUES (1::bigint), (2::bigint)) t(x)")
        .await
        .unwrap();
    assert_eq!(sum[0].get_str("s").unwrap(), "3");

    let decimal = db.prepared_query("SELECT 1.5 AS d, ? AS n", &[Value::Int(1)]).await.unwrap();
    assert_eq!(decimal[0].get_str("d").unwrap(), "1.5");

    let arrays = db
        .raw_query("SELECT ARRAY[1, 2] AS ints, ARRAY['a', NULL] AS texts")
        .await
        .unwrap();
    assert_eq!(arrays[0].get_json("ints").unwrap(), &json!([1, 2]));
    assert_eq!(arrays[0].get_json("texts").unwrap(), &json!(["a", null]));
}

#[tokio::test]
#[ignore = "requires database"]
async fn test_dollar_digits_in_literal_keep_placeholders() {
    let db = database();

    let rows = db
        .prepared_query("SELECT ? AS a, 'costs $5' AS b", &[Value::Int(1)])
        .await
        .unwrap();

    assert_eq!(rows[0].get_i64("a").unwrap(), 1);
    assert_eq!(rows[0].get_str("b").unwrap(), "costs $5");
}

#[tokio::test]
#[serial]
#[ignore = "requires database"]
async fn test_start_registers_then_refuses_locked_user() {
    let db = Arc::new(database());
    migrate_up(&db).await.unwrap();
    let deps = HandlerDeps::new(Arc::clone(&db), "tgbase");
    let telegram_id = 8_000_000_000 + i64::from(rand_suffix());

    let first = start_reply(&deps, telegram_id, "alice").await;
    assert_eq!(first, format!("Welcome to tgbase, alice!\nYour chat id: {telegram_id}"));
    assert!(users::get_user(&db, telegram_id).await.unwrap().is_some());

    let again = start_reply(&deps, telegram_id, "ignored").await;
    assert_eq!(again, format!("Welcome back, alice!\nYour chat id: {telegram_id}"));

    users::set_locked(&db, telegram_id, true).await.unwrap();
    assert_eq!(start_reply(&deps, telegram_id, "alice").await, LOCKED_TEXT);

    db.prepared_query("DELETE FROM users WHERE telegram_id = ?", &[Value::Int(telegram_id)])
        .await
        .unwrap();
}

fn rand_suffix() -> u32 {
    uuid::Uuid::new_v4().as_u128() as u32
}
