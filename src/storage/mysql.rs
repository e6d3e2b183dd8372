//! MySQL / MariaDB driver glue: open, bind, decode

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection as _, MySql, Row as _, TypeInfo, ValueRef};

use super::backend::Backend;
use super::error::{DbError, DbResult};
use super::value::{Row, Value};

pub(crate) async fn connect(url: &str) -> DbResult<MySqlConnection> {
    let options = MySqlConnectOptions::from_str(url).map_err(|source| DbError::Connection {
        backend: Backend::MySql,
        source,
    })?;
    MySqlConnection::connect_with(&options)
        .await
        .map_err(|source| DbError::Connection {
            backend: Backend::MySql,
            source,
        })
}

/// Text protocol: no binding, multiple statements allowed
pub(crate) async fn raw_query(conn: &mut MySqlConnection, sql: &str) -> DbResult<Vec<Row>> {
    let rows = sqlx::raw_sql(sql).fetch_all(conn).await?;
    rows.iter().map(decode_row).collect()
}

pub(crate) async fn prepared_query(conn: &mut MySqlConnection, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
    let query = params.iter().fold(sqlx::query(sql), bind);
    let rows = query.fetch_all(conn).await?;
    rows.iter().map(decode_row).collect()
}

fn bind<'q>(query: Query<'q, MySql, MySqlArguments>, value: &'q Value) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        Value::Json(v) => query.bind(sqlx::types::Json(v)),
    }
}

pub(crate) fn decode_row(row: &MySqlRow) -> DbResult<Row> {
    let mut out = Row::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let type_name = column.type_info().name();
        let value = decode_value(row, index, type_name).map_err(|source| DbError::Decode {
            column: column.name().to_string(),
            source,
        })?;
        match value {
            Some(value) => out.push(column.name(), value),
            None => {
                return Err(DbError::UnsupportedType {
                    column: column.name().to_string(),
                    type_name: type_name.to_string(),
                })
            }
        }
    }
    Ok(out)
}

/// `Ok(None)` for column types with no `Value` mapping
fn decode_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<Option<Value>, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Some(Value::Null));
    }

    let value = match type_name {
        "BOOLEAN" => Value::Bool(row.try_get(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => Value::Int(row.try_get::<i64, _>(index)?),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "BIGINT UNSIGNED" => {
            let unsigned = row.try_get::<u64, _>(index)?;
            // Values past i64::MAX keep their exact digits as text
            match i64::try_from(unsigned) {
                Ok(v) => Value::Int(v),
                Err(_) => Value::Text(unsigned.to_string()),
            }
        }
        "FLOAT" => Value::Float(row.try_get::<f32, _>(index)?.into()),
        "DOUBLE" => Value::Float(row.try_get::<f64, _>(index)?),
        // DECIMAL travels as ASCII digits in both protocols
        "DECIMAL" | "ENUM" | "SET" => Value::Text(row.try_get_unchecked::<String, _>(index)?),
        "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" => Value::Text(row.try_get(index)?),
        "JSON" => Value::Json(row.try_get::<serde_json::Value, _>(index)?),
        "TIMESTAMP" => Value::Text(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339()),
        "DATETIME" => Value::Text(
            row.try_get::<NaiveDateTime, _>(index)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "DATE" => Value::Text(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::Text(row.try_get::<NaiveTime, _>(index)?.to_string()),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => Value::Bytes(row.try_get(index)?),
        "NULL" => Value::Null,
        _ => return Ok(None),
    };
    Ok(Some(value))
}
