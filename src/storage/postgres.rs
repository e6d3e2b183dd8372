//! PostgreSQL driver glue: open, bind, decode

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{
    PgArgumentBuffer, PgArguments, PgConnectOptions, PgConnection, PgHasArrayType, PgRow, PgTypeInfo,
};
use sqlx::query::Query;
use sqlx::{Column, Connection as _, Decode, Encode, Postgres, Row as _, Type, TypeInfo, ValueRef};

use super::backend::Backend;
use super::error::{DbError, DbResult};
use super::value::{Row, Value};

pub(crate) async fn connect(url: &str) -> DbResult<PgConnection> {
    let options = PgConnectOptions::from_str(url).map_err(|source| DbError::Connection {
        backend: Backend::Postgres,
        source,
    })?;
    PgConnection::connect_with(&options)
        .await
        .map_err(|source| DbError::Connection {
            backend: Backend::Postgres,
            source,
        })
}

/// Simple-query protocol: no binding, multiple statements allowed
pub(crate) async fn raw_query(conn: &mut PgConnection, sql: &str) -> DbResult<Vec<Row>> {
    let rows = sqlx::raw_sql(sql).fetch_all(conn).await?;
    rows.iter().map(decode_row).collect()
}

/// `sql` must already use `$n` placeholders
pub(crate) async fn prepared_query(conn: &mut PgConnection, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
    let query = params.iter().fold(sqlx::query(sql), bind);
    let rows = query.fetch_all(conn).await?;
    rows.iter().map(decode_row).collect()
}

fn bind<'q>(query: Query<'q, Postgres, PgArguments>, value: &'q Value) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(UntypedNull),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        Value::Json(v) => query.bind(sqlx::types::Json(v)),
    }
}

/// NULL parameter sent with type oid 0, so the server infers the type from the
/// statement instead of rejecting a `text` NULL in a non-text column.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

pub(crate) fn decode_row(row: &PgRow) -> DbResult<Row> {
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
fn decode_value(row: &PgRow, index: usize, type_name: &str) -> Result<Option<Value>, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Some(Value::Null));
    }

    let value = match type_name {
        "BOOL" => Value::Bool(row.try_get(index)?),
        "INT2" => Value::Int(row.try_get::<i16, _>(index)?.into()),
        "INT4" => Value::Int(row.try_get::<i32, _>(index)?.into()),
        "INT8" => Value::Int(row.try_get::<i64, _>(index)?),
        "FLOAT4" => Value::Float(row.try_get::<f32, _>(index)?.into()),
        "FLOAT8" => Value::Float(row.try_get::<f64, _>(index)?),
        "TEXT" | "VARCHAR" | "CHAR" | "NAME" | "CITEXT" | "UNKNOWN" => Value::Text(row.try_get(index)?),
        "JSON" | "JSONB" => Value::Json(row.try_get::<serde_json::Value, _>(index)?),
        "UUID" => Value::Text(row.try_get::<uuid::Uuid, _>(index)?.to_string()),
        "TIMESTAMPTZ" => Value::Text(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339()),
        "TIMESTAMP" => Value::Text(
            row.try_get::<NaiveDateTime, _>(index)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        "DATE" => Value::Text(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::Text(row.try_get::<NaiveTime, _>(index)?.to_string()),
        // Arbitrary precision: rendered as text, same as MySQL DECIMAL
        "NUMERIC" => Value::Text(row.try_get::<BigDecimal, _>(index)?.to_string()),
        "BYTEA" => Value::Bytes(row.try_get(index)?),
        "VOID" => Value::Null,
        "BOOL[]" => json_array::<bool>(row, index)?,
        "INT2[]" => json_array::<i16>(row, index)?,
        "INT4[]" => json_array::<i32>(row, index)?,
        "INT8[]" => json_array::<i64>(row, index)?,
        "FLOAT4[]" => json_array::<f32>(row, index)?,
        "FLOAT8[]" => json_array::<f64>(row, index)?,
        "TEXT[]" | "VARCHAR[]" | "CHAR[]" | "NAME[]" => json_array::<String>(row, index)?,
        "NUMERIC[]" => text_array::<BigDecimal>(row, index)?,
        "UUID[]" => text_array::<uuid::Uuid>(row, index)?,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Array column as a JSON array; NULL elements become JSON null
fn json_array<T>(row: &PgRow, index: usize) -> Result<Value, sqlx::Error>
where
    T: for<'r> Decode<'r, Postgres> + Type<Postgres> + PgHasArrayType + Into<JsonValue>,
{
    let items: Vec<Option<T>> = row.try_get(index)?;
    Ok(Value::Json(JsonValue::from(items)))
}

/// Array column whose elements have no JSON counterpart, as a JSON array of strings
fn text_array<T>(row: &PgRow, index: usize) -> Result<Value, sqlx::Error>
where
    T: for<'r> Decode<'r, Postgres> + Type<Postgres> + PgHasArrayType + ToString,
{
    let items: Vec<Option<T>> = row.try_get(index)?;
    let items: Vec<Option<String>> = items.into_iter().map(|item| item.map(|v| v.to_string())).collect();
    Ok(Value::Json(JsonValue::from(items)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_null_parameter_has_no_declared_type() {
        assert_eq!(<UntypedNull as Type<Postgres>>::type_info().oid(), Some(Oid(0)));
    }
}
