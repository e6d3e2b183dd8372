//! Query parameters and decoded result rows

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::error::{DbError, DbResult};

/// A single SQL value, used both for bind parameters and for decoded columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Value {
    /// Name of the variant, used in type mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interpret a command-line argument as a parameter.
    ///
    /// `null` → Null, `true`/`false` → Bool, integers → Int, decimals → Float,
    /// everything else is bound as text.
    pub fn from_cli_arg(arg: &str) -> Self {
        match arg {
            "null" | "NULL" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => {
                if let Ok(int) = arg.parse::<i64>() {
                    Value::Int(int)
                } else if let Ok(float) = arg.parse::<f64>() {
                    if float.is_finite() {
                        Value::Float(float)
                    } else {
                        Value::Text(arg.to_string())
                    }
                } else {
                    Value::Text(arg.to_string())
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Json(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(v) => serializer.serialize_str(v),
            Value::Bytes(v) => serializer.serialize_bytes(v),
            Value::Json(v) => v.serialize(serializer),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One record of a query result.
///
/// Columns keep the order the driver returned them in. Lookups by name return the
/// first column with that name, which matters only for queries selecting duplicate names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in result order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// (name, value) pairs in result order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    /// Value at a column position
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.columns.get(index).map(|(_, value)| value)
    }

    fn require(&self, column: &str) -> DbResult<&Value> {
        self.get(column).ok_or_else(|| DbError::ColumnNotFound(column.to_string()))
    }

    fn mismatch(column: &str, expected: &'static str, found: &Value) -> DbError {
        DbError::TypeMismatch {
            column: column.to_string(),
            expected,
            found: found.kind(),
        }
    }

    pub fn get_i64(&self, column: &str) -> DbResult<i64> {
        match self.require(column)? {
            Value::Int(v) => Ok(*v),
            other => Err(Self::mismatch(column, "integer", other)),
        }
    }

    pub fn get_f64(&self, column: &str) -> DbResult<f64> {
        match self.require(column)? {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => Err(Self::mismatch(column, "float", other)),
        }
    }

    pub fn get_str(&self, column: &str) -> DbResult<&str> {
        match self.require(column)? {
            Value::Text(v) => Ok(v),
            other => Err(Self::mismatch(column, "text", other)),
        }
    }

    /// Booleans; MySQL reports `BOOLEAN` columns as `TINYINT(1)` in some
    /// expressions, so 0/1 integers are accepted too.
    pub fn get_bool(&self, column: &str) -> DbResult<bool> {
        match self.require(column)? {
            Value::Bool(v) => Ok(*v),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            other => Err(Self::mismatch(column, "boolean", other)),
        }
    }

    pub fn get_json(&self, column: &str) -> DbResult<&serde_json::Value> {
        match self.require(column)? {
            Value::Json(v) => Ok(v),
            other => Err(Self::mismatch(column, "json", other)),
        }
    }

    pub fn get_opt_i64(&self, column: &str) -> DbResult<Option<i64>> {
        if self.require(column)?.is_null() {
            return Ok(None);
        }
        self.get_i64(column).map(Some)
    }

    pub fn get_opt_str(&self, column: &str) -> DbResult<Option<&str>> {
        if self.require(column)?.is_null() {
            return Ok(None);
        }
        self.get_str(column).map(Some)
    }

    pub fn get_opt_json(&self, column: &str) -> DbResult<Option<&serde_json::Value>> {
        if self.require(column)?.is_null() {
            return Ok(None);
        }
        self.get_json(column).map(Some)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn user_row() -> Row {
        let mut row = Row::default();
        row.push("id", Value::Int(7));
        row.push("name", Value::Text("O'Brien".to_string()));
        row.push("roles", Value::Json(json!(["admin"])));
        row.push("locked", Value::Bool(false));
        row.push("note", Value::Null);
        row
    }

    #[test]
    fn test_typed_getters() {
        let row = user_row();

        assert_eq!(row.get_i64("id").unwrap(), 7);
        assert_eq!(row.get_str("name").unwrap(), "O'Brien");
        assert_eq!(row.get_json("roles").unwrap(), &json!(["admin"]));
        assert!(!row.get_bool("locked").unwrap());
        assert_eq!(row.get_opt_str("note").unwrap(), None);
        assert_eq!(row.get_f64("id").unwrap(), 7.0);
    }

    #[test]
    fn test_missing_column() {
        let err = user_row().get_i64("telegram_id").unwrap_err();
        assert!(matches!(err, DbError::ColumnNotFound(ref c) if c == "telegram_id"));
    }

    #[test]
    fn test_type_mismatch() {
        let err = user_row().get_i64("name").unwrap_err();
        assert_eq!(err.to_string(), "Column `name` holds text, expected integer");
    }

    #[test]
    fn test_bool_accepts_tinyint() {
        let mut row = Row::default();
        row.push("locked", Value::Int(1));
        assert!(row.get_bool("locked").unwrap());
    }

    #[test]
    fn test_serializes_in_column_order() {
        let json = serde_json::to_string(&user_row()).unwrap();
        assert_eq!(
            json,
            r#"{"id":7,"name":"O'Brien","roles":["admin"],"locked":false,"note":null}"#
        );
    }

    #[test]
    fn test_from_cli_arg() {
        assert_eq!(Value::from_cli_arg("123"), Value::Int(123));
        assert_eq!(Value::from_cli_arg("-4"), Value::Int(-4));
        assert_eq!(Value::from_cli_arg("1.5"), Value::Float(1.5));
        assert_eq!(Value::from_cli_arg("true"), Value::Bool(true));
        assert_eq!(Value::from_cli_arg("null"), Value::Null);
        assert_eq!(Value::from_cli_arg("O'Brien"), Value::Text("O'Brien".to_string()));
        assert_eq!(Value::from_cli_arg("inf"), Value::Text("inf".to_string()));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }
}
