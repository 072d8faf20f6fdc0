use rusqlite::types::Value as SqliteValue;
use rusqlite::{ParamsFromIter, params_from_iter};

use crate::error::DbError;
use crate::types::Value;

/// Storage format for dates and times, matching SQLite's date functions.
const DATE_FORMAT: &str = "%F";
const TIME_FORMAT: &str = "%T%.f";
const DATETIME_FORMAT: &str = "%F %T%.f";

/// Convert one bound value to its SQLite storage class.
///
/// # Errors
/// `UnsupportedType` for values SQLite cannot hold without loss.
pub fn value_to_sqlite(value: &Value) -> Result<SqliteValue, DbError> {
    let converted = match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::I8(i) => SqliteValue::Integer(i64::from(*i)),
        Value::U8(i) => SqliteValue::Integer(i64::from(*i)),
        Value::I16(i) => SqliteValue::Integer(i64::from(*i)),
        Value::U16(i) => SqliteValue::Integer(i64::from(*i)),
        Value::I32(i) => SqliteValue::Integer(i64::from(*i)),
        Value::U32(i) => SqliteValue::Integer(i64::from(*i)),
        Value::I64(i) | Value::Timestamp(i) => SqliteValue::Integer(*i),
        Value::Float(f) => SqliteValue::Real(f64::from(*f)),
        Value::Double(f) => SqliteValue::Real(*f),
        Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Blob(b) => SqliteValue::Blob(b.clone()),
        Value::Date(d) => SqliteValue::Text(d.format(DATE_FORMAT).to_string()),
        Value::Time(t) => SqliteValue::Text(t.format(TIME_FORMAT).to_string()),
        Value::DateTime(dt) => SqliteValue::Text(dt.format(DATETIME_FORMAT).to_string()),
        Value::U64(_) | Value::LongDouble(_) => {
            return Err(DbError::UnsupportedType(value.sql_type()));
        }
    };
    Ok(converted)
}

/// Parameters for one SQLite execution.
pub struct Params(pub Vec<SqliteValue>);

impl Params {
    /// # Errors
    /// See [`value_to_sqlite`].
    pub fn convert(values: &[Value]) -> Result<Self, DbError> {
        values.iter().map(value_to_sqlite).collect::<Result<_, _>>().map(Params)
    }

    #[must_use]
    pub fn as_values(&self) -> &[SqliteValue] {
        &self.0
    }

    /// Borrowed form accepted by rusqlite's `query`/`execute`.
    #[must_use]
    pub fn as_params(&self) -> ParamsFromIter<std::slice::Iter<'_, SqliteValue>> {
        params_from_iter(self.0.iter())
    }
}
