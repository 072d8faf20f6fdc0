use rusqlite::Statement;
use rusqlite::types::Value as SqliteValue;

use crate::error::DbError;
use crate::types::Value;

use super::params::Params;

/// Extract column `idx` of a SQLite row.
///
/// # Errors
/// Returns the driver error if the column cannot be read.
pub fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<Value, DbError> {
    let value: SqliteValue = row.get(idx)?;
    Ok(match value {
        SqliteValue::Null => Value::Null,
        SqliteValue::Integer(i) => Value::I64(i),
        SqliteValue::Real(f) => Value::Double(f),
        SqliteValue::Text(s) => Value::Text(s),
        SqliteValue::Blob(b) => Value::Blob(b),
    })
}

/// Run `stmt` and collect every row it produces.
///
/// # Errors
/// Returns the driver error if execution or extraction fails.
pub fn build_rows(stmt: &mut Statement<'_>, params: &Params) -> Result<Vec<Vec<Value>>, DbError> {
    let column_count = stmt.column_count();
    let mut rows_iter = stmt.query(params.as_params())?;
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut values = Vec::new();
        values.try_reserve_exact(column_count).map_err(|_| DbError::Oom)?;
        for i in 0..column_count {
            values.push(extract_value(row, i)?);
        }
        rows.push(values);
    }
    Ok(rows)
}
