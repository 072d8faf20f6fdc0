//! Coercion of fetched column values into the semantic type a result binding
//! asked for.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::DbError;
use crate::sql_text::format_general;
use crate::types::{SqlType, Value};

const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y%m%d %H:%M:%S%.f",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Convert `value` to `target`. NULL stays NULL whatever the target.
///
/// # Errors
/// `OutOfRange` when an integer does not fit the target width, `TypeMismatch`
/// when the value has no sensible representation in the target type.
pub fn convert(value: Value, target: SqlType) -> Result<Value, DbError> {
    if value.is_null() || value.sql_type() == target {
        return Ok(value);
    }
    match target {
        SqlType::Null => Ok(Value::Null),
        SqlType::Bool => to_bool(&value).map(Value::Bool),
        SqlType::I8
        | SqlType::U8
        | SqlType::I16
        | SqlType::U16
        | SqlType::I32
        | SqlType::U32
        | SqlType::I64
        | SqlType::U64
        | SqlType::Timestamp => {
            let wide = to_integer(&value)?;
            narrow(wide, target)
        }
        SqlType::Float => to_float(&value).map(|f| Value::Float(f as f32)),
        SqlType::Double => to_float(&value).map(Value::Double),
        SqlType::LongDouble => to_float(&value).map(Value::LongDouble),
        SqlType::Text => to_text(value).map(Value::Text),
        SqlType::Blob => match value {
            Value::Text(s) => Ok(Value::Blob(s.into_bytes())),
            other => to_text(other).map(|s| Value::Blob(s.into_bytes())),
        },
        SqlType::Date => to_datetime(&value).map(|dt| Value::Date(dt.date())),
        SqlType::Time => to_time(&value).map(Value::Time),
        SqlType::DateTime => to_datetime(&value).map(Value::DateTime),
    }
}

fn mismatch(value: &Value, target: &str) -> DbError {
    DbError::TypeMismatch(format!("cannot read {} as {target}", value.sql_type()))
}

fn to_bool(value: &Value) -> Result<bool, DbError> {
    if let Some(i) = value.as_i128() {
        return Ok(i != 0);
    }
    if let Some(f) = value.as_f64() {
        return Ok(f != 0.0);
    }
    match value.as_text().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("1" | "t" | "true" | "yes") => Ok(true),
        Some("0" | "f" | "false" | "no") => Ok(false),
        _ => Err(mismatch(value, "bool")),
    }
}

fn to_integer(value: &Value) -> Result<i128, DbError> {
    if let Some(i) = value.as_i128() {
        return Ok(i);
    }
    if let Some(f) = value.as_f64() {
        if f.is_finite() && f.fract() == 0.0 {
            return Ok(f as i128);
        }
        return Err(DbError::TypeMismatch(format!("{f} is not integral")));
    }
    match value {
        Value::Text(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i128>()
                .or_else(|_| parse_datetime(trimmed).map(|dt| dt.and_utc().timestamp().into()))
                .map_err(|_| mismatch(value, "integer"))
        }
        Value::DateTime(dt) => Ok(dt.and_utc().timestamp().into()),
        Value::Date(d) => d
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp().into())
            .ok_or_else(|| mismatch(value, "integer")),
        _ => Err(mismatch(value, "integer")),
    }
}

fn narrow(wide: i128, target: SqlType) -> Result<Value, DbError> {
    let out_of_range = || DbError::OutOfRange(format!("{wide} does not fit {target}"));
    let value = match target {
        SqlType::I8 => Value::I8(i8::try_from(wide).map_err(|_| out_of_range())?),
        SqlType::U8 => Value::U8(u8::try_from(wide).map_err(|_| out_of_range())?),
        SqlType::I16 => Value::I16(i16::try_from(wide).map_err(|_| out_of_range())?),
        SqlType::U16 => Value::U16(u16::try_from(wide).map_err(|_| out_of_range())?),
        SqlType::I32 => Value::I32(i32::try_from(wide).map_err(|_| out_of_range())?),
        SqlType::U32 => Value::U32(u32::try_from(wide).map_err(|_| out_of_range())?),
        SqlType::I64 => Value::I64(i64::try_from(wide).map_err(|_| out_of_range())?),
        SqlType::U64 => Value::U64(u64::try_from(wide).map_err(|_| out_of_range())?),
        SqlType::Timestamp => Value::Timestamp(i64::try_from(wide).map_err(|_| out_of_range())?),
        other => return Err(DbError::TypeMismatch(format!("{other} is not an integer type"))),
    };
    Ok(value)
}

fn to_float(value: &Value) -> Result<f64, DbError> {
    if let Some(f) = value.as_f64() {
        return Ok(f);
    }
    if let Some(i) = value.as_i128() {
        return Ok(i as f64);
    }
    value
        .as_text()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or_else(|| mismatch(value, "floating point"))
}

fn to_text(value: Value) -> Result<String, DbError> {
    if let Some(i) = value.as_i128() {
        return Ok(i.to_string());
    }
    let text = match value {
        Value::Text(s) => s,
        Value::Blob(bytes) => String::from_utf8(bytes)
            .map_err(|_| DbError::TypeMismatch("blob is not valid UTF-8 text".into()))?,
        Value::Float(f) => format_general(f64::from(f), 9),
        Value::Double(f) | Value::LongDouble(f) => format_general(f, 17),
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        Value::Time(t) => t.format(TIME_FORMAT).to_string(),
        Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        other => return Err(mismatch(&other, "text")),
    };
    Ok(text)
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, DbError> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| DbError::TypeMismatch(format!("'{s}' is not a date/time")))
}

fn from_unix(secs: i128) -> Result<NaiveDateTime, DbError> {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| DbError::OutOfRange(format!("{secs} is not a representable timestamp")))
}

fn to_datetime(value: &Value) -> Result<NaiveDateTime, DbError> {
    match value {
        Value::DateTime(dt) => Ok(*dt),
        Value::Date(d) => d
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| mismatch(value, "datetime")),
        Value::Text(s) => parse_datetime(s.trim()),
        other => match other.as_i128() {
            Some(secs) if !matches!(other, Value::Bool(_)) => from_unix(secs),
            _ => Err(mismatch(other, "datetime")),
        },
    }
}

fn to_time(value: &Value) -> Result<NaiveTime, DbError> {
    match value {
        Value::DateTime(dt) => Ok(dt.time()),
        Value::Text(s) => NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
            .or_else(|_| parse_datetime(s.trim()).map(|dt| dt.time()))
            .map_err(|_| mismatch(value, "time")),
        _ => Err(mismatch(value, "time")),
    }
}
