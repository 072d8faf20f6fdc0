use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as JsonValue;

/// Semantic type codes understood by the binding engine.
///
/// Signed and unsigned widths are distinct codes: their legal ranges differ
/// and backends support them independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Null,
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Float,
    Double,
    LongDouble,
    Text,
    Blob,
    Date,
    Time,
    DateTime,
    Timestamp,
}

impl SqlType {
    /// Every semantic type, in declaration order.
    pub const ALL: [SqlType; 19] = [
        SqlType::Null,
        SqlType::Bool,
        SqlType::I8,
        SqlType::U8,
        SqlType::I16,
        SqlType::U16,
        SqlType::I32,
        SqlType::U32,
        SqlType::I64,
        SqlType::U64,
        SqlType::Float,
        SqlType::Double,
        SqlType::LongDouble,
        SqlType::Text,
        SqlType::Blob,
        SqlType::Date,
        SqlType::Time,
        SqlType::DateTime,
        SqlType::Timestamp,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SqlType::Null => "null",
            SqlType::Bool => "bool",
            SqlType::I8 => "int8",
            SqlType::U8 => "uint8",
            SqlType::I16 => "int16",
            SqlType::U16 => "uint16",
            SqlType::I32 => "int32",
            SqlType::U32 => "uint32",
            SqlType::I64 => "int64",
            SqlType::U64 => "uint64",
            SqlType::Float => "float",
            SqlType::Double => "double",
            SqlType::LongDouble => "long double",
            SqlType::Text => "text",
            SqlType::Blob => "blob",
            SqlType::Date => "date",
            SqlType::Time => "time",
            SqlType::DateTime => "datetime",
            SqlType::Timestamp => "timestamp",
        }
    }

    /// Integer range of the type as `(min, max)`, or `None` for non-integers.
    #[must_use]
    pub fn integer_range(self) -> Option<(i128, i128)> {
        match self {
            SqlType::I8 => Some((i8::MIN.into(), i8::MAX.into())),
            SqlType::U8 => Some((0, u8::MAX.into())),
            SqlType::I16 => Some((i16::MIN.into(), i16::MAX.into())),
            SqlType::U16 => Some((0, u16::MAX.into())),
            SqlType::I32 => Some((i32::MIN.into(), i32::MAX.into())),
            SqlType::U32 => Some((0, u32::MAX.into())),
            SqlType::I64 | SqlType::Timestamp => Some((i64::MIN.into(), i64::MAX.into())),
            SqlType::U64 => Some((0, u64::MAX.into())),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_variable_length(self) -> bool {
        matches!(self, SqlType::Text | SqlType::Blob)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a parameter value reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamMode {
    /// The value is copied into the statement when bound.
    Value,
    /// The caller's storage is re-read at every execution.
    Reference,
}

impl ParamMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamMode::Value => "value",
            ParamMode::Reference => "reference",
        }
    }
}

/// How a fetched column value is handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultMode {
    /// Borrowed from statement storage until the next fetch, exec or finalize.
    Temporary,
    /// A fresh owned copy the caller takes over.
    Duplicate,
    /// Written into caller storage of fixed capacity.
    Fixed,
}

impl ResultMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResultMode::Temporary => "temporary",
            ResultMode::Duplicate => "duplicate",
            ResultMode::Fixed => "fixed",
        }
    }
}

/// The four SQL-text renderings a statement can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlVariant {
    /// Exactly as passed to `prepare`.
    Plain,
    /// Control characters replaced by backslash escapes.
    Escaped,
    /// Placeholders replaced by the literals currently bound.
    Expanded,
    /// Expanded, then escaped.
    ExpandedEscaped,
}

impl SqlVariant {
    pub(crate) fn slot(self) -> usize {
        match self {
            SqlVariant::Plain => 0,
            SqlVariant::Escaped => 1,
            SqlVariant::Expanded => 2,
            SqlVariant::ExpandedEscaped => 3,
        }
    }

    #[must_use]
    pub fn is_expanded(self) -> bool {
        matches!(self, SqlVariant::Expanded | SqlVariant::ExpandedEscaped)
    }
}

/// Extended-precision float. Stored as `f64`; backends that accept it render
/// it at their long-double precision.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct LongDouble(pub f64);

/// Seconds since the Unix epoch, bound as its own semantic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UnixTimestamp(pub i64);

/// A typed SQL value, used both for parameters and fetched columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Float(f32),
    Double(f64),
    LongDouble(f64),
    Text(String),
    Blob(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Timestamp(i64),
}

impl Value {
    #[must_use]
    pub fn sql_type(&self) -> SqlType {
        match self {
            Value::Null => SqlType::Null,
            Value::Bool(_) => SqlType::Bool,
            Value::I8(_) => SqlType::I8,
            Value::U8(_) => SqlType::U8,
            Value::I16(_) => SqlType::I16,
            Value::U16(_) => SqlType::U16,
            Value::I32(_) => SqlType::I32,
            Value::U32(_) => SqlType::U32,
            Value::I64(_) => SqlType::I64,
            Value::U64(_) => SqlType::U64,
            Value::Float(_) => SqlType::Float,
            Value::Double(_) => SqlType::Double,
            Value::LongDouble(_) => SqlType::LongDouble,
            Value::Text(_) => SqlType::Text,
            Value::Blob(_) => SqlType::Blob,
            Value::Date(_) => SqlType::Date,
            Value::Time(_) => SqlType::Time,
            Value::DateTime(_) => SqlType::DateTime,
            Value::Timestamp(_) => SqlType::Timestamp,
        }
    }

    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Any integer-like value widened without loss.
    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Bool(b) => Some(i128::from(*b)),
            Value::I8(v) => Some((*v).into()),
            Value::U8(v) => Some((*v).into()),
            Value::I16(v) => Some((*v).into()),
            Value::U16(v) => Some((*v).into()),
            Value::I32(v) => Some((*v).into()),
            Value::U32(v) => Some((*v).into()),
            Value::I64(v) | Value::Timestamp(v) => Some((*v).into()),
            Value::U64(v) => Some((*v).into()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) | Value::LongDouble(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let Value::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// JSON rendering used for row dumps.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::I8(v) => (*v).into(),
            Value::U8(v) => (*v).into(),
            Value::I16(v) => (*v).into(),
            Value::U16(v) => (*v).into(),
            Value::I32(v) => (*v).into(),
            Value::U32(v) => (*v).into(),
            Value::I64(v) | Value::Timestamp(v) => (*v).into(),
            Value::U64(v) => (*v).into(),
            Value::Float(v) => serde_json::Number::from_f64(f64::from(*v))
                .map_or(JsonValue::Null, JsonValue::Number),
            Value::Double(v) | Value::LongDouble(v) => {
                serde_json::Number::from_f64(*v).map_or(JsonValue::Null, JsonValue::Number)
            }
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Blob(bytes) => JsonValue::Array(bytes.iter().map(|b| (*b).into()).collect()),
            Value::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => JsonValue::String(t.format("%H:%M:%S%.f").to_string()),
            Value::DateTime(dt) => JsonValue::String(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        }
    }
}

/// Fixed-size types that can be bound by value, by reference (`Cell<T>`),
/// and fetched into a caller cell.
pub trait Scalar: Copy + 'static {
    const SQL_TYPE: SqlType;

    fn into_value(self) -> Value;

    /// Extract from a value already converted to `SQL_TYPE`.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_scalar {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Scalar for $t {
                const SQL_TYPE: SqlType = SqlType::$variant;

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: &Value) -> Option<Self> {
                    if let Value::$variant(v) = value {
                        Some(*v)
                    } else {
                        None
                    }
                }
            }
        )*
    };
}

impl_scalar! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => Float,
    f64 => Double,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
}

impl Scalar for LongDouble {
    const SQL_TYPE: SqlType = SqlType::LongDouble;

    fn into_value(self) -> Value {
        Value::LongDouble(self.0)
    }

    fn from_value(value: &Value) -> Option<Self> {
        if let Value::LongDouble(v) = value {
            Some(LongDouble(*v))
        } else {
            None
        }
    }
}

impl Scalar for UnixTimestamp {
    const SQL_TYPE: SqlType = SqlType::Timestamp;

    fn into_value(self) -> Value {
        Value::Timestamp(self.0)
    }

    fn from_value(value: &Value) -> Option<Self> {
        if let Value::Timestamp(v) = value {
            Some(UnixTimestamp(*v))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_codes_match_value_variants() {
        assert_eq!(7u16.into_value().sql_type(), u16::SQL_TYPE);
        assert_eq!(LongDouble(1.0).into_value().sql_type(), SqlType::LongDouble);
        assert_eq!(UnixTimestamp(5).into_value(), Value::Timestamp(5));
        assert_eq!(i8::from_value(&Value::I8(-3)), Some(-3));
        assert_eq!(i8::from_value(&Value::I16(-3)), None);
    }

    #[test]
    fn integer_ranges_distinguish_signedness() {
        assert_eq!(SqlType::I8.integer_range(), Some((-128, 127)));
        assert_eq!(SqlType::U8.integer_range(), Some((0, 255)));
        assert_eq!(SqlType::U64.integer_range().map(|r| r.1), Some(u64::MAX.into()));
        assert!(SqlType::Double.integer_range().is_none());
    }

    #[test]
    fn json_rendering() {
        assert_eq!(Value::I32(5).to_json(), serde_json::json!(5));
        assert_eq!(Value::Double(f64::NAN).to_json(), JsonValue::Null);
        assert_eq!(Value::Text("a".into()).to_json(), serde_json::json!("a"));
    }
}
