use std::fmt::{self, Write};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::types::Value;

/// Which built-in literal dialect to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// `SQLite`
    #[default]
    Sqlite,
    /// `MySQL` / `MariaDB`
    Mysql,
    /// Sybase / SQL Server over TDS
    Tds,
}

/// How quotes inside string literals are protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEscape {
    /// `'` becomes `''`.
    DoubleQuote,
    /// `'` becomes `\'` and `\` becomes `\\`.
    Backslash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobStyle {
    /// `X'0a0b'`
    HexQuoted,
    /// `0x0a0b`
    HexPrefixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampStyle {
    /// Bare integer seconds.
    Integer,
    /// `FROM_UNIXTIME(n)`
    FromUnixTime,
    /// `DATEADD(second, n, '19700101')`
    DateAdd,
}

/// Literal rendering rules a backend declares for expanded SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialect {
    pub kind: DialectKind,
    /// Significant decimal digits for `float`, `double` and `long double`.
    pub float_digits: usize,
    pub double_digits: usize,
    pub long_double_digits: usize,
    pub nan: &'static str,
    pub infinity: &'static str,
    pub neg_infinity: &'static str,
    pub true_literal: &'static str,
    pub false_literal: &'static str,
    pub string_escape: StringEscape,
    pub blob_style: BlobStyle,
    pub date_format: &'static str,
    pub time_format: &'static str,
    pub datetime_format: &'static str,
    pub timestamp_style: TimestampStyle,
}

impl Dialect {
    #[must_use]
    pub fn sqlite() -> Self {
        Self {
            kind: DialectKind::Sqlite,
            float_digits: 6,
            double_digits: 15,
            long_double_digits: 18,
            nan: "'NaN'",
            infinity: "Inf",
            neg_infinity: "-Inf",
            true_literal: "1",
            false_literal: "0",
            string_escape: StringEscape::DoubleQuote,
            blob_style: BlobStyle::HexQuoted,
            date_format: "%Y-%m-%d",
            time_format: "%H:%M:%S%.f",
            datetime_format: "%Y-%m-%d %H:%M:%S%.f",
            timestamp_style: TimestampStyle::Integer,
        }
    }

    #[must_use]
    pub fn mysql() -> Self {
        Self {
            kind: DialectKind::Mysql,
            float_digits: 6,
            double_digits: 15,
            long_double_digits: 18,
            nan: "nan",
            infinity: "inf",
            neg_infinity: "-inf",
            true_literal: "TRUE",
            false_literal: "FALSE",
            string_escape: StringEscape::Backslash,
            blob_style: BlobStyle::HexQuoted,
            date_format: "%Y-%m-%d",
            time_format: "%H:%M:%S%.f",
            datetime_format: "%Y-%m-%d %H:%M:%S%.f",
            timestamp_style: TimestampStyle::FromUnixTime,
        }
    }

    #[must_use]
    pub fn tds() -> Self {
        Self {
            kind: DialectKind::Tds,
            float_digits: 6,
            double_digits: 15,
            long_double_digits: 15,
            nan: "'NaN'",
            infinity: "'Infinity'",
            neg_infinity: "'-Infinity'",
            true_literal: "1",
            false_literal: "0",
            string_escape: StringEscape::DoubleQuote,
            blob_style: BlobStyle::HexPrefixed,
            date_format: "%Y%m%d",
            time_format: "%H:%M:%S%.f",
            datetime_format: "%Y-%m-%dT%H:%M:%S%.f",
            timestamp_style: TimestampStyle::DateAdd,
        }
    }

    #[must_use]
    pub fn for_kind(kind: DialectKind) -> Self {
        match kind {
            DialectKind::Sqlite => Self::sqlite(),
            DialectKind::Mysql => Self::mysql(),
            DialectKind::Tds => Self::tds(),
        }
    }

    /// Append the SQL literal for `value` to `out`.
    ///
    /// # Errors
    /// Only if writing to `out` fails.
    pub fn write_literal<W: Write>(&self, value: &Value, out: &mut W) -> fmt::Result {
        match value {
            Value::Null => out.write_str("NULL"),
            Value::Bool(b) => out.write_str(if *b {
                self.true_literal
            } else {
                self.false_literal
            }),
            Value::I8(v) => write!(out, "{v}"),
            Value::U8(v) => write!(out, "{v}"),
            Value::I16(v) => write!(out, "{v}"),
            Value::U16(v) => write!(out, "{v}"),
            Value::I32(v) => write!(out, "{v}"),
            Value::U32(v) => write!(out, "{v}"),
            Value::I64(v) => write!(out, "{v}"),
            Value::U64(v) => write!(out, "{v}"),
            Value::Float(v) => self.write_float(f64::from(*v), self.float_digits, out),
            Value::Double(v) => self.write_float(*v, self.double_digits, out),
            Value::LongDouble(v) => self.write_float(*v, self.long_double_digits, out),
            Value::Text(s) => self.write_quoted(s, out),
            Value::Blob(bytes) => {
                match self.blob_style {
                    BlobStyle::HexQuoted => out.write_str("X'")?,
                    BlobStyle::HexPrefixed => out.write_str("0x")?,
                }
                for b in bytes {
                    write!(out, "{b:02x}")?;
                }
                if self.blob_style == BlobStyle::HexQuoted {
                    out.write_char('\'')?;
                }
                Ok(())
            }
            Value::Date(d) => write!(out, "'{}'", d.format(self.date_format)),
            Value::Time(t) => write!(out, "'{}'", t.format(self.time_format)),
            Value::DateTime(dt) => write!(out, "'{}'", dt.format(self.datetime_format)),
            Value::Timestamp(secs) => match self.timestamp_style {
                TimestampStyle::Integer => write!(out, "{secs}"),
                TimestampStyle::FromUnixTime => write!(out, "FROM_UNIXTIME({secs})"),
                TimestampStyle::DateAdd => write!(out, "DATEADD(second, {secs}, '19700101')"),
            },
        }
    }

    /// The SQL literal for `value` as an owned string.
    #[must_use]
    pub fn literal(&self, value: &Value) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_literal(value, &mut out);
        out
    }

    fn write_float<W: Write>(&self, v: f64, digits: usize, out: &mut W) -> fmt::Result {
        if v.is_nan() {
            out.write_str(self.nan)
        } else if v.is_infinite() {
            out.write_str(if v > 0.0 {
                self.infinity
            } else {
                self.neg_infinity
            })
        } else {
            out.write_str(&format_general(v, digits))
        }
    }

    fn write_quoted<W: Write>(&self, s: &str, out: &mut W) -> fmt::Result {
        out.write_char('\'')?;
        for ch in s.chars() {
            match (ch, self.string_escape) {
                ('\'', StringEscape::DoubleQuote) => out.write_str("''")?,
                ('\'', StringEscape::Backslash) => out.write_str("\\'")?,
                ('\\', StringEscape::Backslash) => out.write_str("\\\\")?,
                _ => out.write_char(ch)?,
            }
        }
        out.write_char('\'')
    }
}

/// Render `value` like C's `%.<digits>g`: `digits` significant digits,
/// trailing zeros dropped, exponent form outside `1e-4 ..= 1e<digits>`.
#[must_use]
pub fn format_general(value: f64, digits: usize) -> String {
    let precision = digits.max(1);
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i64 = exponent.parse().unwrap_or(0);
    let limit = i64::try_from(precision).unwrap_or(i64::MAX);

    if exponent < -4 || exponent >= limit {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = usize::try_from(limit - 1 - exponent).unwrap_or(0);
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn general_format_matches_printf() {
        assert_eq!(format_general(1.5, 15), "1.5");
        assert_eq!(format_general(100.0, 15), "100");
        assert_eq!(format_general(1e20, 15), "1e+20");
        assert_eq!(format_general(0.0001, 6), "0.0001");
        assert_eq!(format_general(0.00001, 6), "1e-05");
        assert_eq!(format_general(f64::MAX, 15), "1.79769313486232e+308");
        assert_eq!(format_general(f64::from(f32::MAX), 6), "3.40282e+38");
        assert_eq!(format_general(f64::from(0.1f32), 6), "0.1");
        assert_eq!(format_general(-2.5, 6), "-2.5");
        assert_eq!(format_general(999_999.5, 6), "1e+06");
    }

    #[test]
    fn special_float_tokens_per_dialect() {
        let sqlite = Dialect::sqlite();
        let mysql = Dialect::mysql();
        assert_eq!(sqlite.literal(&Value::Double(f64::NAN)), "'NaN'");
        assert_eq!(sqlite.literal(&Value::Double(f64::INFINITY)), "Inf");
        assert_eq!(sqlite.literal(&Value::Double(f64::NEG_INFINITY)), "-Inf");
        assert_eq!(mysql.literal(&Value::Float(f32::NAN)), "nan");
        assert_eq!(mysql.literal(&Value::Float(f32::NEG_INFINITY)), "-inf");
    }

    #[test]
    fn strings_and_blobs() {
        assert_eq!(Dialect::sqlite().literal(&Value::Text("it's".into())), "'it''s'");
        assert_eq!(
            Dialect::mysql().literal(&Value::Text("a'b\\c".into())),
            "'a\\'b\\\\c'"
        );
        assert_eq!(
            Dialect::sqlite().literal(&Value::Blob(vec![0x0a, 0xff])),
            "X'0aff'"
        );
        assert_eq!(Dialect::tds().literal(&Value::Blob(vec![0x0a, 0xff])), "0x0aff");
    }

    #[test]
    fn dates_and_timestamps() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let dt = d.and_hms_opt(3, 4, 5).unwrap();
        assert_eq!(Dialect::sqlite().literal(&Value::Date(d)), "'2024-01-02'");
        assert_eq!(Dialect::tds().literal(&Value::Date(d)), "'20240102'");
        assert_eq!(
            Dialect::sqlite().literal(&Value::DateTime(dt)),
            "'2024-01-02 03:04:05'"
        );
        assert_eq!(Dialect::sqlite().literal(&Value::Timestamp(86_400)), "86400");
        assert_eq!(
            Dialect::mysql().literal(&Value::Timestamp(86_400)),
            "FROM_UNIXTIME(86400)"
        );
    }

    #[test]
    fn booleans_and_null() {
        assert_eq!(Dialect::mysql().literal(&Value::Bool(true)), "TRUE");
        assert_eq!(Dialect::sqlite().literal(&Value::Bool(false)), "0");
        assert_eq!(Dialect::tds().literal(&Value::Null), "NULL");
    }
}
