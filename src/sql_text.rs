//! SQL text materialization: escaping, placeholder discovery and literal
//! expansion.

mod escape;
mod literal;
mod scanner;

use crate::error::DbError;
use crate::types::{SqlVariant, Value};

pub use escape::escape_control;
pub use literal::{
    BlobStyle, Dialect, DialectKind, StringEscape, TimestampStyle, format_general,
};
pub use scanner::{Placeholder, count_placeholders, scan_placeholders};

/// Replace every placeholder in `sql` with the literal for its bound value.
/// Placeholders with no value render as `NULL`.
///
/// # Errors
/// Returns `DbError::Oom` if the output buffer cannot grow.
pub fn expand_sql(sql: &str, params: &[Value], dialect: &Dialect) -> Result<String, DbError> {
    let mut out = String::new();
    out.try_reserve(sql.len()).map_err(|_| DbError::Oom)?;

    let mut copied = 0;
    for placeholder in scan_placeholders(sql) {
        out.push_str(&sql[copied..placeholder.start]);
        let value = params.get(placeholder.index()).unwrap_or(&Value::Null);
        dialect
            .write_literal(value, &mut out)
            .map_err(|_| DbError::Oom)?;
        copied = placeholder.end;
    }
    out.push_str(&sql[copied..]);
    Ok(out)
}

/// The per-statement cache of rendered SQL variants.
#[derive(Debug, Default)]
pub(crate) struct SqlCache {
    slots: [Option<String>; 4],
}

impl SqlCache {
    pub(crate) fn get(&self, variant: SqlVariant) -> Option<&str> {
        self.slots[variant.slot()].as_deref()
    }

    pub(crate) fn contains(&self, variant: SqlVariant) -> bool {
        self.slots[variant.slot()].is_some()
    }

    pub(crate) fn insert(&mut self, variant: SqlVariant, text: String) {
        self.slots[variant.slot()] = Some(text);
    }

    /// Drop the variants that depend on bound values.
    pub(crate) fn invalidate_expanded(&mut self) {
        self.slots[SqlVariant::Expanded.slot()] = None;
        self.slots[SqlVariant::ExpandedEscaped.slot()] = None;
    }

    pub(crate) fn clear(&mut self) {
        self.slots = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_in_order_and_defaults_to_null() {
        let sql = "insert into t values(?, ?, '?')";
        let out = expand_sql(sql, &[Value::I32(1)], &Dialect::sqlite()).unwrap();
        assert_eq!(out, "insert into t values(1, NULL, '?')");
    }

    #[test]
    fn numbered_and_named_placeholders_reuse_values() {
        let params = [Value::Text("a".into()), Value::I64(-5)];
        let out = expand_sql("select ?2, :x, ?2, :x;", &params, &Dialect::sqlite()).unwrap();
        assert_eq!(out, "select -5, NULL, -5, NULL;");
        let out = expand_sql("select :x, ?1, :y;", &params, &Dialect::sqlite()).unwrap();
        assert_eq!(out, "select 'a', 'a', -5;");
    }

    #[test]
    fn cache_invalidation_keeps_plain_variants() {
        let mut cache = SqlCache::default();
        cache.insert(SqlVariant::Plain, "p".into());
        cache.insert(SqlVariant::Escaped, "e".into());
        cache.insert(SqlVariant::Expanded, "x".into());
        cache.insert(SqlVariant::ExpandedEscaped, "xe".into());
        cache.invalidate_expanded();
        assert_eq!(cache.get(SqlVariant::Plain), Some("p"));
        assert_eq!(cache.get(SqlVariant::Escaped), Some("e"));
        assert!(!cache.contains(SqlVariant::Expanded));
        assert!(!cache.contains(SqlVariant::ExpandedEscaped));
        cache.clear();
        assert!(!cache.contains(SqlVariant::Plain));
    }
}
