use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::database::Database;
use crate::error::DbError;
use crate::sql_text::{Dialect, DialectKind};

use super::SqliteBackend;

/// Options for opening a `SQLite` database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    #[serde(default)]
    pub read_only: bool,
    /// Busy timeout in milliseconds.
    #[serde(default)]
    pub busy_timeout: Option<u64>,
    /// Literal rules for expanded SQL.
    #[serde(default)]
    pub dialect: DialectKind,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            read_only: false,
            busy_timeout: None,
            dialect: DialectKind::Sqlite,
        }
    }

    /// Parse options from JSON, e.g. `{"db_path": "app.db", "read_only": true}`.
    ///
    /// # Errors
    /// Returns `DbError::Connection` if the document is not valid options.
    pub fn from_json(json: &str) -> Result<Self, DbError> {
        serde_json::from_str(json)
            .map_err(|e| DbError::Connection(format!("invalid SQLite options: {e}")))
    }

    /// Open the database and wrap it in a [`Database`] handle.
    ///
    /// # Errors
    /// Returns the driver error if the file cannot be opened or configured.
    pub fn open(&self) -> Result<Database, DbError> {
        let conn = if self.read_only {
            Connection::open_with_flags(
                &self.db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            Connection::open(&self.db_path)?
        };
        if let Some(ms) = self.busy_timeout {
            conn.busy_timeout(Duration::from_millis(ms))?;
        }
        debug!(path = %self.db_path, read_only = self.read_only, "sqlite database opened");
        Ok(Database::new(SqliteBackend::new(conn, Dialect::for_kind(self.dialect))))
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.opts.read_only = read_only;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn dialect(mut self, dialect: DialectKind) -> Self {
        self.opts.dialect = dialect;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Open a [`Database`] with the collected options.
    ///
    /// # Errors
    /// See [`SqliteOptions::open`].
    pub fn open(self) -> Result<Database, DbError> {
        self.finish().open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_options() {
        let opts = SqliteOptionsBuilder::new("app.db".into())
            .read_only(true)
            .busy_timeout(Duration::from_secs(2))
            .dialect(DialectKind::Mysql)
            .finish();
        assert_eq!(
            opts,
            SqliteOptions {
                db_path: "app.db".into(),
                read_only: true,
                busy_timeout: Some(2000),
                dialect: DialectKind::Mysql,
            }
        );
    }

    #[test]
    fn json_fills_defaults() {
        let opts =
            SqliteOptions::from_json(r#"{"db_path": ":memory:", "dialect": "tds"}"#).unwrap();
        assert_eq!(opts.db_path, ":memory:");
        assert!(!opts.read_only);
        assert_eq!(opts.busy_timeout, None);
        assert_eq!(opts.dialect, DialectKind::Tds);
        assert!(SqliteOptions::from_json("{}").is_err());
    }

    #[test]
    fn opens_in_memory() {
        let db = SqliteOptions::new(":memory:".into()).open().unwrap();
        assert_eq!(db.backend_name(), "sqlite");
    }
}
