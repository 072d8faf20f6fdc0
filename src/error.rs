use std::fmt;

use thiserror::Error;

use crate::types::SqlType;

/// The closed set of failure kinds shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AccessDenied,
    Busy,
    Callback,
    Connection,
    Constraint,
    Extended,
    Full,
    Illegal,
    MalformedSql,
    MaxConnections,
    MultiStmt,
    NoDb,
    NoName,
    Oom,
    OutOfBounds,
    OutOfRange,
    TypeMismatch,
    UnknownDb,
    UnknownHost,
    UnknownLanguage,
    UnknownType,
    Unsupported,
    UnsupportedMode,
    UnsupportedType,
    VersionMismatch,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::AccessDenied => "access denied",
            ErrorKind::Busy => "busy",
            ErrorKind::Callback => "callback error",
            ErrorKind::Connection => "connection error",
            ErrorKind::Constraint => "constraint violation",
            ErrorKind::Extended => "extended error",
            ErrorKind::Full => "database full",
            ErrorKind::Illegal => "illegal operation",
            ErrorKind::MalformedSql => "malformed SQL",
            ErrorKind::MaxConnections => "too many connections",
            ErrorKind::MultiStmt => "multiple statements not supported",
            ErrorKind::NoDb => "no database selected",
            ErrorKind::NoName => "no name available",
            ErrorKind::Oom => "out of memory",
            ErrorKind::OutOfBounds => "out of bounds",
            ErrorKind::OutOfRange => "out of range",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::UnknownDb => "unknown database",
            ErrorKind::UnknownHost => "unknown host",
            ErrorKind::UnknownLanguage => "unknown language",
            ErrorKind::UnknownType => "unknown type",
            ErrorKind::Unsupported => "unsupported operation",
            ErrorKind::UnsupportedMode => "unsupported mode",
            ErrorKind::UnsupportedType => "unsupported type",
            ErrorKind::VersionMismatch => "version mismatch",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend-native error chained beneath a generic [`DbError::Extended`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{backend} error {code}: {message}")]
pub struct BackendError {
    /// Name of the backend that produced the error.
    pub backend: &'static str,
    /// Native error code (e.g. the SQLite extended result code).
    pub code: i32,
    pub message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(backend: &'static str, code: i32, message: impl Into<String>) -> Self {
        Self {
            backend,
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("database busy: {0}")]
    Busy(String),

    #[error("record callback aborted at row {row}")]
    Callback { row: usize },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A generic kind with the backend's own error attached as the source.
    #[error("{kind}: {source}")]
    Extended {
        kind: ErrorKind,
        #[source]
        source: BackendError,
    },

    #[error("database full: {0}")]
    Full(String),

    #[error("illegal operation: {0}")]
    Illegal(String),

    #[error("malformed SQL: {0}")]
    MalformedSql(String),

    #[error("too many connections")]
    MaxConnections,

    #[error("multiple statements are not supported")]
    MultiStmt,

    #[error("no database selected")]
    NoDb,

    #[error("no name available: {0}")]
    NoName(String),

    #[error("out of memory")]
    Oom,

    #[error("index {index} out of bounds (count {count})")]
    OutOfBounds { index: usize, count: usize },

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unknown database: {0}")]
    UnknownDb(String),

    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("unsupported binding mode {mode} for {ty}")]
    UnsupportedMode { ty: SqlType, mode: &'static str },

    #[error("unsupported type: {0}")]
    UnsupportedType(SqlType),

    #[error("version mismatch: {0}")]
    VersionMismatch(String),
}

impl DbError {
    /// The generic kind of this error. For [`DbError::Extended`] this is the
    /// kind the backend error was classified as, not `ErrorKind::Extended`.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::AccessDenied(_) => ErrorKind::AccessDenied,
            DbError::Busy(_) => ErrorKind::Busy,
            DbError::Callback { .. } => ErrorKind::Callback,
            DbError::Connection(_) => ErrorKind::Connection,
            DbError::Constraint(_) => ErrorKind::Constraint,
            DbError::Extended { kind, .. } => *kind,
            DbError::Full(_) => ErrorKind::Full,
            DbError::Illegal(_) => ErrorKind::Illegal,
            DbError::MalformedSql(_) => ErrorKind::MalformedSql,
            DbError::MaxConnections => ErrorKind::MaxConnections,
            DbError::MultiStmt => ErrorKind::MultiStmt,
            DbError::NoDb => ErrorKind::NoDb,
            DbError::NoName(_) => ErrorKind::NoName,
            DbError::Oom => ErrorKind::Oom,
            DbError::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            DbError::OutOfRange(_) => ErrorKind::OutOfRange,
            DbError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            DbError::UnknownDb(_) => ErrorKind::UnknownDb,
            DbError::UnknownHost(_) => ErrorKind::UnknownHost,
            DbError::UnknownLanguage(_) => ErrorKind::UnknownLanguage,
            DbError::UnknownType(_) => ErrorKind::UnknownType,
            DbError::Unsupported(_) => ErrorKind::Unsupported,
            DbError::UnsupportedMode { .. } => ErrorKind::UnsupportedMode,
            DbError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            DbError::VersionMismatch(_) => ErrorKind::VersionMismatch,
        }
    }

    /// True when a backend-native error is chained beneath this one.
    #[must_use]
    pub fn is_extended(&self) -> bool {
        matches!(self, DbError::Extended { .. })
    }

    #[must_use]
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            DbError::Extended { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Wrap a backend-native error under a generic kind.
    #[must_use]
    pub fn extended(kind: ErrorKind, source: BackendError) -> Self {
        DbError::Extended { kind, source }
    }

    pub(crate) fn illegal(msg: impl Into<String>) -> Self {
        DbError::Illegal(msg.into())
    }

    pub(crate) fn unsupported(backend: &str, operation: &str) -> Self {
        DbError::Unsupported(format!("{backend} does not implement {operation}"))
    }
}
