use std::cell::{Cell, RefCell};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::trace;

use crate::error::DbError;
use crate::types::{LongDouble, ResultMode, Scalar, SqlType, UnixTimestamp, Value};

use super::Statement;
use super::params::{copy_bytes, copy_text};

type Writer<'a> = Box<dyn Fn(&Value) -> Result<(), DbError> + 'a>;

enum ResultTarget<'a> {
    Scalar(Writer<'a>),
    /// Read back through `Statement::result_text` / `result_blob`.
    Temporary,
    TextDup(Option<&'a RefCell<Option<String>>>),
    BlobDup(Option<&'a RefCell<Option<Vec<u8>>>>),
    Fixed {
        buf: Option<&'a RefCell<[u8]>>,
        terminate: bool,
    },
}

pub(crate) struct ResultBinding<'a> {
    pub(crate) ty: SqlType,
    mode: ResultMode,
    target: ResultTarget<'a>,
    null: Option<&'a Cell<bool>>,
    size: Option<&'a Cell<usize>>,
}

fn payload(value: &Value) -> Option<&[u8]> {
    match value {
        Value::Text(s) => Some(s.as_bytes()),
        Value::Blob(b) => Some(b),
        _ => None,
    }
}

fn column_mismatch(index: usize, value: &Value) -> DbError {
    DbError::TypeMismatch(format!("column {index} holds {}", value.sql_type()))
}

fn busy(what: &str) -> DbError {
    DbError::illegal(format!("{what} destination is already borrowed"))
}

impl ResultBinding<'_> {
    /// Write one fetched (already converted) column value to the caller's
    /// destinations.
    pub(crate) fn store(&self, value: &Value) -> Result<(), DbError> {
        if let Some(null) = self.null {
            null.set(value.is_null());
        }
        match &self.target {
            ResultTarget::Scalar(write) => {
                if !value.is_null() {
                    write(value)?;
                }
            }
            ResultTarget::Temporary => {}
            ResultTarget::TextDup(dest) => {
                if let Some(dest) = dest {
                    let copy = match value {
                        Value::Text(s) => Some(copy_text(s)?),
                        _ => None,
                    };
                    *dest.try_borrow_mut().map_err(|_| busy("text"))? = copy;
                }
            }
            ResultTarget::BlobDup(dest) => {
                if let Some(dest) = dest {
                    let copy = match value {
                        Value::Blob(b) => Some(copy_bytes(b)?),
                        _ => None,
                    };
                    *dest.try_borrow_mut().map_err(|_| busy("blob"))? = copy;
                }
            }
            ResultTarget::Fixed { buf, terminate } => {
                if let Some(buf) = buf {
                    let mut buf = buf.try_borrow_mut().map_err(|_| busy("fixed buffer"))?;
                    fill_fixed(&mut buf, payload(value).unwrap_or_default(), *terminate);
                }
            }
        }
        if let Some(size) = self.size {
            size.set(payload(value).map_or(0, <[u8]>::len));
        }
        Ok(())
    }
}

/// Copy as much of `data` as fits. Text keeps one byte for the terminator.
fn fill_fixed(buf: &mut [u8], data: &[u8], terminate: bool) {
    let room = if terminate {
        buf.len().saturating_sub(1)
    } else {
        buf.len()
    };
    let n = data.len().min(room);
    buf[..n].copy_from_slice(&data[..n]);
    if terminate && n < buf.len() {
        buf[n] = 0;
    }
}

impl<'a> Statement<'a> {
    fn check_result(&self, index: usize, ty: SqlType, mode: ResultMode) -> Result<(), DbError> {
        self.check_live("bind_result")?;
        let count = self.results.len();
        if index >= count {
            return Err(DbError::OutOfBounds { index, count });
        }
        self.db.borrow().backend.result_support(ty, mode)
    }

    fn store_result(
        &mut self,
        index: usize,
        ty: SqlType,
        mode: ResultMode,
        target: ResultTarget<'a>,
        size: Option<&'a Cell<usize>>,
        null: Option<&'a Cell<bool>>,
    ) {
        trace!(index, ty = %ty, mode = mode.as_str(), "result bound");
        self.results[index] = Some(ResultBinding {
            ty,
            mode,
            target,
            null,
            size,
        });
    }

    /// Deliver column `index` into `dest` on every fetched row. A NULL
    /// column leaves `dest` untouched and raises `null`.
    ///
    /// # Errors
    /// `OutOfBounds`, `UnsupportedType`, `UnsupportedMode`, `Illegal` after
    /// finalize.
    pub fn bind_result<T: Scalar>(
        &mut self,
        index: usize,
        dest: &'a Cell<T>,
        null: Option<&'a Cell<bool>>,
    ) -> Result<(), DbError> {
        self.check_result(index, T::SQL_TYPE, ResultMode::Fixed)?;
        let write: Writer<'a> = Box::new(move |value| {
            let typed = T::from_value(value).ok_or_else(|| {
                DbError::TypeMismatch(format!(
                    "cannot store {} as {}",
                    value.sql_type(),
                    T::SQL_TYPE
                ))
            })?;
            dest.set(typed);
            Ok(())
        });
        self.store_result(
            index,
            T::SQL_TYPE,
            ResultMode::Fixed,
            ResultTarget::Scalar(write),
            None,
            null,
        );
        Ok(())
    }

    /// Keep column `index` as text inside the statement; read it with
    /// [`Statement::result_text`] before the next execution.
    ///
    /// # Errors
    /// See [`Statement::bind_result`].
    pub fn bind_result_text(
        &mut self,
        index: usize,
        size: Option<&'a Cell<usize>>,
        null: Option<&'a Cell<bool>>,
    ) -> Result<(), DbError> {
        self.check_result(index, SqlType::Text, ResultMode::Temporary)?;
        self.store_result(
            index,
            SqlType::Text,
            ResultMode::Temporary,
            ResultTarget::Temporary,
            size,
            null,
        );
        Ok(())
    }

    /// Store an owned copy of column `index` into `dest` on every fetch.
    /// Taking the string out of `dest` releases it.
    ///
    /// # Errors
    /// See [`Statement::bind_result`]; `Oom` when a fetched copy cannot be
    /// allocated.
    pub fn bind_result_text_dup(
        &mut self,
        index: usize,
        dest: Option<&'a RefCell<Option<String>>>,
        size: Option<&'a Cell<usize>>,
        null: Option<&'a Cell<bool>>,
    ) -> Result<(), DbError> {
        self.check_result(index, SqlType::Text, ResultMode::Duplicate)?;
        self.store_result(
            index,
            SqlType::Text,
            ResultMode::Duplicate,
            ResultTarget::TextDup(dest),
            size,
            null,
        );
        Ok(())
    }

    /// Copy column `index` into the caller's buffer, truncated to its
    /// capacity minus one byte and NUL terminated. `size` always receives the
    /// full length, so a short buffer can be detected and grown.
    ///
    /// # Errors
    /// See [`Statement::bind_result`].
    pub fn bind_result_text_fix(
        &mut self,
        index: usize,
        buf: Option<&'a RefCell<[u8]>>,
        size: Option<&'a Cell<usize>>,
        null: Option<&'a Cell<bool>>,
    ) -> Result<(), DbError> {
        self.check_result(index, SqlType::Text, ResultMode::Fixed)?;
        self.store_result(
            index,
            SqlType::Text,
            ResultMode::Fixed,
            ResultTarget::Fixed {
                buf,
                terminate: true,
            },
            size,
            null,
        );
        Ok(())
    }

    /// # Errors
    /// See [`Statement::bind_result`].
    pub fn bind_result_blob(
        &mut self,
        index: usize,
        size: Option<&'a Cell<usize>>,
        null: Option<&'a Cell<bool>>,
    ) -> Result<(), DbError> {
        self.check_result(index, SqlType::Blob, ResultMode::Temporary)?;
        self.store_result(
            index,
            SqlType::Blob,
            ResultMode::Temporary,
            ResultTarget::Temporary,
            size,
            null,
        );
        Ok(())
    }

    /// # Errors
    /// See [`Statement::bind_result_text_dup`].
    pub fn bind_result_blob_dup(
        &mut self,
        index: usize,
        dest: Option<&'a RefCell<Option<Vec<u8>>>>,
        size: Option<&'a Cell<usize>>,
        null: Option<&'a Cell<bool>>,
    ) -> Result<(), DbError> {
        self.check_result(index, SqlType::Blob, ResultMode::Duplicate)?;
        self.store_result(
            index,
            SqlType::Blob,
            ResultMode::Duplicate,
            ResultTarget::BlobDup(dest),
            size,
            null,
        );
        Ok(())
    }

    /// Like [`Statement::bind_result_text_fix`] without the terminator: up
    /// to the buffer's capacity is copied.
    ///
    /// # Errors
    /// See [`Statement::bind_result`].
    pub fn bind_result_blob_fix(
        &mut self,
        index: usize,
        buf: Option<&'a RefCell<[u8]>>,
        size: Option<&'a Cell<usize>>,
        null: Option<&'a Cell<bool>>,
    ) -> Result<(), DbError> {
        self.check_result(index, SqlType::Blob, ResultMode::Fixed)?;
        self.store_result(
            index,
            SqlType::Blob,
            ResultMode::Fixed,
            ResultTarget::Fixed {
                buf,
                terminate: false,
            },
            size,
            null,
        );
        Ok(())
    }

    fn current_column(&self, index: usize) -> Result<&Value, DbError> {
        self.check_live("result")?;
        let count = self.results.len();
        if index >= count {
            return Err(DbError::OutOfBounds { index, count });
        }
        self.row
            .get(index)
            .ok_or_else(|| DbError::illegal("no row has been fetched"))
    }

    /// Text of column `index` in the current row, `None` for NULL.
    ///
    /// The view borrows the statement, so it cannot outlive the row it came
    /// from: the next `exec` needs `&mut self`.
    ///
    /// # Errors
    /// `OutOfBounds`; `Illegal` when no row is current; `TypeMismatch` when
    /// the column holds something other than text.
    pub fn result_text(&self, index: usize) -> Result<Option<&str>, DbError> {
        match self.current_column(index)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s)),
            other => Err(column_mismatch(index, other)),
        }
    }

    /// Bytes of column `index` in the current row, `None` for NULL.
    ///
    /// # Errors
    /// See [`Statement::result_text`].
    pub fn result_blob(&self, index: usize) -> Result<Option<&[u8]>, DbError> {
        match self.current_column(index)? {
            Value::Null => Ok(None),
            Value::Blob(b) => Ok(Some(b)),
            Value::Text(s) => Ok(Some(s.as_bytes())),
            other => Err(column_mismatch(index, other)),
        }
    }

    /// The current row as fetched, after conversion for bound columns.
    #[must_use]
    pub fn row(&self) -> &[Value] {
        &self.row
    }

    /// Mode of the result binding at `index`, if any.
    #[must_use]
    pub fn result_mode(&self, index: usize) -> Option<ResultMode> {
        self.results.get(index)?.as_ref().map(|binding| binding.mode)
    }
}

macro_rules! scalar_result_binders {
    ($($ty:ty => $name:ident)*) => {
        impl<'a> Statement<'a> {
            $(
                #[doc = concat!("Fetch column `index` into a `", stringify!($ty), "` cell.")]
                ///
                /// # Errors
                /// See [`Statement::bind_result`].
                pub fn $name(
                    &mut self,
                    index: usize,
                    dest: &'a Cell<$ty>,
                    null: Option<&'a Cell<bool>>,
                ) -> Result<(), DbError> {
                    self.bind_result(index, dest, null)
                }
            )*
        }
    };
}

scalar_result_binders! {
    bool => bind_result_bool
    i8 => bind_result_i8
    u8 => bind_result_u8
    i16 => bind_result_i16
    u16 => bind_result_u16
    i32 => bind_result_i32
    u32 => bind_result_u32
    i64 => bind_result_i64
    u64 => bind_result_u64
    f32 => bind_result_float
    f64 => bind_result_double
    LongDouble => bind_result_long_double
    NaiveDate => bind_result_date
    NaiveTime => bind_result_time
    NaiveDateTime => bind_result_datetime
    UnixTimestamp => bind_result_timestamp
}
