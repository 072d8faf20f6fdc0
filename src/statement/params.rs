use std::cell::{Cell, RefCell};
use std::convert::identity;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::trace;

use crate::error::DbError;
use crate::types::{LongDouble, ParamMode, Scalar, SqlType, UnixTimestamp, Value};

use super::Statement;

type Reader<'a> = Box<dyn Fn() -> Result<Value, DbError> + 'a>;

enum ParamSource<'a> {
    /// Copied at bind time.
    Value(Value),
    /// Re-read from caller storage at every execution.
    Reference {
        read: Reader<'a>,
        null: Option<&'a Cell<bool>>,
    },
}

pub(crate) struct ParamBinding<'a> {
    ty: SqlType,
    source: ParamSource<'a>,
}

impl ParamBinding<'_> {
    pub(crate) fn mode(&self) -> ParamMode {
        match self.source {
            ParamSource::Value(_) => ParamMode::Value,
            ParamSource::Reference { .. } => ParamMode::Reference,
        }
    }

    /// The value to send for the next execution. A raised null flag wins
    /// over whatever the storage holds.
    pub(crate) fn sample(&self) -> Result<Value, DbError> {
        match &self.source {
            ParamSource::Value(value) => Ok(value.clone()),
            ParamSource::Reference { null, .. } if null.is_some_and(Cell::get) => Ok(Value::Null),
            ParamSource::Reference { read, .. } => read(),
        }
    }
}

/// `text` cut to `len` bytes; `None` keeps all of it.
fn text_prefix(text: &str, len: Option<usize>) -> Result<&str, DbError> {
    match len {
        None => Ok(text),
        Some(n) if n > text.len() => Err(DbError::OutOfRange(format!(
            "length {n} exceeds the {} bytes of text",
            text.len()
        ))),
        Some(n) if !text.is_char_boundary(n) => Err(DbError::OutOfRange(format!(
            "length {n} splits a UTF-8 character"
        ))),
        Some(n) => Ok(&text[..n]),
    }
}

pub(super) fn copy_text(text: &str) -> Result<String, DbError> {
    let mut owned = String::new();
    owned
        .try_reserve_exact(text.len())
        .map_err(|_| DbError::Oom)?;
    owned.push_str(text);
    Ok(owned)
}

pub(super) fn copy_bytes(bytes: &[u8]) -> Result<Vec<u8>, DbError> {
    let mut owned = Vec::new();
    owned
        .try_reserve_exact(bytes.len())
        .map_err(|_| DbError::Oom)?;
    owned.extend_from_slice(bytes);
    Ok(owned)
}

impl<'a> Statement<'a> {
    /// Bounds first, then backend capability: an index past the end is
    /// `OutOfBounds` even for a type the backend would also reject.
    fn check_param(&self, index: usize, ty: SqlType, mode: ParamMode) -> Result<(), DbError> {
        self.check_live("bind")?;
        let count = self.params.len();
        if index >= count {
            return Err(DbError::OutOfBounds { index, count });
        }
        self.db.borrow().backend.param_support(ty, mode)
    }

    fn store_param(&mut self, index: usize, ty: SqlType, source: ParamSource<'a>) {
        let binding = ParamBinding { ty, source };
        trace!(index, ty = %binding.ty, mode = binding.mode().as_str(), "parameter bound");
        self.params[index] = Some(binding);
        self.cache.invalidate_expanded();
    }

    /// Bind a copy of `value`.
    ///
    /// # Errors
    /// `OutOfBounds`, `UnsupportedType`, `UnsupportedMode`, `Illegal` after
    /// finalize.
    pub fn bind<T: Scalar>(&mut self, index: usize, value: T) -> Result<(), DbError> {
        self.check_param(index, T::SQL_TYPE, ParamMode::Value)?;
        self.store_param(index, T::SQL_TYPE, ParamSource::Value(value.into_value()));
        Ok(())
    }

    /// Bind a copy of `value`, or NULL of type `T` for `None`.
    ///
    /// # Errors
    /// See [`Statement::bind`].
    pub fn bind_nullable<T: Scalar>(
        &mut self,
        index: usize,
        value: Option<T>,
    ) -> Result<(), DbError> {
        self.check_param(index, T::SQL_TYPE, ParamMode::Value)?;
        let value = value.map_or(Value::Null, Scalar::into_value);
        self.store_param(index, T::SQL_TYPE, ParamSource::Value(value));
        Ok(())
    }

    /// Bind `var` by reference: its content, and `null` if given, are read
    /// again at every execution, so one bind can drive many executions.
    ///
    /// # Errors
    /// See [`Statement::bind`].
    pub fn bind_ref<T: Scalar>(
        &mut self,
        index: usize,
        var: &'a Cell<T>,
        null: Option<&'a Cell<bool>>,
    ) -> Result<(), DbError> {
        self.check_param(index, T::SQL_TYPE, ParamMode::Reference)?;
        let read: Reader<'a> = Box::new(move || Ok(var.get().into_value()));
        self.store_param(index, T::SQL_TYPE, ParamSource::Reference { read, null });
        Ok(())
    }

    /// Bind SQL NULL.
    ///
    /// # Errors
    /// See [`Statement::bind`].
    pub fn bind_null(&mut self, index: usize) -> Result<(), DbError> {
        self.check_param(index, SqlType::Null, ParamMode::Value)?;
        self.store_param(index, SqlType::Null, ParamSource::Value(Value::Null));
        Ok(())
    }

    /// Bind a copy of the first `len` bytes of `text` (all of it for `None`).
    ///
    /// # Errors
    /// `OutOfRange` if `len` exceeds the text or splits a character, `Oom` if
    /// the copy cannot be allocated, plus the errors of [`Statement::bind`].
    pub fn bind_text(
        &mut self,
        index: usize,
        text: &str,
        len: Option<usize>,
    ) -> Result<(), DbError> {
        self.check_param(index, SqlType::Text, ParamMode::Value)?;
        let owned = copy_text(text_prefix(text, len)?)?;
        self.store_param(index, SqlType::Text, ParamSource::Value(Value::Text(owned)));
        Ok(())
    }

    /// Bind `text` by reference. `len`, when given, is also read at every
    /// execution and limits how many bytes are sent.
    ///
    /// # Errors
    /// See [`Statement::bind`]. Length problems surface at execution time.
    pub fn bind_text_ref(
        &mut self,
        index: usize,
        text: &'a RefCell<String>,
        len: Option<&'a Cell<usize>>,
        null: Option<&'a Cell<bool>>,
    ) -> Result<(), DbError> {
        self.check_param(index, SqlType::Text, ParamMode::Reference)?;
        let read: Reader<'a> = Box::new(move || {
            let current = text
                .try_borrow()
                .map_err(|_| DbError::illegal("bound text is mutably borrowed"))?;
            let prefix = text_prefix(&current, len.map(Cell::get))?;
            copy_text(prefix).map(Value::Text)
        });
        self.store_param(index, SqlType::Text, ParamSource::Reference { read, null });
        Ok(())
    }

    /// Bind a copy of `bytes`.
    ///
    /// # Errors
    /// `Oom` if the copy cannot be allocated, plus the errors of
    /// [`Statement::bind`].
    pub fn bind_blob(&mut self, index: usize, bytes: &[u8]) -> Result<(), DbError> {
        self.check_param(index, SqlType::Blob, ParamMode::Value)?;
        let owned = copy_bytes(bytes)?;
        self.store_param(index, SqlType::Blob, ParamSource::Value(Value::Blob(owned)));
        Ok(())
    }

    /// Bind `bytes` by reference.
    ///
    /// # Errors
    /// See [`Statement::bind`].
    pub fn bind_blob_ref(
        &mut self,
        index: usize,
        bytes: &'a RefCell<Vec<u8>>,
        null: Option<&'a Cell<bool>>,
    ) -> Result<(), DbError> {
        self.check_param(index, SqlType::Blob, ParamMode::Reference)?;
        let read: Reader<'a> = Box::new(move || {
            let current = bytes
                .try_borrow()
                .map_err(|_| DbError::illegal("bound blob is mutably borrowed"))?;
            copy_bytes(&current).map(Value::Blob)
        });
        self.store_param(index, SqlType::Blob, ParamSource::Reference { read, null });
        Ok(())
    }

    /// Bind a copy of a dynamically typed value, dispatching on its type.
    ///
    /// # Errors
    /// See [`Statement::bind`].
    pub fn bind_value(&mut self, index: usize, value: &Value) -> Result<(), DbError> {
        match value {
            Value::Null => self.bind_null(index),
            Value::Bool(v) => self.bind(index, *v),
            Value::I8(v) => self.bind(index, *v),
            Value::U8(v) => self.bind(index, *v),
            Value::I16(v) => self.bind(index, *v),
            Value::U16(v) => self.bind(index, *v),
            Value::I32(v) => self.bind(index, *v),
            Value::U32(v) => self.bind(index, *v),
            Value::I64(v) => self.bind(index, *v),
            Value::U64(v) => self.bind(index, *v),
            Value::Float(v) => self.bind(index, *v),
            Value::Double(v) => self.bind(index, *v),
            Value::LongDouble(v) => self.bind(index, LongDouble(*v)),
            Value::Text(s) => self.bind_text(index, s, None),
            Value::Blob(b) => self.bind_blob(index, b),
            Value::Date(v) => self.bind(index, *v),
            Value::Time(v) => self.bind(index, *v),
            Value::DateTime(v) => self.bind(index, *v),
            Value::Timestamp(v) => self.bind(index, UnixTimestamp(*v)),
        }
    }

    /// Forget every parameter binding; unbound parameters execute as NULL.
    ///
    /// # Errors
    /// `Illegal` after finalize.
    pub fn clear_bindings(&mut self) -> Result<(), DbError> {
        self.check_live("clear_bindings")?;
        self.params.iter_mut().for_each(|slot| *slot = None);
        self.cache.invalidate_expanded();
        Ok(())
    }
}

macro_rules! scalar_binders {
    ($($arg:ty => $ty:ty { $bind:ident, $bind_ref:ident, $wrap:path })*) => {
        impl<'a> Statement<'a> {
            $(
                #[doc = concat!("Bind a `", stringify!($ty), "` by value.")]
                ///
                /// # Errors
                /// See [`Statement::bind`].
                pub fn $bind(&mut self, index: usize, value: $arg) -> Result<(), DbError> {
                    self.bind(index, $wrap(value))
                }

                #[doc = concat!("Bind a `", stringify!($ty), "` by reference.")]
                ///
                /// # Errors
                /// See [`Statement::bind`].
                pub fn $bind_ref(
                    &mut self,
                    index: usize,
                    var: &'a Cell<$ty>,
                    null: Option<&'a Cell<bool>>,
                ) -> Result<(), DbError> {
                    self.bind_ref(index, var, null)
                }
            )*
        }
    };
}

scalar_binders! {
    bool => bool { bind_bool, bind_bool_ref, identity }
    i8 => i8 { bind_i8, bind_i8_ref, identity }
    u8 => u8 { bind_u8, bind_u8_ref, identity }
    i16 => i16 { bind_i16, bind_i16_ref, identity }
    u16 => u16 { bind_u16, bind_u16_ref, identity }
    i32 => i32 { bind_i32, bind_i32_ref, identity }
    u32 => u32 { bind_u32, bind_u32_ref, identity }
    i64 => i64 { bind_i64, bind_i64_ref, identity }
    u64 => u64 { bind_u64, bind_u64_ref, identity }
    f32 => f32 { bind_float, bind_float_ref, identity }
    f64 => f64 { bind_double, bind_double_ref, identity }
    f64 => LongDouble { bind_long_double, bind_long_double_ref, LongDouble }
    NaiveDate => NaiveDate { bind_date, bind_date_ref, identity }
    NaiveTime => NaiveTime { bind_time, bind_time_ref, identity }
    NaiveDateTime => NaiveDateTime { bind_datetime, bind_datetime_ref, identity }
    i64 => UnixTimestamp { bind_timestamp, bind_timestamp_ref, UnixTimestamp }
}
