//! Helpers for tests and benchmarks. Enabled by the `test-utils` feature.

/// A backend driven entirely from the test.
pub mod scripted;

pub use scripted::{Script, ScriptLog, ScriptedBackend};

use crate::types::Value;

/// Build `count` single-column rows holding `0..count` as `I64`.
#[must_use]
pub fn counting_rows(count: i64) -> Vec<Vec<Value>> {
    (0..count).map(|i| vec![Value::I64(i)]).collect()
}
