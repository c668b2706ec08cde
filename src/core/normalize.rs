//! Purpose: Binary-to-text normalization applied before rows are serialized.
//! Exports: `normalize_value`, `normalize_row`, `normalize_map`.
//! Role: The single type coercion the crate performs.
//! Invariants: Only `Value::Binary` changes; every other value, `Null` included, passes through.
//! Invariants: Invalid UTF-8 is replaced with U+FFFD rather than failing the record.
use bstr::ByteSlice;

use crate::core::value::{RowMap, Value};

pub fn normalize_value(value: Value) -> Value {
    match value {
        Value::Binary(bytes) => Value::Text(bytes.to_str_lossy().into_owned()),
        other => other,
    }
}

pub fn normalize_row(row: Vec<Value>) -> Vec<Value> {
    row.into_iter().map(normalize_value).collect()
}

pub fn normalize_map(map: RowMap) -> RowMap {
    map.into_iter()
        .map(|(name, value)| (name, normalize_value(value)))
        .collect()
}
