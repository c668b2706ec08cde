//! Purpose: Dynamically typed column value plus the writable scan slot that fills it.
//! Exports: `Value`, `Slot`, `RowMap`.
//! Role: Row buffer element type shared by cursors, projections, and encoders.
//! Invariants: A `Slot` writes into exactly one `Value` and never resizes its row.
//! Invariants: `Binary` serializes as raw bytes; text conversion happens only in `normalize`.
use std::collections::BTreeMap;

use serde::ser::{Serialize, Serializer};

/// Name-keyed view of one row.
pub type RowMap = BTreeMap<String, Value>;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Binary(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Float(value) => serializer.serialize_f64(*value),
            Value::Text(value) => serializer.serialize_str(value),
            Value::Binary(value) => serializer.serialize_bytes(value),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Binary(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Binary(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Writable target for one column of the row being scanned.
#[derive(Debug)]
pub struct Slot<'a> {
    target: &'a mut Value,
}

impl<'a> Slot<'a> {
    pub fn new(target: &'a mut Value) -> Self {
        Self { target }
    }

    pub fn set(&mut self, value: impl Into<Value>) {
        *self.target = value.into();
    }

    pub fn get(&self) -> &Value {
        &*self.target
    }
}

#[cfg(test)]
mod tests {
    use super::{Slot, Value};

    #[test]
    fn slot_writes_through_to_its_target() {
        let mut value = Value::Null;
        {
            let mut slot = Slot::new(&mut value);
            slot.set("foo");
            assert_eq!(slot.get(), &Value::Text("foo".to_string()));
        }
        assert_eq!(value, Value::Text("foo".to_string()));
    }

    #[test]
    fn option_none_converts_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7i64)), Value::Integer(7));
    }

    #[test]
    fn scalars_serialize_as_json_literals() {
        let row = vec![
            Value::Integer(1),
            Value::Text("foo".to_string()),
            Value::Float(-2.5),
            Value::Bool(true),
            Value::Null,
        ];
        let json = serde_json::to_string(&row).expect("encode");
        assert_eq!(json, r#"[1,"foo",-2.5,true,null]"#);
    }

    #[test]
    fn binary_serializes_as_raw_bytes() {
        let json = serde_json::to_string(&Value::Binary(vec![0x41, 0x42])).expect("encode");
        assert_eq!(json, "[65,66]");
    }
}
