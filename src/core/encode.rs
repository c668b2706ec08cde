//! Purpose: Text encoder seam used by the serialization projections.
//! Exports: `Encoder`, `JsonEncoder`.
//! Role: Turns one normalized row or row map into one text record.
//! Invariants: `JsonEncoder` output is a single line unless `pretty` is set.
//! Invariants: Encoder failures surface as `ErrorKind::Encode`.
use serde::Serialize;

use crate::core::error::{Error, ErrorKind};

pub trait Encoder {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, Error>;
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct JsonEncoder {
    pub pretty: bool,
}

impl JsonEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Encoder for JsonEncoder {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, Error> {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        encoded.map_err(|err| {
            Error::new(ErrorKind::Encode)
                .with_message("failed to encode record as json")
                .with_source(err)
        })
    }
}
