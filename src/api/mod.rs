//! Purpose: Define the stable public Rust API boundary for rowshape.
//! Exports: Adapter, projection streams, cursor contract, value types, encoders, errors.
//! Role: Public, additive-only surface; hides internal module layout.
//! Invariants: This module is the only public path to core types.
//! Invariants: Internal modules remain private and are not directly exposed.

pub use crate::core::adapter::{RowAdapter, row_to_map};
pub use crate::core::cursor::{RowCursor, scan_targets, slots_for};
pub use crate::core::encode::{Encoder, JsonEncoder};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::memory::MemoryCursor;
pub use crate::core::normalize::{normalize_map, normalize_row, normalize_value};
pub use crate::core::stream::RowStream;
pub use crate::core::value::{RowMap, Slot, Value};
pub use crate::delimited::{DelimitedCursor, DelimitedOptions, infer_value};
