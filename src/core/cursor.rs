//! Purpose: Driver-facing cursor contract plus per-row scan target construction.
//! Exports: `RowCursor`, `scan_targets`, `slots_for`.
//! Role: The only seam between the row adapter and a database driver.
//! Invariants: Scan targets are allocated fresh per row and sized to the column count.
//! Invariants: Slot `i` always writes into position `i` of its row.
use crate::core::error::Error;
use crate::core::value::{Slot, Value};

/// Forward-only, single-pass result cursor.
///
/// Implementations advance one row at a time and copy the current row into
/// caller-supplied slots, one slot per column in column order.
pub trait RowCursor {
    /// Column names of the result, in column order.
    fn columns(&mut self) -> Result<Vec<String>, Error>;

    /// Moves to the next row. `Ok(false)` means the result is exhausted.
    fn advance(&mut self) -> Result<bool, Error>;

    /// Copies the current row's values into `slots`.
    fn copy_row(&mut self, slots: &mut [Slot<'_>]) -> Result<(), Error>;
}

impl<C: RowCursor + ?Sized> RowCursor for &mut C {
    fn columns(&mut self) -> Result<Vec<String>, Error> {
        (**self).columns()
    }

    fn advance(&mut self) -> Result<bool, Error> {
        (**self).advance()
    }

    fn copy_row(&mut self, slots: &mut [Slot<'_>]) -> Result<(), Error> {
        (**self).copy_row(slots)
    }
}

impl<C: RowCursor + ?Sized> RowCursor for Box<C> {
    fn columns(&mut self) -> Result<Vec<String>, Error> {
        (**self).columns()
    }

    fn advance(&mut self) -> Result<bool, Error> {
        (**self).advance()
    }

    fn copy_row(&mut self, slots: &mut [Slot<'_>]) -> Result<(), Error> {
        (**self).copy_row(slots)
    }
}

pub fn scan_targets(len: usize) -> Vec<Value> {
    vec![Value::Null; len]
}

pub fn slots_for(values: &mut [Value]) -> Vec<Slot<'_>> {
    values.iter_mut().map(Slot::new).collect()
}
