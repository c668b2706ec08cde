//! Purpose: Bind a `RowCursor`, own its sticky error, and materialize rows one at a time.
//! Exports: `RowAdapter`, `row_to_map`.
//! Role: Cursor binding, row fetch primitive, and the synchronous current-row accessor.
//! Invariants: Column names are captured once and only handed out as copies.
//! Invariants: Once the sticky error is set or the cursor is exhausted,
//! the cursor is never touched again.
//! Invariants: Every fetched row has exactly one value per column.
use tracing::{debug, warn};

use crate::core::cursor::{RowCursor, scan_targets, slots_for};
use crate::core::error::Error;
use crate::core::value::{RowMap, Value};

pub struct RowAdapter<C> {
    cursor: Option<C>,
    columns: Vec<String>,
    current: Option<Vec<Value>>,
    fetched: u64,
    exhausted: bool,
    error: Option<Error>,
}

impl<C> RowAdapter<C> {
    pub fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names as a row of text values.
    pub fn header(&self) -> Vec<Value> {
        self.columns
            .iter()
            .map(|name| Value::Text(name.clone()))
            .collect()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// True once no further rows will be produced, cleanly or not.
    pub fn is_done(&self) -> bool {
        self.exhausted || self.error.is_some()
    }

    pub fn rows_fetched(&self) -> u64 {
        self.fetched
    }

    pub fn into_error(self) -> Option<Error> {
        self.error
    }

    pub fn into_parts(self) -> (Option<C>, Option<Error>) {
        (self.cursor, self.error)
    }

    pub(crate) fn fail(&mut self, err: Error) {
        if self.error.is_some() {
            return;
        }
        let err = if err.row().is_none() {
            err.with_row(self.fetched)
        } else {
            err
        };
        warn!(kind = ?err.kind(), row = self.fetched, error = %err, "row adapter halted");
        self.current = None;
        self.error = Some(err);
    }

    /// Copy of the current row.
    ///
    /// # Panics
    ///
    /// Panics when no row is current: before the first successful `advance`,
    /// or after `advance` returned false.
    pub fn current_row(&self) -> Vec<Value> {
        match &self.current {
            Some(row) => row.clone(),
            None => panic!(
                "current_row called without a current row; advance() must return true first"
            ),
        }
    }

    /// Copy of the current row keyed by column name.
    ///
    /// # Panics
    ///
    /// Same conditions as [`RowAdapter::current_row`].
    pub fn current_map(&self) -> RowMap {
        match &self.current {
            Some(row) => row_to_map(&self.columns, row.clone()),
            None => panic!(
                "current_map called without a current row; advance() must return true first"
            ),
        }
    }
}

impl<C: RowCursor> RowAdapter<C> {
    pub fn new(mut cursor: C) -> Self {
        match cursor.columns() {
            Ok(columns) => {
                debug!(columns = columns.len(), "bound row cursor");
                Self {
                    cursor: Some(cursor),
                    columns,
                    current: None,
                    fetched: 0,
                    exhausted: false,
                    error: None,
                }
            }
            Err(err) => {
                warn!(kind = ?err.kind(), error = %err, "listing columns failed");
                Self {
                    cursor: Some(cursor),
                    columns: Vec::new(),
                    current: None,
                    fetched: 0,
                    exhausted: false,
                    error: Some(err),
                }
            }
        }
    }

    /// Binds the outcome of executing a query. An `Err` makes the adapter inert
    /// without ever asking for column names.
    pub fn from_result(result: Result<C, Error>) -> Self {
        match result {
            Ok(cursor) => Self::new(cursor),
            Err(err) => Self::failed(err),
        }
    }

    pub fn failed(err: Error) -> Self {
        warn!(kind = ?err.kind(), error = %err, "row adapter created in failed state");
        Self {
            cursor: None,
            columns: Vec::new(),
            current: None,
            fetched: 0,
            exhausted: false,
            error: Some(err),
        }
    }

    /// Advances the cursor and returns the next row, or `None` when the rows
    /// ran out or the adapter failed. Check `error()` to tell the two apart.
    pub fn fetch_row(&mut self) -> Option<Vec<Value>> {
        if self.is_done() {
            return None;
        }
        let cursor = self.cursor.as_mut()?;
        match cursor.advance() {
            Ok(true) => {}
            Ok(false) => {
                debug!(rows = self.fetched, "row cursor exhausted");
                self.exhausted = true;
                self.current = None;
                return None;
            }
            Err(err) => {
                self.fail(err);
                return None;
            }
        }

        let mut values = scan_targets(self.columns.len());
        let copied = {
            let mut slots = slots_for(&mut values);
            cursor.copy_row(&mut slots)
        };
        if let Err(err) = copied {
            self.fail(err);
            return None;
        }
        self.fetched += 1;
        Some(values)
    }

    /// Makes the next row current. Returns false, permanently, once the rows
    /// ran out or the adapter failed.
    pub fn advance(&mut self) -> bool {
        self.current = self.fetch_row();
        self.current.is_some()
    }
}

/// Pairs column names with row values in column order. A repeated column name
/// keeps the value of its last occurrence.
pub fn row_to_map(columns: &[String], row: Vec<Value>) -> RowMap {
    let mut map = RowMap::new();
    for (name, value) in columns.iter().zip(row) {
        map.insert(name.clone(), value);
    }
    map
}
