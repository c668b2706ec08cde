//! Purpose: In-memory `RowCursor` for tests, demos, and callers holding rows already.
//! Exports: `MemoryCursor`.
//! Role: Reference cursor with deterministic failure injection.
//! Invariants: Rows are handed out once, in order; the cursor never rewinds.
//! Invariants: Injected failures fire only at the configured zero-based row index.
use std::collections::VecDeque;

use crate::core::cursor::RowCursor;
use crate::core::error::{Error, ErrorKind};
use crate::core::value::{Slot, Value};

type RowGenerator = Box<dyn FnMut(u64) -> Vec<Value> + Send>;

enum RowSource {
    Fixed(VecDeque<Vec<Value>>),
    Generated(RowGenerator),
}

pub struct MemoryCursor {
    columns: Vec<String>,
    source: RowSource,
    current: Option<Vec<Value>>,
    advanced: u64,
    fail_columns: Option<String>,
    fail_advance_at: Option<u64>,
    fail_scan_at: Option<u64>,
}

impl MemoryCursor {
    pub fn new<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_source(columns, RowSource::Fixed(rows.into()))
    }

    /// Cursor that never runs out; `generate` receives the zero-based row index.
    pub fn unbounded<I, S, F>(columns: I, generate: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(u64) -> Vec<Value> + Send + 'static,
    {
        Self::with_source(columns, RowSource::Generated(Box::new(generate)))
    }

    fn with_source<I, S>(columns: I, source: RowSource) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            source,
            current: None,
            advanced: 0,
            fail_columns: None,
            fail_advance_at: None,
            fail_scan_at: None,
        }
    }

    pub fn fail_columns(mut self, message: impl Into<String>) -> Self {
        self.fail_columns = Some(message.into());
        self
    }

    pub fn fail_advance_at(mut self, row: u64) -> Self {
        self.fail_advance_at = Some(row);
        self
    }

    pub fn fail_scan_at(mut self, row: u64) -> Self {
        self.fail_scan_at = Some(row);
        self
    }

    /// Number of successful `advance` calls so far.
    pub fn advanced(&self) -> u64 {
        self.advanced
    }
}

impl RowCursor for MemoryCursor {
    fn columns(&mut self) -> Result<Vec<String>, Error> {
        if let Some(message) = &self.fail_columns {
            return Err(Error::new(ErrorKind::Cursor).with_message(message.clone()));
        }
        Ok(self.columns.clone())
    }

    fn advance(&mut self) -> Result<bool, Error> {
        let index = self.advanced;
        if self.fail_advance_at == Some(index) {
            self.current = None;
            return Err(Error::new(ErrorKind::Cursor)
                .with_message("injected advance failure")
                .with_row(index));
        }
        self.current = match &mut self.source {
            RowSource::Fixed(rows) => rows.pop_front(),
            RowSource::Generated(generate) => Some(generate(index)),
        };
        if self.current.is_none() {
            return Ok(false);
        }
        self.advanced += 1;
        Ok(true)
    }

    fn copy_row(&mut self, slots: &mut [Slot<'_>]) -> Result<(), Error> {
        let Some(row) = &self.current else {
            return Err(Error::new(ErrorKind::Usage).with_message("no current row to copy"));
        };
        let index = self.advanced - 1;
        if self.fail_scan_at == Some(index) {
            return Err(Error::new(ErrorKind::Scan)
                .with_message("injected scan failure")
                .with_row(index));
        }
        if row.len() != slots.len() {
            return Err(Error::new(ErrorKind::Scan)
                .with_message(format!(
                    "row has {} values but {} slots were supplied",
                    row.len(),
                    slots.len()
                ))
                .with_row(index)
                .with_column(row.len().min(slots.len())));
        }
        for (slot, value) in slots.iter_mut().zip(row) {
            slot.set(value.clone());
        }
        Ok(())
    }
}
