//! Purpose: `RowCursor` over delimited text (TSV by default) read from any `BufRead`.
//! Exports: `DelimitedCursor`, `DelimitedOptions`, `infer_value`.
//! Role: Row source for the `rowshape` CLI; first line names the columns.
//! Invariants: Reads one line per `advance`; never buffers more than the current row.
//! Invariants: A row whose field count differs from the header is a scan error for that row.
//! Invariants: Every line after the header of a single-column input is a row, blank or not.
//! Notes: No quoting; fields cannot contain the delimiter or a newline.
use std::io::{self, BufRead};

use bstr::ByteSlice;

use crate::core::cursor::RowCursor;
use crate::core::error::{Error, ErrorKind};
use crate::core::value::{Slot, Value};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DelimitedOptions {
    pub delimiter: u8,
    pub null_token: String,
}

impl DelimitedOptions {
    pub fn new() -> Self {
        Self {
            delimiter: b'\t',
            null_token: String::new(),
        }
    }
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DelimitedCursor<R> {
    reader: R,
    options: DelimitedOptions,
    columns: Option<Vec<String>>,
    line: Vec<u8>,
    line_no: u64,
    rows: u64,
    has_row: bool,
}

impl<R: BufRead> DelimitedCursor<R> {
    pub fn new(reader: R, options: DelimitedOptions) -> Self {
        Self {
            reader,
            options,
            columns: None,
            line: Vec::new(),
            line_no: 0,
            rows: 0,
            has_row: false,
        }
    }

    /// Reads the next line into `self.line`. Returns false at EOF.
    ///
    /// Blank lines are skipped unless they can be a row: with a single column,
    /// an empty line is one empty field.
    fn read_line(&mut self) -> Result<bool, Error> {
        let keep_blank = self.columns.as_ref().is_some_and(|columns| columns.len() == 1);
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.line)
                .map_err(|err| read_error(err, self.line_no + 1))?;
            if read == 0 {
                return Ok(false);
            }
            self.line_no += 1;
            trim_line_end(&mut self.line);
            if keep_blank || !self.line.is_empty() {
                return Ok(true);
            }
        }
    }

    fn ensure_columns(&mut self) -> Result<(), Error> {
        if self.columns.is_some() {
            return Ok(());
        }
        let columns = if self.read_line()? {
            self.line
                .split_str(&[self.options.delimiter])
                .map(|name| name.to_str_lossy().into_owned())
                .collect()
        } else {
            Vec::new()
        };
        self.columns = Some(columns);
        Ok(())
    }
}

impl<R: BufRead> RowCursor for DelimitedCursor<R> {
    fn columns(&mut self) -> Result<Vec<String>, Error> {
        self.ensure_columns()?;
        Ok(self.columns.clone().unwrap_or_default())
    }

    fn advance(&mut self) -> Result<bool, Error> {
        self.ensure_columns()?;
        if self.has_row {
            self.rows += 1;
        }
        self.has_row = self.read_line()?;
        Ok(self.has_row)
    }

    fn copy_row(&mut self, slots: &mut [Slot<'_>]) -> Result<(), Error> {
        if !self.has_row {
            return Err(Error::new(ErrorKind::Usage).with_message("no current row to copy"));
        }
        let fields: Vec<&[u8]> = self.line.split_str(&[self.options.delimiter]).collect();
        if fields.len() != slots.len() {
            return Err(Error::new(ErrorKind::Scan)
                .with_message(format!(
                    "line {} has {} fields, expected {}",
                    self.line_no,
                    fields.len(),
                    slots.len()
                ))
                .with_row(self.rows)
                .with_column(fields.len().min(slots.len()))
                .with_hint("Check the delimiter and that every row has one field per column."));
        }
        for (slot, field) in slots.iter_mut().zip(fields) {
            slot.set(infer_value(field, &self.options.null_token));
        }
        Ok(())
    }
}

fn read_error(err: io::Error, line_no: u64) -> Error {
    Error::new(ErrorKind::Io)
        .with_message(format!("failed to read input line {line_no}"))
        .with_source(err)
}

fn trim_line_end(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}

/// Maps one raw field onto the narrowest matching `Value`.
pub fn infer_value(field: &[u8], null_token: &str) -> Value {
    if field == null_token.as_bytes() {
        return Value::Null;
    }
    let Ok(text) = field.to_str() else {
        return Value::Binary(field.to_vec());
    };
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(value) = text.parse::<i64>() {
        return Value::Integer(value);
    }
    if let Ok(value) = text.parse::<f64>() {
        if value.is_finite() {
            return Value::Float(value);
        }
    }
    if let Some(bytes) = text.strip_prefix("\\x").and_then(decode_hex) {
        return Value::Binary(bytes);
    }
    Value::Text(text.to_string())
}

fn decode_hex(digits: &str) -> Option<Vec<u8>> {
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| Some(hex_nibble(pair[0])? << 4 | hex_nibble(pair[1])?))
        .collect()
}

fn hex_nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{DelimitedCursor, DelimitedOptions, infer_value};
    use crate::core::adapter::RowAdapter;
    use crate::core::cursor::RowCursor;
    use crate::core::error::ErrorKind;
    use crate::core::value::Value;

    fn cursor(input: &str) -> DelimitedCursor<Cursor<Vec<u8>>> {
        DelimitedCursor::new(Cursor::new(input.as_bytes().to_vec()), DelimitedOptions::new())
    }

    #[test]
    fn infers_scalar_types() {
        assert_eq!(infer_value(b"", ""), Value::Null);
        assert_eq!(infer_value(b"NULL", "NULL"), Value::Null);
        assert_eq!(infer_value(b"true", ""), Value::Bool(true));
        assert_eq!(infer_value(b"-12", ""), Value::Integer(-12));
        assert_eq!(infer_value(b"-2.5", ""), Value::Float(-2.5));
        assert_eq!(infer_value(b"inf", ""), Value::from("inf"));
        assert_eq!(infer_value(b"foo", ""), Value::from("foo"));
        assert_eq!(
            infer_value(b"\\x414243", ""),
            Value::Binary(vec![0x41, 0x42, 0x43])
        );
        assert_eq!(infer_value(b"\\xZZ", ""), Value::from("\\xZZ"));
        assert_eq!(infer_value(&[0xff, 0x00], ""), Value::Binary(vec![0xff, 0x00]));
    }

    #[test]
    fn header_line_names_columns() {
        let mut source = cursor("a\tb\r\n1\tx\n");
        assert_eq!(
            source.columns().expect("columns"),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(source.columns().expect("columns again").len(), 2);
    }

    #[test]
    fn rows_flow_through_the_adapter() {
        let mut adapter = RowAdapter::new(cursor("a\tb\tc\n1\tfoo\t\n\n2\tbar\t-7.5\n"));
        assert!(adapter.advance());
        assert_eq!(
            adapter.current_row(),
            vec![Value::Integer(1), Value::from("foo"), Value::Null]
        );
        assert!(adapter.advance());
        assert_eq!(adapter.current_row()[2], Value::Float(-7.5));
        assert!(!adapter.advance());
        assert!(adapter.error().is_none());
    }

    #[test]
    fn ragged_row_is_a_scan_error() {
        let mut adapter = RowAdapter::new(cursor("a\tb\n1\t2\n3\n4\t5\n"));
        assert!(adapter.advance());
        assert!(!adapter.advance());
        let err = adapter.error().expect("scan error");
        assert_eq!(err.kind(), ErrorKind::Scan);
        assert_eq!(err.row(), Some(1));
        assert_eq!(err.message(), Some("line 3 has 1 fields, expected 2"));
        assert_eq!(err.column(), Some(1));
    }

    #[test]
    fn surplus_field_points_at_the_first_extra_column() {
        let mut adapter = RowAdapter::new(cursor("a\tb\n1\t2\t3\n"));
        assert!(!adapter.advance());
        let err = adapter.error().expect("scan error");
        assert_eq!(err.row(), Some(0));
        assert_eq!(err.column(), Some(2));
    }

    #[test]
    fn blank_line_in_single_column_input_is_a_null_row() {
        let rows: Vec<_> = RowAdapter::new(cursor("v\n1\n\n3\n")).rows(false).collect();
        assert_eq!(
            rows,
            vec![
                vec![Value::Integer(1)],
                vec![Value::Null],
                vec![Value::Integer(3)],
            ]
        );
    }

    #[test]
    fn blank_lines_before_the_header_are_skipped() {
        let mut adapter = RowAdapter::new(cursor("\n\nv\n\n7\n"));
        assert_eq!(adapter.columns(), vec!["v".to_string()]);
        assert!(adapter.advance());
        assert_eq!(adapter.current_row(), vec![Value::Null]);
        assert!(adapter.advance());
        assert_eq!(adapter.current_row(), vec![Value::Integer(7)]);
        assert!(!adapter.advance());
        assert!(adapter.error().is_none());
    }

    #[test]
    fn empty_input_has_no_columns_and_no_rows() {
        let mut adapter = RowAdapter::new(cursor(""));
        assert!(adapter.columns().is_empty());
        assert!(!adapter.advance());
        assert!(adapter.error().is_none());
    }

    #[test]
    fn custom_delimiter_and_null_token() {
        let options = DelimitedOptions {
            delimiter: b',',
            null_token: "NULL".to_string(),
        };
        let mut source = DelimitedCursor::new(Cursor::new(b"x,y\nNULL,\n".to_vec()), options);
        let mut adapter = RowAdapter::new(&mut source);
        assert!(adapter.advance());
        assert_eq!(adapter.current_row(), vec![Value::Null, Value::from("")]);
    }
}
