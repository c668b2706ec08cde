//! Purpose: `rowshape` CLI entry point; exports delimited text rows as JSON records.
//! Role: Binary crate root; parses args, streams one record per line to stdout.
//! Invariants: Stdout carries only records; diagnostics and logs go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::error::Error as StdError;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rowshape::api::{
    DelimitedCursor, DelimitedOptions, Error, ErrorKind, JsonEncoder, RowAdapter, RowStream,
    to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

#[derive(Parser, Debug)]
#[command(
    name = "rowshape",
    version,
    about = "Export delimited rows as JSON records, one per line",
    long_about = None,
    after_help = r#"INPUT
  The first non-empty line names the columns. Fields are typed as:
  null token -> null, true/false -> bool, integers, finite floats,
  \x<hex> -> bytes (emitted as text), anything else -> string.

EXAMPLES
  $ rowshape --header table.tsv
  ["a","b"]
  [1,"foo"]
  $ rowshape --format object --delimiter , table.csv
  {"a":1,"b":"foo"}"#
)]
struct Cli {
    #[arg(
        long,
        value_enum,
        default_value = "array",
        help = "Record shape: array (positional) or object (keyed by column)"
    )]
    format: RecordFormat,
    #[arg(long, help = "Emit the column names as the first record (array format only)")]
    header: bool,
    #[arg(
        long,
        default_value = "tab",
        value_parser = parse_delimiter,
        help = "Field delimiter: a single ASCII character, or `tab`"
    )]
    delimiter: u8,
    #[arg(
        long = "null",
        default_value = "",
        help = "Field text that reads as null (default: empty field)"
    )]
    null_token: String,
    #[arg(long, help = "Stop after this many records (header included)")]
    limit: Option<u64>,
    #[arg(long, help = "Pretty-print each record across multiple lines")]
    pretty: bool,
    #[arg(value_hint = ValueHint::FilePath, help = "Input file (default: stdin)")]
    input: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum RecordFormat {
    Array,
    Object,
}

#[derive(Clone, Debug)]
struct ExportConfig {
    format: RecordFormat,
    header: bool,
    source: DelimitedOptions,
    limit: Option<u64>,
    encoder: JsonEncoder,
    input: Option<PathBuf>,
}

impl ExportConfig {
    fn from_cli(cli: Cli) -> Result<Self, Error> {
        if cli.header && cli.format == RecordFormat::Object {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("--header only applies to --format array")
                .with_hint("Object records already carry column names; drop --header."));
        }
        Ok(Self {
            format: cli.format,
            header: cli.header,
            source: DelimitedOptions {
                delimiter: cli.delimiter,
                null_token: cli.null_token,
            },
            limit: cli.limit,
            encoder: JsonEncoder {
                pretty: cli.pretty,
            },
            input: cli.input,
        })
    }
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                return Ok(RunOutcome::with_code(0));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `rowshape --help` for usage."));
            }
        },
    };

    init_tracing();
    let config = ExportConfig::from_cli(cli)?;
    let reader = open_input(config.input.as_ref())?;
    let adapter = RowAdapter::new(DelimitedCursor::new(reader, config.source.clone()));
    debug!(columns = adapter.column_count(), format = ?config.format, "starting export");

    let stream = match config.format {
        RecordFormat::Array => adapter.array_records(config.header, config.encoder),
        RecordFormat::Object => adapter.object_records(config.encoder),
    };
    export(stream, config.limit)
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn BufRead + Send>, Error> {
    let Some(path) = path else {
        return Ok(Box::new(BufReader::new(io::stdin())));
    };
    let file = File::open(path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to open {}", path.display()))
            .with_hint("Check the input path, or omit it to read stdin.")
            .with_source(err)
    })?;
    Ok(Box::new(BufReader::new(file)))
}

fn export<C>(mut stream: RowStream<C, String>, limit: Option<u64>) -> Result<RunOutcome, Error> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut written = 0u64;
    while limit.is_none_or(|max| written < max) {
        let Some(record) = stream.next() else {
            break;
        };
        writeln!(out, "{record}").map_err(write_error)?;
        written += 1;
    }
    out.flush().map_err(write_error)?;

    // Past the limit the producer may be blocked reading input that never
    // ends; dropping the stream detaches it instead of joining.
    if limit.is_some_and(|max| written >= max) {
        debug!(records = written, "record limit reached");
        drop(stream);
        return Ok(RunOutcome::ok());
    }

    let adapter = stream.close();
    debug!(
        records = written,
        rows = adapter.rows_fetched(),
        "export finished"
    );
    match adapter.into_error() {
        Some(err) => Err(err),
        None => Ok(RunOutcome::ok()),
    }
}

fn write_error(err: io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("failed to write records to stdout")
        .with_source(err)
}

fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [byte] if byte.is_ascii() && *byte != b'\n' && *byte != b'\r' => Ok(*byte),
            _ => Err(format!(
                "expected a single ASCII character or `tab`, got {raw:?}"
            )),
        },
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Cursor => "cursor error".to_string(),
        ErrorKind::Scan => "row scan failed".to_string(),
        ErrorKind::Encode => "record encoding failed".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(row) = err.row() {
        inner.insert("row".to_string(), json!(row));
    }
    if let Some(column) = err.column() {
        inner.insert("column".to_string(), json!(column));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(row) = err.row() {
        lines.push(format!("row: {row}"));
    }
    if let Some(column) = err.column() {
        lines.push(format!("column: {column}"));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, ExportConfig, RecordFormat, error_json, error_text, parse_delimiter};
    use clap::Parser;
    use rowshape::api::{Error, ErrorKind};

    #[test]
    fn delimiter_accepts_tab_names_and_single_chars() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert_eq!(parse_delimiter(","), Ok(b','));
        assert!(parse_delimiter(",,").is_err());
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn header_with_object_format_is_a_usage_error() {
        let cli = Cli::try_parse_from(["rowshape", "--format", "object", "--header"])
            .expect("parse");
        let err = ExportConfig::from_cli(cli).expect_err("usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.hint().is_some());
    }

    #[test]
    fn defaults_read_tsv_as_array_records() {
        let cli = Cli::try_parse_from(["rowshape"]).expect("parse");
        let config = ExportConfig::from_cli(cli).expect("config");
        assert_eq!(config.format, RecordFormat::Array);
        assert!(!config.header);
        assert_eq!(config.source.delimiter, b'\t');
        assert_eq!(config.source.null_token, "");
        assert!(!config.encoder.pretty);
        assert!(config.input.is_none());
    }

    #[test]
    fn error_json_carries_kind_hint_and_row() {
        let err = Error::new(ErrorKind::Scan)
            .with_message("line 3 has 1 fields, expected 2")
            .with_hint("Check the delimiter.")
            .with_row(1)
            .with_column(1);
        let value = error_json(&err);
        let inner = value
            .get("error")
            .and_then(|v| v.as_object())
            .expect("error object");
        assert_eq!(inner.get("kind").and_then(|v| v.as_str()), Some("Scan"));
        assert_eq!(inner.get("row").and_then(|v| v.as_u64()), Some(1));
        assert_eq!(
            inner.get("hint").and_then(|v| v.as_str()),
            Some("Check the delimiter.")
        );
        assert_eq!(inner.get("column").and_then(|v| v.as_u64()), Some(1));
    }

    #[test]
    fn error_text_lists_row_and_column() {
        let err = Error::new(ErrorKind::Scan)
            .with_message("line 2 has 3 fields, expected 2")
            .with_row(0)
            .with_column(2);
        assert_eq!(
            error_text(&err),
            "error: line 2 has 3 fields, expected 2\nrow: 0\ncolumn: 2"
        );
    }
}
