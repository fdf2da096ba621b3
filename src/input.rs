//! Purpose: Read item records for the CLI from a file or stdin in an explicit format.
//! Exports: `InputFormat`, `Records`, `read_source`, `parse_input`.
//! Role: Input boundary for `validate`/`upload`; keeps parsing out of dispatch.
//! Invariants: Parse failures name the record (array index or line) that failed.
//! Invariants: `-` always means stdin; nothing is read beyond the one source.
use std::io::{self, Read};

use contentpush::api::{Error, ErrorKind, Row};
use serde_json::Value;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputFormat {
    /// Array of item objects, or one item object.
    Json,
    /// One item object per line; blank lines skipped.
    Jsonl,
    /// Array of flat tabular rows (`geolocation.id`, `custom.key`, ...).
    Rows,
}

/// Parsed input, shaped by the format it was read as.
#[derive(Clone, Debug, PartialEq)]
pub enum Records {
    Items(Vec<Value>),
    Rows(Vec<Row>),
}

pub fn read_source(path: &str) -> Result<String, Error> {
    let mut text = String::new();
    if path == "-" {
        io::stdin().read_to_string(&mut text).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read stdin")
                .with_source(err)
        })?;
        return Ok(text);
    }
    std::fs::File::open(path)
        .and_then(|mut file| file.read_to_string(&mut text))
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read input file '{path}'"))
                .with_hint("Check the path, or pass '-' to read from stdin.")
                .with_source(err)
        })?;
    Ok(text)
}

pub fn parse_input(text: &str, format: InputFormat) -> Result<Records, Error> {
    match format {
        InputFormat::Json => parse_json_document(text).map(Records::Items),
        InputFormat::Jsonl => parse_json_lines(text).map(Records::Items),
        InputFormat::Rows => parse_rows(text).map(Records::Rows),
    }
}

/// Every record must be an object.
fn parse_rows(text: &str) -> Result<Vec<Row>, Error> {
    parse_json_document(text)?
        .into_iter()
        .enumerate()
        .map(|(index, record)| match record {
            Value::Object(row) => Ok(row),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("row {index} is not a JSON object"))
                .with_hint("Rows input is an array of flat objects keyed by column name.")),
        })
        .collect()
}

fn parse_json_document(text: &str) -> Result<Vec<Value>, Error> {
    let value: Value = serde_json::from_str(text).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!(
                "invalid json at line {} column {}",
                err.line(),
                err.column()
            ))
            .with_hint("Use --input jsonl for newline-delimited records.")
            .with_source(err)
    })?;
    match value {
        Value::Array(records) => Ok(records),
        record @ Value::Object(_) => Ok(vec![record]),
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message("expected a JSON array of records or a single record object")),
    }
}

fn parse_json_lines(text: &str) -> Result<Vec<Value>, Error> {
    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid json on line {}", index + 1))
                .with_source(err)
        })?;
        records.push(record);
    }
    Ok(records)
}
