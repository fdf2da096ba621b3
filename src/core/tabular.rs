//! Purpose: Reshape flat tabular rows into nested item records and back.
//! Exports: `Row`, `Table`, `nest_row`, `flatten_record`, `NESTED_PREFIXES`.
//! Role: Tabular import/export for `UploadCollection` (spreadsheet-style sources).
//! Invariants: Only `geolocation.<key>` and `custom.<key>` columns are regrouped.
//! Invariants: Empty cells (null or "") are dropped before grouping.
//! Invariants: Flattened column names join nested keys with '.'.
use crate::core::collection::UploadCollection;
use crate::core::error::Error;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// One flat row: column name -> cell.
pub type Row = Map<String, Value>;

pub const NESTED_PREFIXES: [&str; 2] = ["geolocation", "custom"];

/// Flattened view of a collection. Every row has a cell for every column;
/// fields an item does not carry are `null`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Turn a flat row into a nested item record.
///
/// Only `null` and `""` cells are dropped; `0` and `false` are real values here.
pub fn nest_row(row: &Row) -> Map<String, Value> {
    let mut record = Map::new();
    let mut nested: Vec<(&str, Map<String, Value>)> = NESTED_PREFIXES
        .iter()
        .map(|prefix| (*prefix, Map::new()))
        .collect();

    for (column, cell) in row {
        if is_empty_cell(cell) {
            continue;
        }
        let group = match column.split_once('.') {
            Some((prefix, key)) => nested
                .iter_mut()
                .find(|(name, _)| *name == prefix)
                .map(|(_, group)| (group, key)),
            None => None,
        };
        match group {
            Some((group, key)) => {
                group.insert(key.to_string(), cell.clone());
            }
            None => {
                record.insert(column.clone(), cell.clone());
            }
        }
    }

    for (prefix, group) in nested {
        if !group.is_empty() {
            record.insert(prefix.to_string(), Value::Object(group));
        }
    }
    record
}

/// Flatten nested objects into dot-joined columns.
pub fn flatten_record(record: &Map<String, Value>) -> Row {
    let mut row = Row::new();
    for (key, value) in record {
        flatten_into(&mut row, key, value);
    }
    row
}

fn flatten_into(row: &mut Row, column: &str, value: &Value) {
    match value {
        Value::Object(object) => {
            for (key, nested) in object {
                flatten_into(row, &format!("{column}.{key}"), nested);
            }
        }
        leaf => {
            row.insert(column.to_string(), leaf.clone());
        }
    }
}

fn is_empty_cell(cell: &Value) -> bool {
    match cell {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

impl UploadCollection {
    /// Validate tabular rows as items, regrouping prefixed columns first.
    pub fn from_tabular(rows: &[Row]) -> Result<Self, Error> {
        let records: Vec<Value> = rows
            .iter()
            .map(|row| Value::Object(nest_row(row)))
            .collect();
        Self::validate(&records)
    }

    /// One column per leaf field across all items, sorted by name.
    pub fn to_tabular(&self) -> Table {
        let flat: Vec<Row> = self
            .iter()
            .map(|item| match item.to_value() {
                Value::Object(record) => flatten_record(&record),
                _ => Row::new(),
            })
            .collect();

        let columns: BTreeSet<&String> = flat.iter().flat_map(|row| row.keys()).collect();
        let columns: Vec<String> = columns.into_iter().cloned().collect();
        let rows = flat
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        let cell = row.get(column).cloned().unwrap_or(Value::Null);
                        (column.clone(), cell)
                    })
                    .collect()
            })
            .collect();

        Table { columns, rows }
    }
}
