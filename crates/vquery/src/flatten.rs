//! Flatten report records into CSV rows.
//!
//! A report body is a JSON array of objects. Each configured key is a dotted
//! path into a record (`household.address.city`); each record becomes one
//! row with one column per key, in key order.

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

/// Decode a report body into its records.
pub fn parse_records(body: &[u8]) -> Result<Vec<Record>> {
    serde_json::from_slice(body).context("Report body is not a JSON array of objects")
}

/// Look up a dotted key path in a record and render it as a CSV cell.
///
/// Missing keys, null values, and paths through non-objects render empty.
pub fn value_at(record: &Record, key: &str) -> String {
    let mut parts = key.split('.');
    let Some(first) = parts.next() else {
        return String::new();
    };

    let mut current = record.get(first);
    for part in parts {
        current = current.and_then(Value::as_object).and_then(|obj| obj.get(part));
    }

    current.map(render).unwrap_or_default()
}

/// Render a JSON value as cell text.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return n.to_string();
            }
            match n.as_f64() {
                Some(f) if f == 0.0 => "0".to_string(),
                Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{:.0}", f),
                Some(f) => f.to_string(),
                None => n.to_string(),
            }
        }
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Build the row for one record.
pub fn row(record: &Record, keys: &[String]) -> Vec<String> {
    keys.iter().map(|key| value_at(record, key)).collect()
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{}\"", escaped)?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Write all records as CSV, optionally preceded by the key names.
pub fn write_csv<W: Write>(
    mut w: W,
    records: &[Record],
    keys: &[String],
    print_header: bool,
) -> io::Result<()> {
    if print_header {
        write_row(&mut w, keys)?;
    }
    for record in records {
        write_row(&mut w, &row(record, keys))?;
    }
    w.flush()
}
