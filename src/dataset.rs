use std::path::Path;

use log::info;
use serde_json::{Map, Value};

use crate::config::ColumnMap;
use crate::enrich::EventRecord;
use crate::error::{Error, Result};

/// Load event records from a `.csv` or `.json` dataset.
///
/// Date and event cells are required in every row. A missing description
/// is kept as `None` for the enricher to report; it is never replaced by "".
pub fn load(path: &Path, columns: &ColumnMap) -> Result<Vec<EventRecord>> {
    if !path.is_file() {
        return Err(Error::SourceNotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let records = match ext.as_deref() {
        Some("csv") => load_csv(path, columns)?,
        Some("json") => load_json(&std::fs::read_to_string(path)?, columns)?,
        _ => {
            return Err(Error::dataset(format!(
                "unsupported dataset type: {} (expected .csv or .json)",
                path.display()
            )));
        }
    };

    info!(
        "event=dataset_loaded path={} records={}",
        path.display(),
        records.len()
    );
    Ok(records)
}

fn missing(row: usize, column: &str) -> Error {
    Error::MissingField {
        row,
        column: column.to_string(),
    }
}

// ── CSV ──────────────────────────────────────────────────────────────

fn load_csv(path: &Path, columns: &ColumnMap) -> Result<Vec<EventRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    read_csv(&mut reader, columns)
}

/// Empty cells count as absent, matching how spreadsheet tools export
/// blank values.
fn read_csv<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    columns: &ColumnMap,
) -> Result<Vec<EventRecord>> {
    let headers = reader.headers()?.clone();
    let index_of = |name: &str| -> Result<usize> {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            let found: Vec<&str> = headers.iter().collect();
            Error::dataset(format!(
                "column `{name}` not found (columns: {})",
                found.join(", ")
            ))
        })
    };
    let date_idx = index_of(&columns.date)?;
    let event_idx = index_of(&columns.event)?;
    let desc_idx = index_of(&columns.description)?;

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row = i + 1;
        let rec = result?;
        let cell = |idx: usize| rec.get(idx).filter(|s| !s.is_empty());

        let date = cell(date_idx).ok_or_else(|| missing(row, &columns.date))?;
        let event = cell(event_idx).ok_or_else(|| missing(row, &columns.event))?;

        let extra = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| ![date_idx, event_idx, desc_idx].contains(idx))
            .map(|(idx, name)| {
                (
                    name.to_string(),
                    rec.get(idx).unwrap_or_default().to_string(),
                )
            })
            .collect();

        records.push(EventRecord {
            row,
            date: date.to_string(),
            event: event.to_string(),
            description: cell(desc_idx).map(str::to_string),
            extra,
        });
    }
    Ok(records)
}

// ── JSON ─────────────────────────────────────────────────────────────

/// A JSON array of objects. `null` or an absent key is a missing cell;
/// an empty string is a present, empty text.
fn load_json(json: &str, columns: &ColumnMap) -> Result<Vec<EventRecord>> {
    let rows: Vec<Map<String, Value>> = serde_json::from_str(json)
        .map_err(|e| Error::dataset(format!("expected a JSON array of objects: {e}")))?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, mut obj) in rows.into_iter().enumerate() {
        let row = i + 1;
        let date = take_text(&mut obj, &columns.date).ok_or_else(|| missing(row, &columns.date))?;
        let event =
            take_text(&mut obj, &columns.event).ok_or_else(|| missing(row, &columns.event))?;
        let description = take_text(&mut obj, &columns.description);

        let extra = obj
            .into_iter()
            .map(|(k, v)| (k, value_to_text(v).unwrap_or_default()))
            .collect();

        records.push(EventRecord {
            row,
            date,
            event,
            description,
            extra,
        });
    }
    Ok(records)
}

fn take_text(obj: &mut Map<String, Value>, key: &str) -> Option<String> {
    obj.remove(key).and_then(value_to_text)
}

/// Strings as-is, numbers and booleans via their JSON text (a bare year
/// like `1850` arrives as a number). Null is absent.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
