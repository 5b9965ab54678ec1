use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::config::ColumnMap;
use crate::enrich::EnrichedRow;
use crate::error::Result;

const EXPORT_BASENAME: &str = "history_analysis";
const LIST_SEPARATOR: &str = ", ";
const SOURCE_SUFFIX: &str = "_source";
const ENRICHMENT_COLUMNS: [&str; 5] = [
    "People",
    "Locations",
    "Organizations",
    "WordCount",
    "UniqueEntityCount",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Delimited text
    Csv,
    /// XLSX spreadsheet
    Excel,
    /// JSON array of records
    Json,
}

impl ExportFormat {
    /// Interpret a typed choice. Case and surrounding whitespace are ignored.
    pub fn parse_choice(choice: &str) -> Option<Self> {
        match choice.trim().to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "excel" => Some(Self::Excel),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xlsx",
            Self::Json => "json",
        }
    }

    pub fn file_name(self) -> String {
        format!("{EXPORT_BASENAME}.{}", self.extension())
    }
}

/// Ask for a format on `input`. Returns the raw answer alongside the parsed
/// format so callers can report an invalid choice verbatim.
pub fn prompt_format(
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> io::Result<(String, Option<ExportFormat>)> {
    writeln!(out, "\nChoose output format: csv / excel / json")?;
    write!(out, "Enter format: ")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let choice = line.trim().to_string();
    let format = ExportFormat::parse_choice(&choice);
    Ok((choice, format))
}

// ── Table model ──────────────────────────────────────────────────────

enum Cell<'a> {
    Text(&'a str),
    List(&'a BTreeSet<String>),
    Count(usize),
}

impl Cell<'_> {
    fn to_text(&self) -> String {
        match self {
            Cell::Text(s) => s.to_string(),
            Cell::List(items) => items
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
            Cell::Count(n) => n.to_string(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Cell::Text(s) => Value::String(s.to_string()),
            Cell::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
            Cell::Count(n) => Value::from(*n),
        }
    }
}

/// Column layout shared by every writer.
struct Layout<'a> {
    /// Output header names
    headers: Vec<String>,
    /// Source keys of the extra columns, in header order
    extra_keys: Vec<&'a str>,
}

/// Mapped columns under their source names, then the extra source columns
/// seen in any row (first-seen order), then the enrichment columns.
///
/// An extra column whose name is already taken gets a `_source` suffix so no
/// two headers collide.
fn layout<'a>(rows: &'a [EnrichedRow], columns: &ColumnMap) -> Layout<'a> {
    let mut extra_keys: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for row in rows {
        for (key, _) in &row.extra {
            if seen.insert(key.as_str()) {
                extra_keys.push(key);
            }
        }
    }

    let mut taken: HashSet<String> = [&columns.date, &columns.event, &columns.description]
        .into_iter()
        .cloned()
        .chain(ENRICHMENT_COLUMNS.iter().map(|s| s.to_string()))
        .chain(extra_keys.iter().map(|k| k.to_string()))
        .collect();

    let mut headers = vec![
        columns.date.clone(),
        columns.event.clone(),
        columns.description.clone(),
    ];
    for key in &extra_keys {
        let clashes = *key == columns.date
            || *key == columns.event
            || *key == columns.description
            || ENRICHMENT_COLUMNS.contains(key);
        if clashes {
            let mut name = format!("{key}{SOURCE_SUFFIX}");
            while taken.contains(&name) {
                name.push_str(SOURCE_SUFFIX);
            }
            warn!("event=export_column_renamed column={key} renamed={name}");
            taken.insert(name.clone());
            headers.push(name);
        } else {
            headers.push(key.to_string());
        }
    }
    headers.extend(ENRICHMENT_COLUMNS.iter().map(|s| s.to_string()));

    Layout {
        headers,
        extra_keys,
    }
}

fn cells<'a>(row: &'a EnrichedRow, extra_keys: &[&str]) -> Vec<Cell<'a>> {
    let e = &row.entities;
    let mut cells = vec![
        Cell::Text(&row.date),
        Cell::Text(&row.event),
        Cell::Text(&row.description),
    ];
    for key in extra_keys {
        let value = row
            .extra
            .iter()
            .find(|(k, _)| k.as_str() == *key)
            .map(|(_, v)| v.as_str())
            .unwrap_or_default();
        cells.push(Cell::Text(value));
    }
    cells.extend([
        Cell::List(&e.people),
        Cell::List(&e.locations),
        Cell::List(&e.organizations),
        Cell::Count(e.word_count),
        Cell::Count(e.unique_entity_count),
    ]);
    cells
}

// ── Writers ──────────────────────────────────────────────────────────

/// Write enriched rows to `dir` in `format`. Returns the written path.
pub fn export(
    rows: &[EnrichedRow],
    columns: &ColumnMap,
    format: ExportFormat,
    dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format.file_name());
    match format {
        ExportFormat::Csv => write_csv(rows, columns, &path)?,
        ExportFormat::Excel => write_xlsx(rows, columns, &path)?,
        ExportFormat::Json => write_json(rows, columns, &path)?,
    }
    info!(
        "event=export_written format={:?} path={} records={}",
        format,
        path.display(),
        rows.len()
    );
    Ok(path)
}

fn write_csv(rows: &[EnrichedRow], columns: &ColumnMap, path: &Path) -> Result<()> {
    let layout = layout(rows, columns);
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&layout.headers)?;
    for row in rows {
        let record: Vec<String> = cells(row, &layout.extra_keys)
            .iter()
            .map(Cell::to_text)
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(rows: &[EnrichedRow], columns: &ColumnMap, path: &Path) -> Result<()> {
    let layout = layout(rows, columns);
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in layout.headers.iter().enumerate() {
        sheet.write_string(0, col as u16, name)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, cell) in cells(row, &layout.extra_keys).iter().enumerate() {
            match cell {
                Cell::Count(n) => sheet.write_number(r, col as u16, *n as f64)?,
                other => sheet.write_string(r, col as u16, other.to_text())?,
            };
        }
    }
    workbook.save(path)?;
    Ok(())
}

/// Array of objects with 4-space indentation.
fn write_json(rows: &[EnrichedRow], columns: &ColumnMap, path: &Path) -> Result<()> {
    let layout = layout(rows, columns);
    let records: Vec<Map<String, Value>> = rows
        .iter()
        .map(|row| {
            layout
                .headers
                .iter()
                .cloned()
                .zip(cells(row, &layout.extra_keys).iter().map(Cell::to_json))
                .collect()
        })
        .collect();

    let mut writer = BufWriter::new(File::create(path)?);
    let mut ser =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut ser)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{EntityAggregator, ExtractedEntities};
    use crate::classifier::testing::StaticClassifier;
    use crate::dataset;
    use crate::enrich::Enricher;
    use tempfile::TempDir;

    /// Load `content` as a dataset file and enrich it with no entities.
    fn enrich_file(dir: &TempDir, name: &str, content: &str) -> Vec<EnrichedRow> {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        let records = dataset::load(&path, &ColumnMap::lower()).unwrap();
        let c = StaticClassifier::default();
        Enricher::new(EntityAggregator::new(&c), "description")
            .enrich(records)
            .unwrap()
            .rows
    }

    fn sample_rows() -> Vec<EnrichedRow> {
        let set = |items: &[&str]| -> BTreeSet<String> {
            items.iter().map(|s| s.to_string()).collect()
        };
        vec![
            EnrichedRow {
                row: 1,
                date: "1812-06-24".into(),
                event: "Invasion".into(),
                description: "Napoleon invaded Russia in 1812.".into(),
                extra: vec![("id".into(), "7".into())],
                entities: ExtractedEntities {
                    people: set(&["Napoleon"]),
                    locations: set(&["Moscow", "Russia"]),
                    organizations: set(&[]),
                    word_count: 5,
                    unique_entity_count: 3,
                },
            },
            EnrichedRow {
                row: 2,
                date: "1850".into(),
                event: "Quiet year".into(),
                description: String::new(),
                extra: vec![("id".into(), "8".into())],
                entities: ExtractedEntities::default(),
            },
        ]
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(ExportFormat::parse_choice("csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse_choice("  EXCEL \n"), Some(ExportFormat::Excel));
        assert_eq!(ExportFormat::parse_choice("Json"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse_choice("xlsx"), None);
        assert_eq!(ExportFormat::parse_choice(""), None);
    }

    #[test]
    fn test_prompt_reads_one_line() {
        let mut input = io::Cursor::new(b"  Json\nignored\n".to_vec());
        let mut out = Vec::new();
        let (choice, format) = prompt_format(&mut input, &mut out).unwrap();
        assert_eq!(choice, "Json");
        assert_eq!(format, Some(ExportFormat::Json));
        assert!(String::from_utf8(out).unwrap().contains("csv / excel / json"));
    }

    #[test]
    fn test_prompt_invalid_and_eof() {
        let mut out = Vec::new();
        let (choice, format) =
            prompt_format(&mut io::Cursor::new(b"pdf\n".to_vec()), &mut out).unwrap();
        assert_eq!(choice, "pdf");
        assert_eq!(format, None);

        let (choice, format) = prompt_format(&mut io::Cursor::new(Vec::new()), &mut out).unwrap();
        assert_eq!(choice, "");
        assert_eq!(format, None);
    }

    #[test]
    fn test_csv_export() {
        let dir = TempDir::new().unwrap();
        let path = export(&sample_rows(), &ColumnMap::lower(), ExportFormat::Csv, dir.path())
            .unwrap();
        assert_eq!(path, dir.path().join("history_analysis.csv"));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            headers,
            vec![
                "date",
                "event",
                "description",
                "id",
                "People",
                "Locations",
                "Organizations",
                "WordCount",
                "UniqueEntityCount"
            ]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][3], "7");
        assert_eq!(&rows[0][5], "Moscow, Russia");
        assert_eq!(&rows[0][6], "");
        assert_eq!(&rows[0][8], "3");
        assert_eq!(&rows[1][7], "0");
    }

    #[test]
    fn test_json_export_uses_source_column_names() {
        let dir = TempDir::new().unwrap();
        let path = export(&sample_rows(), &ColumnMap::title(), ExportFormat::Json, dir.path())
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    {\n        \""));

        let parsed: Vec<Map<String, Value>> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["Date"], "1812-06-24");
        assert_eq!(parsed[0]["Description"], "Napoleon invaded Russia in 1812.");
        assert_eq!(parsed[0]["Locations"], serde_json::json!(["Moscow", "Russia"]));
        assert_eq!(parsed[0]["Organizations"], serde_json::json!([]));
        assert_eq!(parsed[1]["WordCount"], 0);
    }

    #[test]
    fn test_excel_export_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = export(&sample_rows(), &ColumnMap::lower(), ExportFormat::Excel, dir.path())
            .unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("xlsx"));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_extra_column_from_later_row_is_exported() {
        let dir = TempDir::new().unwrap();
        let rows = enrich_file(
            &dir,
            "events.json",
            r#"[
                {"date": "1850", "event": "Census", "description": "A count."},
                {"date": "1851", "event": "Exhibition", "description": "A fair.", "source": "archive"}
            ]"#,
        );
        let path = export(&rows, &ColumnMap::lower(), ExportFormat::Csv, dir.path()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers[3], "source");
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&records[0][3], "");
        assert_eq!(&records[1][3], "archive");
    }

    #[test]
    fn test_extra_columns_keep_first_seen_order() {
        let dir = TempDir::new().unwrap();
        let rows = enrich_file(
            &dir,
            "events.json",
            r#"[
                {"date": "1850", "event": "a", "description": "", "era": "modern"},
                {"date": "1851", "event": "b", "description": "", "source": "x", "era": "modern"}
            ]"#,
        );
        let layout = layout(&rows, &ColumnMap::lower());
        assert_eq!(layout.extra_keys, vec!["era", "source"]);
    }

    #[test]
    fn test_source_column_named_like_enrichment_column_is_renamed() {
        let dir = TempDir::new().unwrap();
        let rows = enrich_file(
            &dir,
            "events.csv",
            "date,event,description,People\n1850,Census,A count.,Alice\n",
        );

        let path = export(&rows, &ColumnMap::lower(), ExportFormat::Json, dir.path()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<Map<String, Value>> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["People_source"], "Alice");
        assert_eq!(parsed[0]["People"], serde_json::json!([]));

        let path = export(&rows, &ColumnMap::lower(), ExportFormat::Csv, dir.path()).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        let distinct: HashSet<&String> = headers.iter().collect();
        assert_eq!(distinct.len(), headers.len());
        assert_eq!(headers.iter().filter(|h| *h == "People").count(), 1);
    }

    #[test]
    fn test_renamed_column_skips_taken_names() {
        let mut rows = sample_rows();
        rows[0].extra = vec![
            ("People".into(), "Alice".into()),
            ("People_source".into(), "ledger".into()),
        ];
        let layout = layout(&rows, &ColumnMap::lower());
        assert!(layout.headers.contains(&"People_source_source".to_string()));
        assert!(layout.headers.contains(&"People_source".to_string()));
        let distinct: HashSet<&String> = layout.headers.iter().collect();
        assert_eq!(distinct.len(), layout.headers.len());
    }

    #[test]
    fn test_export_without_rows_has_header_only() {
        let dir = TempDir::new().unwrap();
        let path = export(&[], &ColumnMap::lower(), ExportFormat::Csv, dir.path()).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            text,
            "date,event,description,People,Locations,Organizations,WordCount,UniqueEntityCount\n"
        );
    }
}
