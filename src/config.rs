use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use timeline_types::DateBounds;

use crate::enrich::MissingTextPolicy;
use crate::error::{Error, Result};

pub const DEFAULT_OUTPUT_DIR: &str = "output";

// ── Column mapping ───────────────────────────────────────────────────

/// Names of the dataset columns holding the three fields the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub date: String,
    pub event: String,
    pub description: String,
}

impl ColumnMap {
    /// `date`, `event`, `description`
    pub fn lower() -> Self {
        ColumnMap {
            date: "date".into(),
            event: "event".into(),
            description: "description".into(),
        }
    }

    /// `Date`, `Event`, `Description`
    pub fn title() -> Self {
        ColumnMap {
            date: "Date".into(),
            event: "Event".into(),
            description: "Description".into(),
        }
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::lower()
    }
}

/// Known dataset header conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ColumnPreset {
    /// date / event / description
    Lower,
    /// Date / Event / Description
    Title,
}

impl ColumnPreset {
    pub fn columns(self) -> ColumnMap {
        match self {
            Self::Lower => ColumnMap::lower(),
            Self::Title => ColumnMap::title(),
        }
    }
}

// ── Config file ──────────────────────────────────────────────────────

/// Optional JSON config file. Every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub columns: Option<ColumnMap>,
    pub gazetteer: Option<PathBuf>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub output_dir: Option<PathBuf>,
    pub missing_text: Option<MissingTextPolicy>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| Error::config(format!("cannot parse {}: {e}", path.display())))
    }
}

/// Values given on the command line; these win over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub preset: Option<ColumnPreset>,
    pub date_column: Option<String>,
    pub event_column: Option<String>,
    pub description_column: Option<String>,
    pub gazetteer: Option<PathBuf>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub output_dir: Option<PathBuf>,
    pub missing_text: Option<MissingTextPolicy>,
}

// ── Resolved settings ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub columns: ColumnMap,
    /// `None` means the bundled gazetteer
    pub gazetteer: Option<PathBuf>,
    pub bounds: DateBounds,
    pub output_dir: PathBuf,
    pub missing_text: MissingTextPolicy,
}

impl Settings {
    /// Merge defaults, then the config file, then command-line overrides.
    pub fn resolve(file: FileConfig, cli: Overrides) -> Result<Self> {
        let mut columns = match cli.preset {
            Some(preset) => preset.columns(),
            None => file.columns.unwrap_or_default(),
        };
        if let Some(c) = cli.date_column {
            columns.date = c;
        }
        if let Some(c) = cli.event_column {
            columns.event = c;
        }
        if let Some(c) = cli.description_column {
            columns.description = c;
        }

        let defaults = DateBounds::default();
        let bounds = DateBounds {
            min_year: cli.min_year.or(file.min_year).unwrap_or(defaults.min_year),
            max_year: cli.max_year.or(file.max_year).unwrap_or(defaults.max_year),
        };
        validate_bounds(&bounds)?;

        let settings = Settings {
            columns,
            gazetteer: cli.gazetteer.or(file.gazetteer),
            bounds,
            output_dir: cli
                .output_dir
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            missing_text: cli.missing_text.or(file.missing_text).unwrap_or_default(),
        };
        validate_columns(&settings.columns)?;
        Ok(settings)
    }
}

fn validate_bounds(bounds: &DateBounds) -> Result<()> {
    if bounds.min_year > bounds.max_year {
        return Err(Error::config(format!(
            "min year {} is after max year {}",
            bounds.min_year, bounds.max_year
        )));
    }
    for year in [bounds.min_year, bounds.max_year] {
        if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
            return Err(Error::config(format!("year {year} is not representable")));
        }
    }
    Ok(())
}

fn validate_columns(columns: &ColumnMap) -> Result<()> {
    let names = [&columns.date, &columns.event, &columns.description];
    if names.iter().any(|n| n.trim().is_empty()) {
        return Err(Error::config("column names must not be empty"));
    }
    if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
        return Err(Error::config(format!(
            "date, event and description columns must differ (got {}, {}, {})",
            columns.date, columns.event, columns.description
        )));
    }
    Ok(())
}
