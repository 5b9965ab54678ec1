use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Enriched record ──────────────────────────────────────────────────────

/// One dataset row after entity enrichment, as written to `records.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub date: String,
    pub event: String,
    pub description: String,
    #[serde(rename = "People")]
    pub people: Vec<String>,
    #[serde(rename = "Locations")]
    pub locations: Vec<String>,
    #[serde(rename = "Organizations")]
    pub organizations: Vec<String>,
    #[serde(rename = "WordCount")]
    pub word_count: usize,
    #[serde(rename = "UniqueEntityCount")]
    pub unique_entity_count: usize,
}

/// Distinct entity totals across the whole corpus (set union per category).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusInsights {
    pub unique_people: usize,
    pub unique_locations: usize,
    pub unique_organizations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsFile {
    pub records: Vec<EnrichedRecord>,
    pub insights: CorpusInsights,
    /// 1-based numbers of records dropped for missing text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<usize>,
}

// ── Timeline ─────────────────────────────────────────────────────────────

/// How much of the raw date survived normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatePrecision {
    /// Parsed as a full calendar date
    Exact,
    /// Only the leading year was usable; day and month are January 1st
    YearOnly,
    /// Leading year fell outside the bounds and was clamped
    Clamped,
    /// No year could be extracted; placed at the minimum date
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalAlign {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalAlign {
    Left,
    Right,
}

/// Inclusive year range the layout engine treats as representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for DateBounds {
    fn default() -> Self {
        DateBounds {
            min_year: 1,
            max_year: 9999,
        }
    }
}

impl DateBounds {
    pub fn contains(&self, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }

    pub fn clamp(&self, year: i32) -> i32 {
        year.clamp(self.min_year, self.max_year)
    }
}

/// A single event placed on the timeline axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub normalized_date: NaiveDate,
    pub vertical_offset: i32,
    pub display_label: String,
    pub vertical_align: VerticalAlign,
    pub horizontal_align: HorizontalAlign,
    pub precision: DatePrecision,
    pub raw_date: String,
    /// Position of the event in the input sequence
    pub source_index: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineStats {
    pub total: usize,
    pub exact: usize,
    pub year_only: usize,
    pub clamped: usize,
    pub unknown: usize,
}

impl TimelineStats {
    pub fn from_points(points: &[TimelinePoint]) -> Self {
        let mut stats = TimelineStats {
            total: points.len(),
            ..Default::default()
        };
        for p in points {
            match p.precision {
                DatePrecision::Exact => stats.exact += 1,
                DatePrecision::YearOnly => stats.year_only += 1,
                DatePrecision::Clamped => stats.clamped += 1,
                DatePrecision::Unknown => stats.unknown += 1,
            }
        }
        stats
    }
}

/// Contents of `timeline.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineFile {
    pub points: Vec<TimelinePoint>,
    pub bounds: DateBounds,
    pub stats: TimelineStats,
}
