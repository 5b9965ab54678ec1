use std::collections::BTreeSet;
use std::io::{self, Write};

use timeline_types::{CorpusInsights, DatePrecision, TimelinePoint};

use crate::enrich::EnrichedRow;

const SEPARATOR_WIDTH: usize = 100;
const NONE_PLACEHOLDER: &str = "None";

fn join_or_none(items: &BTreeSet<String>) -> String {
    if items.is_empty() {
        NONE_PLACEHOLDER.to_string()
    } else {
        items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

/// Per-record block followed by a separator line.
pub fn write_record(out: &mut impl Write, row: &EnrichedRow) -> io::Result<()> {
    let e = &row.entities;
    writeln!(out, "Date: {}", row.date)?;
    writeln!(out, "Event: {}", row.event)?;
    writeln!(out, "Description: {}", row.description)?;
    writeln!(out, "People Involved: {}", join_or_none(&e.people))?;
    writeln!(out, "Locations Mentioned: {}", join_or_none(&e.locations))?;
    writeln!(out, "Organizations Mentioned: {}", join_or_none(&e.organizations))?;
    writeln!(
        out,
        "Word Count: {}, Unique Entities: {}",
        e.word_count, e.unique_entity_count
    )?;
    writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH))
}

pub fn write_insights(out: &mut impl Write, insights: &CorpusInsights) -> io::Result<()> {
    writeln!(out, "\n=== Overall Insights ===")?;
    writeln!(out, "Total unique people: {}", insights.unique_people)?;
    writeln!(out, "Total unique locations: {}", insights.unique_locations)?;
    writeln!(
        out,
        "Total unique organizations: {}",
        insights.unique_organizations
    )
}

/// Full console summary: every record, then the corpus totals.
pub fn write_summary(
    out: &mut impl Write,
    rows: &[EnrichedRow],
    insights: &CorpusInsights,
) -> io::Result<()> {
    for row in rows {
        write_record(out, row)?;
    }
    write_insights(out, insights)
}

/// One line per timeline point: date, offset, label, and a marker for
/// dates that lost precision.
pub fn write_timeline(out: &mut impl Write, points: &[TimelinePoint]) -> io::Result<()> {
    for p in points {
        let marker = match p.precision {
            DatePrecision::Exact => "",
            DatePrecision::YearOnly => "  (year only)",
            DatePrecision::Clamped => "  (clamped)",
            DatePrecision::Unknown => "  (unknown date)",
        };
        writeln!(
            out,
            "{}  {:>+3}  {}{}",
            p.normalized_date, p.vertical_offset, p.display_label, marker
        )?;
    }
    Ok(())
}
