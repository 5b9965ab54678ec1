use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use log::warn;
use timeline_types::{DateBounds, DatePrecision, HorizontalAlign, TimelinePoint, VerticalAlign};

/// Vertical displacements, cycled over events in date order.
pub const OFFSET_PALETTE: [i32; 6] = [-5, 5, -3, 3, -1, 1];

/// Titles longer than this are truncated.
pub const LABEL_MAX_CHARS: usize = 30;
/// Characters kept from a truncated title before the ellipsis.
pub const LABEL_KEEP_CHARS: usize = 27;
pub const ELLIPSIS: &str = "...";

/// Calendar formats tried, in order, before falling back to the year token.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

// ── Date normalization ───────────────────────────────────────────────

/// Strict calendar parse. `None` for bare years and anything unrecognized.
fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    // Year-month: first of the month
    if raw.matches('-').count() == 1 {
        return NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok();
    }
    None
}

/// The substring before the first `-`, as an integer year.
fn leading_year(raw: &str) -> Option<i32> {
    raw.split('-').next()?.trim().parse().ok()
}

fn first_of_year(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Normalize a raw date string into a totally ordered date.
///
/// A full calendar date inside `bounds` is kept as-is. Otherwise the
/// leading year token becomes January 1st of that year, clamped into
/// `bounds`. Strings with no usable year sit at the minimum date.
pub fn normalize_date(raw: &str, bounds: &DateBounds) -> (NaiveDate, DatePrecision) {
    let raw = raw.trim();

    if let Some(date) = parse_calendar_date(raw)
        && bounds.contains(date.year())
    {
        return (date, DatePrecision::Exact);
    }

    match leading_year(raw) {
        Some(year) if bounds.contains(year) => (first_of_year(year), DatePrecision::YearOnly),
        Some(year) => (first_of_year(bounds.clamp(year)), DatePrecision::Clamped),
        None => (first_of_year(bounds.min_year), DatePrecision::Unknown),
    }
}

// ── Layout ───────────────────────────────────────────────────────────

/// Offset for the event at `index` in sorted order.
pub fn offset_for(index: usize) -> i32 {
    OFFSET_PALETTE[index % OFFSET_PALETTE.len()]
}

/// Shorten long titles to `LABEL_KEEP_CHARS` characters plus an ellipsis.
pub fn truncate_label(title: &str) -> String {
    if title.chars().count() > LABEL_MAX_CHARS {
        let kept: String = title.chars().take(LABEL_KEEP_CHARS).collect();
        format!("{kept}{ELLIPSIS}")
    } else {
        title.to_string()
    }
}

fn alignment(offset: i32, index: usize) -> (VerticalAlign, HorizontalAlign) {
    let vertical = if offset > 0 {
        VerticalAlign::Above
    } else {
        VerticalAlign::Below
    };
    let horizontal = if index % 2 == 0 {
        HorizontalAlign::Right
    } else {
        HorizontalAlign::Left
    };
    (vertical, horizontal)
}

/// Places events on a 1-D date axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine {
    bounds: DateBounds,
}

impl LayoutEngine {
    pub fn new(bounds: DateBounds) -> Self {
        LayoutEngine { bounds }
    }

    pub fn bounds(&self) -> DateBounds {
        self.bounds
    }

    /// Lay out `(raw_date, title)` pairs.
    ///
    /// Output is sorted ascending by normalized date; equal dates keep their
    /// input order. Offsets cycle through `OFFSET_PALETTE` by sorted
    /// position and do not look at actual label overlap, so very dense
    /// clusters can still collide.
    pub fn layout<'a>(
        &self,
        events: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Vec<TimelinePoint> {
        let mut staged: Vec<(usize, NaiveDate, DatePrecision, &str, &str)> = events
            .into_iter()
            .enumerate()
            .map(|(i, (raw_date, title))| {
                let (date, precision) = normalize_date(raw_date, &self.bounds);
                if precision != DatePrecision::Exact {
                    warn!(
                        "event=date_fallback index={i} raw_date={raw_date:?} precision={precision:?} normalized={date}"
                    );
                }
                (i, date, precision, raw_date, title)
            })
            .collect();

        // Stable: ties keep input order
        staged.sort_by_key(|s| s.1);

        staged
            .into_iter()
            .enumerate()
            .map(|(pos, (source_index, date, precision, raw_date, title))| {
                let vertical_offset = offset_for(pos);
                let (vertical_align, horizontal_align) = alignment(vertical_offset, pos);
                TimelinePoint {
                    normalized_date: date,
                    vertical_offset,
                    display_label: truncate_label(title),
                    vertical_align,
                    horizontal_align,
                    precision,
                    raw_date: raw_date.to_string(),
                    source_index,
                }
            })
            .collect()
    }
}
