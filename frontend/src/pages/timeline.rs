use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::types::{
    DatePrecision, HorizontalAlign, TimelineFile, TimelinePoint, VerticalAlign, fetch_json,
};

// ── Drawing geometry ─────────────────────────────────────────────────────────

const STEP_X: i32 = 120;
const MARGIN_X: i32 = 80;
const OFFSET_UNIT: i32 = 24;
const HEIGHT: i32 = 320;
const AXIS_Y: i32 = HEIGHT / 2;

fn precision_note(p: DatePrecision) -> Option<&'static str> {
    match p {
        DatePrecision::Exact => None,
        DatePrecision::YearOnly => Some("year only"),
        DatePrecision::Clamped => Some("clamped"),
        DatePrecision::Unknown => Some("unknown date"),
    }
}

fn point_view(i: usize, p: &TimelinePoint) -> impl IntoView {
    let x = MARGIN_X + i as i32 * STEP_X;
    // SVG y grows downwards; positive offsets sit above the axis
    let tip_y = AXIS_Y - p.vertical_offset * OFFSET_UNIT;
    let anchor = match p.horizontal_align {
        HorizontalAlign::Right => "start",
        HorizontalAlign::Left => "end",
    };
    let dy = match p.vertical_align {
        VerticalAlign::Above => "-0.4em",
        VerticalAlign::Below => "1.1em",
    };
    let class = if p.precision == DatePrecision::Exact {
        "point"
    } else {
        "point approx"
    };
    let title = match precision_note(p.precision) {
        Some(note) => format!("{} ({note})", p.raw_date),
        None => p.raw_date.clone(),
    };

    view! {
        <g class=class>
            <title>{title}</title>
            <line x1=x y1=AXIS_Y x2=x y2=tip_y stroke="#7a6e5f" stroke-width="1"/>
            <circle cx=x cy=AXIS_Y r="4" fill="#7a6e5f"/>
            <text x=x y=tip_y dy=dy text-anchor=anchor font-size="12">
                {p.display_label.clone()}
            </text>
            <text x=x y=AXIS_Y dy="1.6em" text-anchor="middle" font-size="10" fill="#999">
                {p.normalized_date.to_string()}
            </text>
        </g>
    }
}

#[component]
pub fn TimelinePage() -> impl IntoView {
    let data: RwSignal<Option<Result<TimelineFile, String>>> = RwSignal::new(None);

    spawn_local(async move {
        data.set(Some(fetch_json("/data/timeline.json").await));
    });

    view! {
        <div>
            <h2>"Timeline"</h2>
            <p style="color:#7a6e5f;font-size:0.9rem;margin-bottom:1rem;">
                "Events in date order. Dates that could not be read exactly are drawn faded."
            </p>
            {move || match data.get() {
                None => view! { <p class="loading">"Loading…"</p> }.into_any(),
                Some(Err(e)) => view! { <p class="error">{e}</p> }.into_any(),
                Some(Ok(tl)) => {
                    let s = &tl.stats;
                    let width = MARGIN_X * 2 + (tl.points.len().max(1) as i32 - 1) * STEP_X;
                    let view_box = format!("0 0 {width} {HEIGHT}");
                    view! {
                        <p class="timeline-stats">
                            {s.total} " events · " {s.exact} " exact · " {s.year_only}
                            " year only · " {s.clamped} " clamped · " {s.unknown} " unknown"
                            " (years " {tl.bounds.min_year} "–" {tl.bounds.max_year} ")"
                        </p>
                        <div class="card" style="overflow-x:auto;">
                            <svg width=width height=HEIGHT viewBox=view_box>
                                <line
                                    x1="0"
                                    y1=AXIS_Y
                                    x2=width
                                    y2=AXIS_Y
                                    stroke="#3b3024"
                                    stroke-width="2"
                                />
                                {tl.points.iter().enumerate().map(|(i, p)| point_view(i, p)).collect_view()}
                            </svg>
                        </div>
                    }
                    .into_any()
                }
            }}
        </div>
    }
}
