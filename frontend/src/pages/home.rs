use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::types::{EnrichedRecord, RecordsFile, fetch_json};

fn entity_list(label: &'static str, items: &[String]) -> impl IntoView {
    let body = if items.is_empty() {
        view! { <span class="none">"None"</span> }.into_any()
    } else {
        view! {
            <ul class="chips">
                {items.iter().map(|name| view! { <li>{name.clone()}</li> }).collect_view()}
            </ul>
        }
        .into_any()
    };
    view! {
        <div class="entity-row">
            <span class="entity-label">{label}</span>
            {body}
        </div>
    }
}

fn record_card(r: &EnrichedRecord) -> impl IntoView {
    view! {
        <div class="card record">
            <div class="record-head">
                <span class="record-date">{r.date.clone()}</span>
                <span class="record-event">{r.event.clone()}</span>
            </div>
            <p class="record-desc">{r.description.clone()}</p>
            {entity_list("People", &r.people)}
            {entity_list("Locations", &r.locations)}
            {entity_list("Organizations", &r.organizations)}
            <div class="record-counts">
                {r.word_count} " words · " {r.unique_entity_count} " unique entities"
            </div>
        </div>
    }
}

#[component]
pub fn HomePage() -> impl IntoView {
    let data: RwSignal<Option<Result<RecordsFile, String>>> = RwSignal::new(None);

    spawn_local(async move {
        data.set(Some(fetch_json("/data/records.json").await));
    });

    view! {
        <div>
            <h2>"Corpus overview"</h2>
            {move || match data.get() {
                None => view! { <p class="loading">"Loading…"</p> }.into_any(),
                Some(Err(e)) => view! { <p class="error">{e}</p> }.into_any(),
                Some(Ok(file)) => {
                    let s = file.insights;
                    view! {
                        <div class="stats-grid">
                            <div class="stat-card">
                                <div class="num">{file.records.len()}</div>
                                <div class="label">"Records"</div>
                            </div>
                            <div class="stat-card">
                                <div class="num">{s.unique_people}</div>
                                <div class="label">"Unique people"</div>
                            </div>
                            <div class="stat-card">
                                <div class="num">{s.unique_locations}</div>
                                <div class="label">"Unique locations"</div>
                            </div>
                            <div class="stat-card">
                                <div class="num">{s.unique_organizations}</div>
                                <div class="label">"Unique organizations"</div>
                            </div>
                        </div>
                        {if file.skipped.is_empty() {
                            None
                        } else {
                            let rows: Vec<String> =
                                file.skipped.iter().map(|r| format!("#{r}")).collect();
                            Some(view! {
                                <p class="warning">
                                    "Skipped for missing description: " {rows.join(", ")}
                                </p>
                            })
                        }}
                        <div>
                            {file.records.iter().map(record_card).collect_view()}
                        </div>
                    }
                    .into_any()
                }
            }}
        </div>
    }
}
