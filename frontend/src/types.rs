// Re-export shared types from timeline_types
pub use timeline_types::{
    DatePrecision, EnrichedRecord, HorizontalAlign, RecordsFile, TimelineFile, TimelinePoint,
    VerticalAlign,
};

/// GET a JSON data file written by the CLI into the served `data/` directory.
pub async fn fetch_json<T: serde::de::DeserializeOwned>(url: &str) -> Result<T, String> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !resp.ok() {
        return Err(format!("{url}: HTTP {}", resp.status()));
    }
    resp.json::<T>().await.map_err(|e| e.to_string())
}
