use std::collections::BTreeSet;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use timeline_types::{CorpusInsights, EnrichedRecord};

use crate::aggregate::{EntityAggregator, ExtractedEntities};
use crate::error::{Error, Result};

// ── Types ────────────────────────────────────────────────────────────

/// A dataset row as loaded, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// 1-based position in the source dataset
    pub row: usize,
    pub date: String,
    pub event: String,
    /// `None` when the source cell was absent or null. Never coerced to "".
    pub description: Option<String>,
    /// Source columns outside the date/event/description mapping, in order
    pub extra: Vec<(String, String)>,
}

/// What to do with records whose description is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingTextPolicy {
    /// Fail the whole batch on the first offending record
    #[default]
    Abort,
    /// Drop offending records, reporting each once
    Skip,
}

/// A record whose description was present, with the entities extracted
/// from it.
#[derive(Debug, Clone)]
pub struct EnrichedRow {
    /// 1-based position in the source dataset
    pub row: usize,
    pub date: String,
    pub event: String,
    pub description: String,
    pub extra: Vec<(String, String)>,
    pub entities: ExtractedEntities,
}

impl EnrichedRow {
    pub fn to_record(&self) -> EnrichedRecord {
        let e = &self.entities;
        EnrichedRecord {
            date: self.date.clone(),
            event: self.event.clone(),
            description: self.description.clone(),
            people: e.people.iter().cloned().collect(),
            locations: e.locations.iter().cloned().collect(),
            organizations: e.organizations.iter().cloned().collect(),
            word_count: e.word_count,
            unique_entity_count: e.unique_entity_count,
        }
    }
}

#[derive(Debug)]
pub struct Enrichment {
    /// Enriched rows in input order
    pub rows: Vec<EnrichedRow>,
    pub insights: CorpusInsights,
    /// Row numbers dropped under `MissingTextPolicy::Skip`
    pub skipped: Vec<usize>,
}

// ── Enricher ─────────────────────────────────────────────────────────

pub struct Enricher<'c> {
    aggregator: EntityAggregator<'c>,
    policy: MissingTextPolicy,
    /// Source column name of the description, for error reports
    description_column: String,
    parallel: bool,
}

impl<'c> Enricher<'c> {
    pub fn new(aggregator: EntityAggregator<'c>, description_column: &str) -> Self {
        Enricher {
            aggregator,
            policy: MissingTextPolicy::default(),
            description_column: description_column.to_string(),
            parallel: false,
        }
    }

    pub fn with_policy(mut self, policy: MissingTextPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fan per-record aggregation out over the rayon pool. Output order
    /// still follows input order.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enrich every record, then roll up corpus insights.
    ///
    /// Records are validated before any classification runs, so an aborted
    /// batch produces no partial output.
    pub fn enrich(&self, records: Vec<EventRecord>) -> Result<Enrichment> {
        // Description moved out of each record so it is held exactly once
        let mut valid: Vec<(EventRecord, String)> = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();

        for mut record in records {
            match record.description.take() {
                Some(text) => valid.push((record, text)),
                None => match self.policy {
                    MissingTextPolicy::Abort => {
                        return Err(Error::MissingField {
                            row: record.row,
                            column: self.description_column.clone(),
                        });
                    }
                    MissingTextPolicy::Skip => {
                        warn!(
                            "event=record_skipped row={} column={} reason=missing_text",
                            record.row, self.description_column
                        );
                        skipped.push(record.row);
                    }
                },
            }
        }

        let entities: Vec<ExtractedEntities> = if self.parallel {
            valid
                .par_iter()
                .map(|(_, text)| self.aggregator.aggregate(text))
                .collect()
        } else {
            valid
                .iter()
                .map(|(_, text)| self.aggregator.aggregate(text))
                .collect()
        };

        let rows: Vec<EnrichedRow> = valid
            .into_iter()
            .zip(entities)
            .map(|((record, description), entities)| {
                debug!(
                    "event=record_enriched row={} words={} unique_entities={}",
                    record.row, entities.word_count, entities.unique_entity_count
                );
                EnrichedRow {
                    row: record.row,
                    date: record.date,
                    event: record.event,
                    description,
                    extra: record.extra,
                    entities,
                }
            })
            .collect();

        let insights = corpus_insights(rows.iter().map(|r| &r.entities));
        info!(
            "event=enrich_done records={} skipped={} people={} locations={} organizations={}",
            rows.len(),
            skipped.len(),
            insights.unique_people,
            insights.unique_locations,
            insights.unique_organizations
        );

        Ok(Enrichment {
            rows,
            insights,
            skipped,
        })
    }
}

/// Distinct entities per category across all records: set union, so an
/// entity mentioned in several records counts once.
pub fn corpus_insights<'a>(
    entities: impl IntoIterator<Item = &'a ExtractedEntities>,
) -> CorpusInsights {
    let mut people: BTreeSet<&str> = BTreeSet::new();
    let mut locations: BTreeSet<&str> = BTreeSet::new();
    let mut organizations: BTreeSet<&str> = BTreeSet::new();

    for e in entities {
        people.extend(e.people.iter().map(String::as_str));
        locations.extend(e.locations.iter().map(String::as_str));
        organizations.extend(e.organizations.iter().map(String::as_str));
    }

    CorpusInsights {
        unique_people: people.len(),
        unique_locations: locations.len(),
        unique_organizations: organizations.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::testing::StaticClassifier;

    const NAPOLEON: &str = "Napoleon invaded Russia in 1812.";
    const UN: &str = "The United Nations was founded in New York.";
    const RETREAT: &str = "Napoleon retreated from Russia.";

    fn classifier() -> StaticClassifier {
        StaticClassifier::default()
            .with(NAPOLEON, &[("Napoleon", "PERSON"), ("Russia", "GPE"), ("1812", "DATE")])
            .with(UN, &[("the United Nations", "ORG"), ("New York", "GPE")])
            .with(RETREAT, &[("Napoleon", "PERSON"), ("Russia", "GPE")])
    }

    fn record(row: usize, description: Option<&str>) -> EventRecord {
        EventRecord {
            row,
            date: format!("19{row:02}-01-01"),
            event: format!("Event {row}"),
            description: description.map(str::to_string),
            extra: Vec::new(),
        }
    }

    #[test]
    fn test_end_to_end_three_records() {
        let c = classifier();
        let enricher = Enricher::new(EntityAggregator::new(&c), "description");
        let out = enricher
            .enrich(vec![
                record(1, Some(NAPOLEON)),
                record(2, Some("")),
                record(3, Some(UN)),
            ])
            .unwrap();

        assert_eq!(out.rows.len(), 3);
        assert!(!out.rows[0].entities.is_empty());
        assert!(out.rows[1].entities.is_empty());
        assert_eq!(out.rows[1].entities.word_count, 0);
        assert!(!out.rows[2].entities.is_empty());

        let expected = corpus_insights([&out.rows[0].entities, &out.rows[2].entities]);
        assert_eq!(out.insights, expected);
        assert_eq!(
            out.insights,
            CorpusInsights {
                unique_people: 1,
                unique_locations: 2,
                unique_organizations: 1,
            }
        );
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn test_insights_use_union_not_concatenation() {
        let c = classifier();
        let enricher = Enricher::new(EntityAggregator::new(&c), "description");
        let out = enricher
            .enrich(vec![record(1, Some(NAPOLEON)), record(2, Some(RETREAT))])
            .unwrap();
        assert_eq!(out.insights.unique_people, 1);
        assert_eq!(out.insights.unique_locations, 1);
    }

    #[test]
    fn test_insights_are_order_independent() {
        let c = classifier();
        let enricher = Enricher::new(EntityAggregator::new(&c), "description");
        let forward = enricher
            .enrich(vec![
                record(1, Some(NAPOLEON)),
                record(2, Some(UN)),
                record(3, Some(RETREAT)),
            ])
            .unwrap();
        let reversed = enricher
            .enrich(vec![
                record(3, Some(RETREAT)),
                record(2, Some(UN)),
                record(1, Some(NAPOLEON)),
            ])
            .unwrap();
        assert_eq!(forward.insights, reversed.insights);
    }

    #[test]
    fn test_missing_description_aborts_batch() {
        let c = classifier();
        let enricher = Enricher::new(EntityAggregator::new(&c), "Description");
        let err = enricher
            .enrich(vec![record(1, Some(NAPOLEON)), record(2, None), record(3, None)])
            .unwrap_err();
        match err {
            Error::MissingField { row, column } => {
                assert_eq!(row, 2);
                assert_eq!(column, "Description");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_description_skip_policy() {
        let c = classifier();
        let enricher = Enricher::new(EntityAggregator::new(&c), "description")
            .with_policy(MissingTextPolicy::Skip);
        let out = enricher
            .enrich(vec![record(1, Some(NAPOLEON)), record(2, None), record(3, Some(UN))])
            .unwrap();
        assert_eq!(out.skipped, vec![2]);
        let rows: Vec<usize> = out.rows.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let c = classifier();
        let records: Vec<EventRecord> = (1..=40)
            .map(|i| {
                let text = [NAPOLEON, UN, RETREAT, ""][i % 4];
                record(i, Some(text))
            })
            .collect();

        let sequential = Enricher::new(EntityAggregator::new(&c), "description")
            .enrich(records.clone())
            .unwrap();
        let parallel = Enricher::new(EntityAggregator::new(&c), "description")
            .with_parallel(true)
            .enrich(records)
            .unwrap();

        assert_eq!(sequential.insights, parallel.insights);
        let seq_rows: Vec<usize> = sequential.rows.iter().map(|r| r.row).collect();
        let par_rows: Vec<usize> = parallel.rows.iter().map(|r| r.row).collect();
        assert_eq!(seq_rows, par_rows);
        for (s, p) in sequential.rows.iter().zip(&parallel.rows) {
            assert_eq!(s.entities, p.entities);
        }
    }

    #[test]
    fn test_enriched_row_carries_source_fields() {
        let c = classifier();
        let mut source = record(4, Some(NAPOLEON));
        source.extra = vec![("id".to_string(), "41".to_string())];
        let out = Enricher::new(EntityAggregator::new(&c), "description")
            .enrich(vec![source])
            .unwrap();
        let row = &out.rows[0];
        assert_eq!(row.row, 4);
        assert_eq!(row.date, "1904-01-01");
        assert_eq!(row.event, "Event 4");
        assert_eq!(row.description, NAPOLEON);
        assert_eq!(row.extra, vec![("id".to_string(), "41".to_string())]);
    }

    #[test]
    fn test_to_record_fields() {
        let c = classifier();
        let out = Enricher::new(EntityAggregator::new(&c), "description")
            .enrich(vec![record(7, Some(UN))])
            .unwrap();
        let r = out.rows[0].to_record();
        assert_eq!(r.description, UN);
        assert_eq!(r.organizations, vec!["the United Nations".to_string()]);
        assert_eq!(r.locations, vec!["New York".to_string()]);
        assert!(r.people.is_empty());
        assert_eq!(r.word_count, 8);
        assert_eq!(r.unique_entity_count, 2);
    }
}
