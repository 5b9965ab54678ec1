use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use log::{info, warn};
use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// Gazetteer bundled with the binary, used when no `--gazetteer` is given.
const BUNDLED_GAZETTEER: &str = include_str!("../data/gazetteer.json");

// ── Types ────────────────────────────────────────────────────────────

/// One classified span of text, with the recognizer's raw label
/// (e.g. "PERSON", "GPE", "LOC", "ORG", "DATE").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySpan {
    pub span: String,
    pub category: String,
}

/// A pre-trained entity recognizer, loaded once and shared for the whole run.
///
/// Implementations must be deterministic per input: the same text always
/// yields the same spans.
pub trait EntityClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Vec<EntitySpan>;
}

// ── Gazetteer classifier ─────────────────────────────────────────────

/// Recognizes entities by exact match against a list of known surface
/// strings per label.
///
/// All surfaces are compiled into one alternation sorted longest-first, so
/// "New York City" wins over "New York" at the same position. Matches do
/// not overlap.
pub struct GazetteerClassifier {
    re: Regex,
    /// surface string → label
    labels: HashMap<String, String>,
    /// label → number of surfaces
    label_counts: BTreeMap<String, usize>,
}

impl GazetteerClassifier {
    /// Build from a label → surfaces map.
    pub fn from_entries(entries: BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut labels: HashMap<String, String> = HashMap::new();
        let mut label_counts: BTreeMap<String, usize> = BTreeMap::new();

        for (label, surfaces) in &entries {
            for surface in surfaces {
                let surface = surface.trim();
                if surface.is_empty() {
                    continue;
                }
                // First label wins (labels iterate in sorted order)
                if let Some(existing) = labels.get(surface) {
                    if existing != label {
                        warn!(
                            "event=gazetteer_conflict surface={surface:?} kept={existing} dropped={label}"
                        );
                    }
                    continue;
                }
                labels.insert(surface.to_string(), label.clone());
                *label_counts.entry(label.clone()).or_insert(0) += 1;
            }
        }

        if labels.is_empty() {
            return Err(Error::classifier_init("gazetteer has no entries"));
        }

        let re = Regex::new(&build_surface_regex(labels.keys().map(String::as_str)))
            .map_err(|e| Error::classifier_init(format!("cannot compile gazetteer: {e}")))?;

        Ok(GazetteerClassifier {
            re,
            labels,
            label_counts,
        })
    }

    /// Parse a gazetteer from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: BTreeMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| Error::classifier_init(format!("invalid gazetteer JSON: {e}")))?;
        Self::from_entries(entries)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::classifier_init(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_GAZETTEER)
    }

    pub fn label_counts(&self) -> &BTreeMap<String, usize> {
        &self.label_counts
    }
}

impl EntityClassifier for GazetteerClassifier {
    fn classify(&self, text: &str) -> Vec<EntitySpan> {
        self.re
            .find_iter(text)
            .filter_map(|m| {
                self.labels.get(m.as_str()).map(|label| EntitySpan {
                    span: m.as_str().to_string(),
                    category: label.clone(),
                })
            })
            .collect()
    }
}

/// Load the classifier once for the process: from `path` when given, else
/// the bundled gazetteer.
pub fn load_classifier(path: Option<&Path>) -> Result<GazetteerClassifier> {
    let classifier = match path {
        Some(p) => GazetteerClassifier::from_path(p)?,
        None => GazetteerClassifier::bundled()?,
    };
    let counts: Vec<String> = classifier
        .label_counts()
        .iter()
        .map(|(label, n)| format!("{label}={n}"))
        .collect();
    info!(
        "event=classifier_ready source={} entries={}",
        path.map(|p| p.display().to_string())
            .unwrap_or_else(|| "bundled".to_string()),
        counts.join(",")
    );
    Ok(classifier)
}

/// Build one alternation over all surfaces, longest first so the leftmost
/// match is also the longest.
///
/// Each edge is guarded against running into a neighbouring word: `\b` where
/// the surface has a word character at that edge, `\B` where it has
/// punctuation. So "U.S." matches before a space or at the end of the text
/// but not inside "U.S.S.R."
fn build_surface_regex<'a>(surfaces: impl Iterator<Item = &'a str>) -> String {
    let mut all: Vec<&str> = surfaces.collect();
    all.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });

    let alts: Vec<String> = all
        .iter()
        .map(|s| {
            let head = edge_guard(s.chars().next());
            let tail = edge_guard(s.chars().last());
            format!("{head}{}{tail}", regex::escape(s))
        })
        .collect();

    format!("(?:{})", alts.join("|"))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn edge_guard(edge: Option<char>) -> &'static str {
    match edge {
        Some(c) if is_word_char(c) => r"\b",
        Some(_) => r"\B",
        None => "",
    }
}

// ── Test support ─────────────────────────────────────────────────────
