use std::collections::BTreeSet;

use crate::classifier::EntityClassifier;

/// The three buckets surfaced from the classifier's richer label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityCategory {
    People,
    Locations,
    Organizations,
}

impl EntityCategory {
    /// Map a raw recognizer label to a bucket. "GPE" and "LOC" both land in
    /// `Locations`; anything else (DATE, NORP, ...) is ignored.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "PERSON" => Some(Self::People),
            "GPE" | "LOC" => Some(Self::Locations),
            "ORG" => Some(Self::Organizations),
            _ => None,
        }
    }
}

/// Entities and counts derived from a single description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedEntities {
    pub people: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub organizations: BTreeSet<String>,
    /// Whitespace tokens in the description
    pub word_count: usize,
    /// |people ∪ locations ∪ organizations|
    pub unique_entity_count: usize,
}

impl ExtractedEntities {
    pub fn category(&self, category: EntityCategory) -> &BTreeSet<String> {
        match category {
            EntityCategory::People => &self.people,
            EntityCategory::Locations => &self.locations,
            EntityCategory::Organizations => &self.organizations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.locations.is_empty() && self.organizations.is_empty()
    }
}

/// Buckets classifier output for one text at a time.
#[derive(Clone, Copy)]
pub struct EntityAggregator<'c> {
    classifier: &'c dyn EntityClassifier,
}

impl<'c> EntityAggregator<'c> {
    pub fn new(classifier: &'c dyn EntityClassifier) -> Self {
        EntityAggregator { classifier }
    }

    /// Classify `text` once and bucket the spans. Repeated mentions of the
    /// same string within a category count once. Never fails.
    pub fn aggregate(&self, text: &str) -> ExtractedEntities {
        let mut people = BTreeSet::new();
        let mut locations = BTreeSet::new();
        let mut organizations = BTreeSet::new();

        for span in self.classifier.classify(text) {
            let bucket = match EntityCategory::from_label(&span.category) {
                Some(EntityCategory::People) => &mut people,
                Some(EntityCategory::Locations) => &mut locations,
                Some(EntityCategory::Organizations) => &mut organizations,
                None => continue,
            };
            bucket.insert(span.span);
        }

        let unique_entity_count = people
            .iter()
            .chain(&locations)
            .chain(&organizations)
            .collect::<BTreeSet<_>>()
            .len();

        ExtractedEntities {
            people,
            locations,
            organizations,
            word_count: word_count(text),
            unique_entity_count,
        }
    }
}

/// Crude whitespace token count, independent of the classifier's tokenizer.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
