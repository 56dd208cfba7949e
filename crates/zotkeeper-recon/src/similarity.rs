use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use zotkeeper_core::{Record, RecordKey};

use crate::identifiers::Doi;
use crate::normalize::normalize_title;

/// Component weights for the composite score. Title must carry at least the
/// author weight; the pair sums to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub title: f64,
    pub authors: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            title: 0.7,
            authors: 0.3,
        }
    }
}

/// Composite similarity between two records. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    pub a: RecordKey,
    pub b: RecordKey,
    pub composite: f64,
    pub title: f64,
    pub authors: f64,
    pub identifier_match: bool,
}

/// Score two records. Pure and symmetric; DOI equality is authoritative and
/// forces the composite to 1.0 regardless of the other components.
pub fn score(a: &Record, b: &Record, weights: &SimilarityWeights) -> SimilarityScore {
    let title = title_similarity(&a.title, &b.title);
    let authors = author_overlap(a, b);
    let identifier_match = dois_match(&a.doi, &b.doi);

    let composite = if identifier_match {
        1.0
    } else {
        weights.title * title + weights.authors * authors
    };

    SimilarityScore {
        a: a.key.clone(),
        b: b.key.clone(),
        composite,
        title,
        authors,
        identifier_match,
    }
}

fn title_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_title(a);
    let b = normalize_title(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

/// Jaccard index over normalized creator last names.
fn author_overlap(a: &Record, b: &Record) -> f64 {
    let set_a = last_names(a);
    let set_b = last_names(b);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

fn last_names(record: &Record) -> BTreeSet<String> {
    record
        .creators
        .iter()
        .filter_map(|creator| creator.last_name.as_deref().or(creator.name.as_deref()))
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

fn dois_match(a: &str, b: &str) -> bool {
    if a.trim().is_empty() || b.trim().is_empty() {
        return false;
    }
    let normalize = |raw: &str| {
        Doi::parse(raw)
            .map(|doi| doi.normalized)
            .unwrap_or_else(|_| raw.trim().to_lowercase())
    };
    normalize(a) == normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zotkeeper_core::{Creator, CreatorType, ItemType};

    fn paper(key: &str, title: &str, doi: &str, authors: &[&str]) -> Record {
        let mut record = Record::new(key, ItemType::JournalArticle);
        record.title = title.to_string();
        record.doi = doi.to_string();
        record.creators = authors
            .iter()
            .map(|last| Creator::person(CreatorType::Author, "A.", *last))
            .collect();
        record
    }

    #[test]
    fn scoring_is_symmetric() {
        let a = paper("K1", "Deep learning", "", &["LeCun", "Bengio"]);
        let b = paper("K2", "Deep learning methods", "", &["Bengio", "Hinton"]);
        let weights = SimilarityWeights::default();

        let ab = score(&a, &b, &weights);
        let ba = score(&b, &a, &weights);

        assert_eq!(ab.composite, ba.composite);
        assert_eq!(ab.title, ba.title);
        assert_eq!(ab.authors, ba.authors);
    }

    #[test]
    fn matching_dois_are_authoritative() {
        // Trailing punctuation keeps the titles below any sane threshold on
        // their own, but the shared DOI forces a perfect score.
        let a = paper("K1", "Foo", "10.1/X", &[]);
        let b = paper("K2", "Foo.", "https://doi.org/10.1/x", &[]);

        let result = score(&a, &b, &SimilarityWeights::default());
        assert!(result.identifier_match);
        assert_eq!(result.composite, 1.0);
    }

    #[test]
    fn different_dois_fall_back_to_the_weighted_sum() {
        let a = paper("K1", "Same title", "10.1/one", &["Smith"]);
        let b = paper("K2", "Same title", "10.1/two", &["Smith"]);

        let result = score(&a, &b, &SimilarityWeights::default());
        assert!(!result.identifier_match);
        assert!(result.composite > 0.99);
    }

    #[test]
    fn author_overlap_is_jaccard_over_last_names() {
        let a = paper("K1", "T", "", &["Smith", "Jones"]);
        let b = paper("K2", "T", "", &["Smith", "Jones", "Brown", "White"]);
        let result = score(&a, &b, &SimilarityWeights::default());
        assert!((result.authors - 0.5).abs() < 1e-9);

        let c = paper("K3", "T", "", &[]);
        assert_eq!(score(&a, &c, &SimilarityWeights::default()).authors, 0.0);
    }

    #[test]
    fn missing_titles_contribute_nothing() {
        let a = paper("K1", "", "", &["Smith"]);
        let b = paper("K2", "Anything", "", &["Smith"]);
        let result = score(&a, &b, &SimilarityWeights::default());
        assert_eq!(result.title, 0.0);
        assert!((result.composite - 0.3).abs() < 1e-9);
    }
}
