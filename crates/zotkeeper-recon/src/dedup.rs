use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use zotkeeper_core::{Record, RecordKey};

use crate::error::{ReconError, Result};
use crate::similarity::{SimilarityWeights, score};

/// A maximal set of records judged to represent the same work. Keys are
/// sorted; membership is transitively closed at the configured threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub keys: Vec<RecordKey>,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.keys.contains(key)
    }
}

/// Partitions a record snapshot into duplicate groups.
///
/// All unordered pairs are scored (quadratic; library sizes are bounded and
/// this runs on demand), an edge is drawn where the composite meets the
/// threshold, and each connected component of size two or more becomes one
/// group.
#[derive(Debug, Clone)]
pub struct DuplicateFinder {
    threshold: f64,
    weights: SimilarityWeights,
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            weights: SimilarityWeights::default(),
        }
    }
}

impl DuplicateFinder {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    pub fn from_config(config: &zotkeeper_core::ReconcileConfig) -> Self {
        Self::new(config.similarity_threshold)
    }

    pub fn with_weights(mut self, weights: SimilarityWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn find(&self, records: &[Record]) -> Result<Vec<DuplicateGroup>> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(ReconError::Configuration(format!(
                "similarity threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }

        let mut dsu = DisjointSet::new(records.len());
        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                let pair = score(&records[i], &records[j], &self.weights);
                // Threshold is inclusive.
                if pair.composite >= self.threshold {
                    dsu.union(i, j);
                }
            }
        }

        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for idx in 0..records.len() {
            let root = dsu.find(idx);
            components.entry(root).or_default().push(idx);
        }

        let mut groups = Vec::new();
        for indexes in components.into_values() {
            if indexes.len() < 2 {
                continue;
            }
            let mut keys: Vec<RecordKey> =
                indexes.into_iter().map(|idx| records[idx].key.clone()).collect();
            keys.sort();
            groups.push(DuplicateGroup { keys });
        }

        groups.sort_by(|left, right| left.keys[0].cmp(&right.keys[0]));
        Ok(groups)
    }
}

#[derive(Debug, Clone)]
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, left: usize, right: usize) {
        let left_root = self.find(left);
        let right_root = self.find(right);

        if left_root == right_root {
            return;
        }

        let left_rank = self.rank[left_root];
        let right_rank = self.rank[right_root];

        if left_rank < right_rank {
            self.parent[left_root] = right_root;
        } else if left_rank > right_rank {
            self.parent[right_root] = left_root;
        } else {
            self.parent[right_root] = left_root;
            self.rank[left_root] += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zotkeeper_core::{Creator, CreatorType, ItemType};

    fn paper(key: &str, title: &str, doi: &str) -> Record {
        let mut record = Record::new(key, ItemType::JournalArticle);
        record.title = title.to_string();
        record.doi = doi.to_string();
        record.creators = vec![Creator::person(CreatorType::Author, "A.", "Smith")];
        record
    }

    #[test]
    fn identical_dois_group_despite_title_punctuation() {
        let records = vec![
            paper("KA", "Foo", "10.1/X"),
            paper("KB", "Foo.", "10.1/x"),
            paper("KC", "Entirely different work", ""),
        ];

        // Config default threshold is 0.85.
        let finder = DuplicateFinder::from_config(&zotkeeper_core::ReconcileConfig::default());
        let groups = finder.find(&records).expect("valid threshold");
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].keys,
            vec![RecordKey::from("KA"), RecordKey::from("KB")]
        );
    }

    #[test]
    fn grouping_is_transitively_closed() {
        // KA~KB through the shared DOI, KB~KC through title and authors;
        // KA and KC share nothing directly but must land in one group.
        let mut a = paper("KA", "Attention is all you need", "10.1/alpha");
        a.creators = vec![Creator::person(CreatorType::Author, "A.", "Vaswani")];
        let b = paper("KB", "Shared survey of methods", "10.1/alpha");
        let c = paper("KC", "Shared survey of methods", "");

        let weights = SimilarityWeights::default();
        let direct = score(&a, &c, &weights);
        assert!(direct.composite < 0.85, "KA and KC must not match directly");

        let groups = DuplicateFinder::new(0.85)
            .find(&[a, b, c])
            .expect("valid threshold");

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn every_record_appears_in_at_most_one_group() {
        let records = vec![
            paper("K1", "Alpha study", "10.1/a"),
            paper("K2", "Alpha study", "10.1/a"),
            paper("K3", "Beta review", "10.2/b"),
            paper("K4", "Beta review", "10.2/b"),
            paper("K5", "Gamma note", ""),
        ];

        let groups = DuplicateFinder::new(0.85).find(&records).expect("valid threshold");
        assert_eq!(groups.len(), 2);

        let mut seen = Vec::new();
        for group in &groups {
            assert!(group.len() >= 2);
            for key in &group.keys {
                assert!(!seen.contains(key), "{key} grouped twice");
                seen.push(key.clone());
            }
        }
    }

    #[test]
    fn threshold_is_inclusive_and_validated() {
        let mut a = paper("K1", "Exact same title", "");
        let mut b = paper("K2", "Exact same title", "");
        a.creators.clear();
        b.creators.clear();

        // Identical normalized titles score 0.7 with default weights and no
        // authors; a threshold of exactly 0.7 must still match.
        let groups = DuplicateFinder::new(0.7).find(&[a, b]).expect("valid threshold");
        assert_eq!(groups.len(), 1);

        assert!(DuplicateFinder::new(0.0).find(&[]).is_err());
        assert!(DuplicateFinder::new(1.2).find(&[]).is_err());
    }
}
