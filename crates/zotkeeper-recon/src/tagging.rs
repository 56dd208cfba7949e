use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use zotkeeper_core::{LibraryGateway, Record, RecordKey, RecordPatch, commit_patch};

use crate::error::Result;

/// Tag -> trigger keywords searched in title and abstract.
pub type KeywordMap = BTreeMap<String, Vec<String>>;

/// The stock research-area map; callers usually supply their own.
pub fn default_keyword_map() -> KeywordMap {
    let entries: [(&str, &[&str]); 7] = [
        (
            "machine-learning",
            &["machine learning", "neural network", "deep learning", "artificial intelligence"],
        ),
        (
            "climate-change",
            &["climate change", "global warming", "carbon emissions", "greenhouse gas"],
        ),
        (
            "public-health",
            &["public health", "epidemiology", "disease prevention", "healthcare"],
        ),
        (
            "education",
            &["pedagogy", "teaching", "curriculum", "student"],
        ),
        (
            "economics",
            &["economic", "market", "inflation", "monetary"],
        ),
        (
            "neuroscience",
            &["brain", "neural", "cognitive", "neuron", "fmri"],
        ),
        ("genetics", &["gene", "dna", "genome", "genetic", "mutation"]),
    ];

    entries
        .into_iter()
        .map(|(tag, keywords)| {
            (
                tag.to_string(),
                keywords.iter().map(ToString::to_string).collect(),
            )
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSuggestion {
    pub key: RecordKey,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagStats {
    pub total: usize,
    pub tagged: usize,
    pub skipped: usize,
    pub errors: usize,
    pub suggestions: Vec<TagSuggestion>,
    pub dry_run: bool,
}

/// Content-driven tagging: a keyword hit in the title or abstract unions
/// the mapped tag into the record's tag set.
pub struct AutoTagger {
    gateway: Arc<dyn LibraryGateway>,
}

impl AutoTagger {
    pub fn new(gateway: Arc<dyn LibraryGateway>) -> Self {
        Self { gateway }
    }

    pub async fn auto_tag(
        &self,
        records: &[Record],
        keyword_map: &KeywordMap,
        dry_run: bool,
    ) -> Result<TagStats> {
        let mut stats = TagStats {
            total: records.len(),
            dry_run,
            ..Default::default()
        };

        for record in records {
            let suggested = suggest_tags(record, keyword_map);
            if suggested.is_empty() {
                stats.skipped += 1;
                continue;
            }

            let mut merged = record.tags.clone();
            merged.extend(suggested.iter().cloned());

            let patch = RecordPatch {
                tags: Some(merged),
                ..Default::default()
            };
            match commit_patch(self.gateway.as_ref(), record, &patch, dry_run).await {
                Ok(_) => {
                    stats.tagged += 1;
                    stats.suggestions.push(TagSuggestion {
                        key: record.key.clone(),
                        tags: suggested,
                    });
                }
                Err(err) => {
                    tracing::warn!(key = %record.key, "auto-tag write failed: {err}");
                    stats.errors += 1;
                }
            }
        }

        Ok(stats)
    }
}

/// Tags whose keywords appear in the record text and are not already set.
fn suggest_tags(record: &Record, keyword_map: &KeywordMap) -> BTreeSet<String> {
    let text = format!("{} {}", record.title, record.abstract_note).to_lowercase();

    keyword_map
        .iter()
        .filter(|(tag, _)| !record.tags.contains(tag.as_str()))
        .filter(|(_, keywords)| {
            keywords
                .iter()
                .any(|keyword| text.contains(&keyword.to_lowercase()))
        })
        .map(|(tag, _)| tag.clone())
        .collect()
}
