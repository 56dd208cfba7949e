use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use zotkeeper_core::{
    Field, FieldChange, ItemType, LibraryGateway, ReconcileConfig, Record, RecordFilter,
    RecordPatch, commit_patch,
};

use crate::enrichment::{
    EnrichStatus, EnrichmentOutcome, EnrichmentStats, default_target_fields,
};
use crate::error::{ReconError, Result};
use crate::identifiers::doi_from_record;
use crate::sources::{
    CrossRefSource, MetadataSource, OpenAlexSource, RawMetadata, SemanticScholarSource,
};

static CITATION_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^Citation Count:\s*\d+\s*$").expect("valid regex"));

/// Multi-source enrichment: fill missing fields from external services in a
/// fixed priority order, never overwriting user data.
pub struct Enricher {
    sources: Vec<Arc<dyn MetadataSource>>,
    gateway: Arc<dyn LibraryGateway>,
    config: ReconcileConfig,
}

impl Enricher {
    /// Production wiring: CrossRef, then OpenAlex, then Semantic Scholar.
    pub fn new(gateway: Arc<dyn LibraryGateway>, config: ReconcileConfig) -> Self {
        let sources: Vec<Arc<dyn MetadataSource>> = vec![
            Arc::new(CrossRefSource::from_config(&config)),
            Arc::new(OpenAlexSource::from_config(&config)),
            Arc::new(SemanticScholarSource::from_config(&config)),
        ];
        Self::with_sources(gateway, config, sources)
    }

    /// Caller-supplied clients, in lookup priority order.
    pub fn with_sources(
        gateway: Arc<dyn LibraryGateway>,
        config: ReconcileConfig,
        sources: Vec<Arc<dyn MetadataSource>>,
    ) -> Self {
        Self {
            sources,
            gateway,
            config,
        }
    }

    /// Records of enrichable types missing at least one required field.
    pub async fn find_incomplete(&self) -> Result<Vec<Record>> {
        let filter = RecordFilter {
            item_types: vec![
                ItemType::JournalArticle,
                ItemType::ConferencePaper,
                ItemType::Preprint,
            ],
            tag: None,
        };
        let records = self.gateway.list(&filter).await?;

        Ok(records
            .into_iter()
            .filter(|record| {
                self.config
                    .required_fields
                    .iter()
                    .any(|field| record.field_is_empty(*field))
            })
            .collect())
    }

    /// One-call library pass: list incomplete records and enrich them with
    /// the config defaults, including the dry-run-by-default policy.
    pub async fn enrich_incomplete(&self) -> Result<EnrichmentStats> {
        let records = self.find_incomplete().await?;
        self.enrich(&records, None, self.config.dry_run).await
    }

    /// Enrich a batch. For each record with a usable DOI and at least one
    /// empty target field, sources are queried in priority order and each
    /// still-empty field takes the first value any source supplies. Existing
    /// values are never overwritten; per-item failures do not stop the batch.
    pub async fn enrich(
        &self,
        records: &[Record],
        targets: Option<&[Field]>,
        dry_run: bool,
    ) -> Result<EnrichmentStats> {
        let targets = match targets {
            Some(fields) => fields.to_vec(),
            None => default_target_fields(),
        };
        if targets.is_empty() {
            return Err(ReconError::Configuration(
                "enrichment needs at least one target field".to_string(),
            ));
        }

        let mut stats = EnrichmentStats {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            let outcome = self.enrich_one(record, &targets, dry_run).await;
            if outcome.status == EnrichStatus::Error {
                tracing::warn!(
                    key = %record.key,
                    reason = outcome.reason.as_deref().unwrap_or("unknown"),
                    "enrichment failed for item"
                );
            }
            stats.push(outcome);
        }

        Ok(stats)
    }

    async fn enrich_one(
        &self,
        record: &Record,
        targets: &[Field],
        dry_run: bool,
    ) -> EnrichmentOutcome {
        let Some(doi) = doi_from_record(record) else {
            return EnrichmentOutcome::skipped(&record.key, "no usable DOI", dry_run);
        };

        if !targets.iter().any(|field| record.field_is_empty(*field)) {
            return EnrichmentOutcome::skipped(&record.key, "all target fields present", dry_run);
        }

        let mut changes: BTreeMap<Field, FieldChange> = BTreeMap::new();
        let mut source_failure: Option<String> = None;

        for source in &self.sources {
            let unfilled: Vec<Field> = targets
                .iter()
                .copied()
                .filter(|field| record.field_is_empty(*field) && !changes.contains_key(field))
                .collect();
            if unfilled.is_empty() {
                break;
            }

            match source.lookup_doi(&doi).await {
                Ok(Some(metadata)) => {
                    collect_changes(&mut changes, &unfilled, &metadata);
                }
                Ok(None) => {}
                Err(err) => {
                    source_failure = Some(format!("{}: {err}", source.name()));
                }
            }
        }

        if changes.is_empty() {
            return match source_failure {
                Some(reason) => EnrichmentOutcome::errored(&record.key, reason, dry_run),
                None => {
                    EnrichmentOutcome::skipped(&record.key, "no source supplied data", dry_run)
                }
            };
        }

        self.commit_changes(record, changes, dry_run).await
    }

    /// Upsert citation counts into the extra field, replacing a stale
    /// `Citation Count:` line in place.
    pub async fn enrich_citation_counts(
        &self,
        records: &[Record],
        dry_run: bool,
    ) -> Result<EnrichmentStats> {
        let mut stats = EnrichmentStats {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            let Some(doi) = doi_from_record(record) else {
                stats.push(EnrichmentOutcome::skipped(
                    &record.key,
                    "no usable DOI",
                    dry_run,
                ));
                continue;
            };

            let mut count = None;
            for source in &self.sources {
                match source.lookup_doi(&doi).await {
                    Ok(Some(RawMetadata {
                        citation_count: Some(found),
                        ..
                    })) => {
                        count = Some(found);
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(
                            key = %record.key,
                            source = source.name(),
                            "citation count lookup failed: {err}"
                        );
                    }
                }
            }

            let Some(count) = count else {
                stats.push(EnrichmentOutcome::skipped(
                    &record.key,
                    "no source reported a citation count",
                    dry_run,
                ));
                continue;
            };

            let new_extra = upsert_citation_count(&record.extra, count);
            if new_extra == record.extra {
                stats.push(EnrichmentOutcome::skipped(
                    &record.key,
                    "citation count already current",
                    dry_run,
                ));
                continue;
            }

            let mut changes = BTreeMap::new();
            changes.insert(
                Field::Extra,
                FieldChange {
                    old: record.extra.clone(),
                    new: new_extra,
                    source: "citation counts".to_string(),
                },
            );
            stats.push(self.commit_changes(record, changes, dry_run).await);
        }

        Ok(stats)
    }

    async fn commit_changes(
        &self,
        record: &Record,
        changes: BTreeMap<Field, FieldChange>,
        dry_run: bool,
    ) -> EnrichmentOutcome {
        let mut patch = RecordPatch::default();
        for (field, change) in &changes {
            patch.set_field(*field, change.new.clone());
        }

        match commit_patch(self.gateway.as_ref(), record, &patch, dry_run).await {
            Ok(_) => EnrichmentOutcome::enriched(&record.key, changes, dry_run),
            Err(err) => EnrichmentOutcome::errored(&record.key, err.to_string(), dry_run),
        }
    }
}

fn collect_changes(
    changes: &mut BTreeMap<Field, FieldChange>,
    unfilled: &[Field],
    metadata: &RawMetadata,
) {
    for field in unfilled {
        if let Some(value) = metadata.field_value(*field) {
            changes.insert(
                *field,
                FieldChange {
                    old: String::new(),
                    new: value.to_string(),
                    source: metadata.source.clone(),
                },
            );
        }
    }
}

fn upsert_citation_count(extra: &str, count: u64) -> String {
    let line = format!("Citation Count: {count}");
    if CITATION_COUNT_RE.is_match(extra) {
        CITATION_COUNT_RE.replace(extra, line.as_str()).into_owned()
    } else if extra.trim().is_empty() {
        line
    } else {
        format!("{}\n{line}", extra.trim_end())
    }
}
