mod pipeline;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use zotkeeper_core::{Field, FieldChange, RecordKey};

pub use pipeline::Enricher;

/// Fields the pipeline fills when the caller does not name its own set.
pub fn default_target_fields() -> Vec<Field> {
    vec![
        Field::AbstractNote,
        Field::Date,
        Field::PublicationTitle,
        Field::Volume,
        Field::Issue,
        Field::Pages,
        Field::Issn,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichStatus {
    Enriched,
    Skipped,
    Error,
}

/// Per-record outcome with field-level provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentOutcome {
    pub key: RecordKey,
    pub status: EnrichStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub changes: BTreeMap<Field, FieldChange>,
    pub dry_run: bool,
}

impl EnrichmentOutcome {
    fn new(key: &RecordKey, status: EnrichStatus, dry_run: bool) -> Self {
        Self {
            key: key.clone(),
            status,
            reason: None,
            changes: BTreeMap::new(),
            dry_run,
        }
    }

    pub(crate) fn skipped(key: &RecordKey, reason: &str, dry_run: bool) -> Self {
        let mut outcome = Self::new(key, EnrichStatus::Skipped, dry_run);
        outcome.reason = Some(reason.to_string());
        outcome
    }

    pub(crate) fn errored(key: &RecordKey, reason: String, dry_run: bool) -> Self {
        let mut outcome = Self::new(key, EnrichStatus::Error, dry_run);
        outcome.reason = Some(reason);
        outcome
    }

    pub(crate) fn enriched(
        key: &RecordKey,
        changes: BTreeMap<Field, FieldChange>,
        dry_run: bool,
    ) -> Self {
        let mut outcome = Self::new(key, EnrichStatus::Enriched, dry_run);
        outcome.changes = changes;
        outcome
    }
}

/// Aggregate counts for one batch; per-item failures land here instead of
/// aborting the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentStats {
    pub total: usize,
    pub enriched: usize,
    pub skipped: usize,
    pub errors: usize,
    pub outcomes: Vec<EnrichmentOutcome>,
}

impl EnrichmentStats {
    pub(crate) fn push(&mut self, outcome: EnrichmentOutcome) {
        match outcome.status {
            EnrichStatus::Enriched => self.enriched += 1,
            EnrichStatus::Skipped => self.skipped += 1,
            EnrichStatus::Error => self.errors += 1,
        }
        self.outcomes.push(outcome);
    }
}
