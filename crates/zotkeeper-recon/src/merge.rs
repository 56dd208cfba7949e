use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use zotkeeper_core::{
    Field, LibraryGateway, Record, RecordKey, RecordPatch, WriteOutcome, commit_patch,
};

use crate::dedup::DuplicateGroup;
use crate::error::{ReconError, Result};

/// The computed plan for consolidating one duplicate group: the surviving
/// record, which donor supplies each missing field, and which records are
/// deletion candidates once the merge has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeStrategy {
    pub keep: RecordKey,
    /// Field -> donor whose value fills it. Only fields empty on the keep
    /// record ever appear here.
    pub field_sources: BTreeMap<Field, RecordKey>,
    pub delete: Vec<RecordKey>,
    /// Union of the group's tags, present when it adds to the keep record.
    pub merged_tags: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Deletion never happens unless explicitly requested.
    pub delete_duplicates: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub keep: RecordKey,
    pub write: WriteOutcome,
    pub deleted: Vec<RecordKey>,
}

/// Rank records for keep selection: a DOI beats none, then metadata
/// completeness, then the lexicographically smallest key. The same order
/// ranks donors, so repeated runs over the same snapshot are identical.
fn keep_order(a: &Record, b: &Record) -> Ordering {
    let a_has_doi = !a.doi.trim().is_empty();
    let b_has_doi = !b.doi.trim().is_empty();

    b_has_doi
        .cmp(&a_has_doi)
        .then_with(|| b.completeness_score().cmp(&a.completeness_score()))
        .then_with(|| a.key.cmp(&b.key))
}

/// Compute the merge plan for one duplicate group. Deterministic: the same
/// group and record contents always yield the same strategy.
pub fn build_strategy(group: &DuplicateGroup, records: &[Record]) -> Result<MergeStrategy> {
    if group.len() < 2 {
        return Err(ReconError::Configuration(
            "merge needs a duplicate group of at least two records".to_string(),
        ));
    }

    let mut members = Vec::with_capacity(group.len());
    for key in &group.keys {
        let record = records
            .iter()
            .find(|record| &record.key == key)
            .ok_or_else(|| {
                ReconError::Configuration(format!("duplicate group references unknown record {key}"))
            })?;
        members.push(record);
    }

    members.sort_by(|a, b| keep_order(a, b));
    let keep = members[0];
    let donors = &members[1..];

    let mut field_sources = BTreeMap::new();
    for field in Field::ALL {
        if !keep.field_is_empty(*field) {
            continue;
        }
        // First donor in rank order wins conflicting values.
        if let Some(donor) = donors.iter().find(|donor| !donor.field_is_empty(*field)) {
            field_sources.insert(*field, donor.key.clone());
        }
    }

    let tag_union: BTreeSet<String> = members
        .iter()
        .flat_map(|record| record.tags.iter().cloned())
        .collect();
    let merged_tags = (tag_union != keep.tags).then_some(tag_union);

    let mut delete: Vec<RecordKey> = donors.iter().map(|donor| donor.key.clone()).collect();
    delete.sort();

    Ok(MergeStrategy {
        keep: keep.key.clone(),
        field_sources,
        delete,
        merged_tags,
    })
}

/// Apply a merge plan through the gateway. The keep-record update must
/// succeed before any delete is issued; a failed update aborts the whole
/// merge so no data is lost.
pub async fn execute_merge(
    gateway: &dyn LibraryGateway,
    records: &[Record],
    strategy: &MergeStrategy,
    options: MergeOptions,
) -> Result<MergeOutcome> {
    let find = |key: &RecordKey| {
        records
            .iter()
            .find(|record| &record.key == key)
            .ok_or_else(|| {
                ReconError::Configuration(format!("merge strategy references unknown record {key}"))
            })
    };

    let keep = find(&strategy.keep)?;

    let mut patch = RecordPatch::default();
    for (field, donor_key) in &strategy.field_sources {
        let donor = find(donor_key)?;
        patch.set_field(*field, field.get(donor));
    }
    if let Some(tags) = &strategy.merged_tags {
        patch.tags = Some(tags.clone());
    }

    let write = commit_patch(gateway, keep, &patch, options.dry_run).await?;

    let mut deleted = Vec::new();
    if options.delete_duplicates && !options.dry_run {
        for key in &strategy.delete {
            gateway.delete(key).await?;
            deleted.push(key.clone());
        }
    }

    if !options.dry_run {
        tracing::info!(
            keep = %strategy.keep,
            fields = strategy.field_sources.len(),
            deleted = deleted.len(),
            "merged duplicate group"
        );
    }

    Ok(MergeOutcome {
        keep: strategy.keep.clone(),
        write,
        deleted,
    })
}
