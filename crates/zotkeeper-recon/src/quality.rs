use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zotkeeper_core::{
    DateFormat, Field, ItemType, LibraryGateway, ReconcileConfig, Record, RecordKey, RecordPatch,
    commit_patch,
};

use crate::error::Result;
use crate::http::RateLimitedClient;
use crate::identifiers::Doi;
use crate::normalize::{is_plausible_date, normalize_creator, normalize_date};

/// One offending record with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub key: RecordKey,
    pub reason: String,
}

impl Finding {
    fn new(key: &RecordKey, reason: impl Into<String>) -> Self {
        Self {
            key: key.clone(),
            reason: reason.into(),
        }
    }
}

/// Read-only audit result: findings per category plus summary counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub total: usize,
    pub generated_at: DateTime<Utc>,
    pub missing_fields: Vec<Finding>,
    pub invalid_dois: Vec<Finding>,
    pub malformed_dates: Vec<Finding>,
    pub empty_titles: Vec<Finding>,
    pub missing_authors: Vec<Finding>,
}

impl AuditReport {
    fn new(total: usize) -> Self {
        Self {
            total,
            generated_at: Utc::now(),
            missing_fields: Vec::new(),
            invalid_dois: Vec::new(),
            malformed_dates: Vec::new(),
            empty_titles: Vec::new(),
            missing_authors: Vec::new(),
        }
    }

    pub fn summary(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            ("missing_fields", self.missing_fields.len()),
            ("invalid_dois", self.invalid_dois.len()),
            ("malformed_dates", self.malformed_dates.len()),
            ("empty_titles", self.empty_titles.len()),
            ("missing_authors", self.missing_authors.len()),
        ])
    }

    pub fn total_issues(&self) -> usize {
        self.summary().values().sum()
    }
}

/// Outcome of one normalization batch; mirrors the enrichment dry-run/apply
/// contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeStats {
    pub total: usize,
    pub changed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub changes: Vec<Finding>,
    pub dry_run: bool,
}

/// Library quality control: audits are read-only, the normalization passes
/// write through the shared apply-or-preview wrapper.
pub struct QualityAuditor {
    gateway: Arc<dyn LibraryGateway>,
    config: ReconcileConfig,
    probe: RateLimitedClient,
}

impl QualityAuditor {
    pub fn new(gateway: Arc<dyn LibraryGateway>, config: ReconcileConfig) -> Self {
        // Liveness probes get a short leash and no retries.
        let probe = RateLimitedClient::new(
            Duration::ZERO,
            0,
            Duration::from_secs(10),
            "zotkeeper/0.1",
        );
        Self {
            gateway,
            config,
            probe,
        }
    }

    /// Classify records into finding categories. No network, no writes.
    pub fn audit(&self, records: &[Record]) -> AuditReport {
        let regular: Vec<&Record> = records
            .iter()
            .filter(|record| record.item_type.is_regular())
            .collect();
        let mut report = AuditReport::new(regular.len());

        for record in regular {
            let missing = missing_required_fields(record);
            if !missing.is_empty() {
                report
                    .missing_fields
                    .push(Finding::new(&record.key, format!("missing {}", missing.join(", "))));
            }

            let doi = record.doi.trim();
            if !doi.is_empty() && !Doi::is_wellformed(doi) {
                report
                    .invalid_dois
                    .push(Finding::new(&record.key, format!("malformed DOI '{doi}'")));
            }

            if record.field_is_empty(Field::Title) {
                report.empty_titles.push(Finding::new(
                    &record.key,
                    format!("{} without a title", record.item_type),
                ));
            }

            if record.creators.is_empty()
                && matches!(
                    record.item_type,
                    ItemType::JournalArticle | ItemType::ConferencePaper | ItemType::Preprint
                )
            {
                report
                    .missing_authors
                    .push(Finding::new(&record.key, "no creators listed"));
            }

            let date = record.date.trim();
            if !date.is_empty() && !is_plausible_date(date) {
                report
                    .malformed_dates
                    .push(Finding::new(&record.key, format!("unrecognized date '{date}'")));
            }
        }

        report
    }

    /// HEAD-probe every record URL; unreachable or erroring URLs become
    /// findings. Failures never abort the scan.
    pub async fn check_urls(&self, records: &[Record]) -> Vec<Finding> {
        let mut findings = Vec::new();
        for record in records {
            let url = record.url.trim();
            if url.is_empty() {
                continue;
            }

            if reqwest::Url::parse(url).is_err() {
                findings.push(Finding::new(&record.key, format!("invalid URL '{url}'")));
                continue;
            }

            match self.probe.head_status(url).await {
                Ok(status) if status < 400 => {}
                Ok(status) => {
                    findings.push(Finding::new(&record.key, format!("URL returned HTTP {status}")));
                }
                Err(err) => {
                    findings.push(Finding::new(&record.key, format!("URL unreachable: {err}")));
                }
            }
        }
        findings
    }

    /// Check that well-formed DOIs actually resolve at doi.org.
    pub async fn check_doi_resolution(&self, records: &[Record]) -> Vec<Finding> {
        let mut findings = Vec::new();
        for record in records {
            let Ok(doi) = Doi::parse(&record.doi) else {
                continue;
            };

            match self.probe.head_status(&doi.url).await {
                Ok(status) if status < 400 => {}
                Ok(status) => findings.push(Finding::new(
                    &record.key,
                    format!("DOI {} does not resolve (HTTP {status})", doi.normalized),
                )),
                Err(err) => findings.push(Finding::new(
                    &record.key,
                    format!("DOI {} unreachable: {err}", doi.normalized),
                )),
            }
        }
        findings
    }

    /// Title-case creator names. Computes the new creator list, diffs it
    /// against the old, and writes only when they differ and this is not a
    /// dry run.
    pub async fn normalize_author_names(
        &self,
        records: &[Record],
        dry_run: bool,
    ) -> Result<NormalizeStats> {
        let mut stats = NormalizeStats {
            total: records.len(),
            dry_run,
            ..Default::default()
        };

        for record in records {
            if record.creators.is_empty() {
                stats.skipped += 1;
                continue;
            }

            let normalized: Vec<_> = record.creators.iter().map(normalize_creator).collect();
            if normalized == record.creators {
                stats.skipped += 1;
                continue;
            }

            let patch = RecordPatch {
                creators: Some(normalized),
                ..Default::default()
            };
            match commit_patch(self.gateway.as_ref(), record, &patch, dry_run).await {
                Ok(_) => {
                    stats.changed += 1;
                    stats
                        .changes
                        .push(Finding::new(&record.key, "creator names title-cased"));
                }
                Err(err) => {
                    tracing::warn!(key = %record.key, "author normalization write failed: {err}");
                    stats.errors += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Reformat dates into the configured canonical layout.
    pub async fn fix_dates(
        &self,
        records: &[Record],
        target: Option<DateFormat>,
        dry_run: bool,
    ) -> Result<NormalizeStats> {
        let target = target.unwrap_or(self.config.target_date_format);
        let mut stats = NormalizeStats {
            total: records.len(),
            dry_run,
            ..Default::default()
        };

        for record in records {
            let date = record.date.trim();
            if date.is_empty() {
                stats.skipped += 1;
                continue;
            }

            let Some(normalized) = normalize_date(date, target) else {
                stats.skipped += 1;
                continue;
            };
            if normalized == date {
                stats.skipped += 1;
                continue;
            }

            let mut patch = RecordPatch::default();
            patch.set_field(Field::Date, normalized.clone());
            match commit_patch(self.gateway.as_ref(), record, &patch, dry_run).await {
                Ok(_) => {
                    stats.changed += 1;
                    stats.changes.push(Finding::new(
                        &record.key,
                        format!("date '{date}' -> '{normalized}'"),
                    ));
                }
                Err(err) => {
                    tracing::warn!(key = %record.key, "date normalization write failed: {err}");
                    stats.errors += 1;
                }
            }
        }

        Ok(stats)
    }
}

/// Required fields depend on the item type; creators are checked separately.
fn missing_required_fields(record: &Record) -> Vec<&'static str> {
    let required: &[Field] = match record.item_type {
        ItemType::JournalArticle | ItemType::ConferencePaper => {
            &[Field::Title, Field::Date, Field::PublicationTitle]
        }
        ItemType::Preprint => &[Field::Title, Field::Date],
        ItemType::Book | ItemType::BookSection => &[Field::Title, Field::Date],
        _ => &[Field::Title],
    };

    required
        .iter()
        .filter(|field| record.field_is_empty(**field))
        .map(|field| field.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use zotkeeper_core::{Creator, CreatorType, MemoryGateway};

    fn article(key: &str) -> Record {
        let mut record = Record::new(key, ItemType::JournalArticle);
        record.title = "A title".to_string();
        record.date = "2020".to_string();
        record.publication_title = "A journal".to_string();
        record.creators = vec![Creator::person(CreatorType::Author, "Ada", "Lovelace")];
        record.version = 1;
        record
    }

    async fn auditor_with(records: &[Record]) -> (QualityAuditor, Arc<MemoryGateway>) {
        let gateway = Arc::new(MemoryGateway::seed(records.to_vec()).await);
        let auditor = QualityAuditor::new(gateway.clone(), ReconcileConfig::default());
        (auditor, gateway)
    }

    #[tokio::test]
    async fn audit_classifies_each_defect_once() {
        let clean = article("KEY1");

        let mut bad_doi = article("KEY2");
        bad_doi.doi = "not-a-doi".to_string();

        let mut gappy = article("KEY3");
        gappy.date.clear();
        gappy.publication_title.clear();
        gappy.creators.clear();

        let mut bad_date = article("KEY4");
        bad_date.date = "sometime in spring".to_string();

        let mut note = Record::new("KEY5", ItemType::Note);
        note.version = 1;

        let records = vec![clean, bad_doi, gappy, bad_date, note];
        let (auditor, _gateway) = auditor_with(&records).await;

        let report = auditor.audit(&records);

        assert_eq!(report.total, 4); // the note is not a regular item
        assert_eq!(report.invalid_dois.len(), 1);
        assert_eq!(report.invalid_dois[0].key.as_str(), "KEY2");
        assert_eq!(report.missing_fields.len(), 1);
        assert!(report.missing_fields[0].reason.contains("date"));
        assert!(report.missing_fields[0].reason.contains("publicationTitle"));
        assert_eq!(report.missing_authors.len(), 1);
        assert_eq!(report.malformed_dates.len(), 1);
        assert!(report.empty_titles.is_empty());
        assert_eq!(report.total_issues(), 4);
    }

    #[tokio::test]
    async fn audit_is_read_only() {
        let records = vec![article("KEY1")];
        let (auditor, gateway) = auditor_with(&records).await;

        auditor.audit(&records);
        assert_eq!(gateway.write_calls(), 0);
    }

    #[tokio::test]
    async fn url_probe_flags_broken_and_invalid_urls() {
        let mut server = Server::new_async().await;
        let _ok = server
            .mock("HEAD", "/alive")
            .with_status(200)
            .create_async()
            .await;
        let _gone = server
            .mock("HEAD", "/gone")
            .with_status(404)
            .create_async()
            .await;

        let mut alive = article("KEY1");
        alive.url = format!("{}/alive", server.url());
        let mut gone = article("KEY2");
        gone.url = format!("{}/gone", server.url());
        let mut garbage = article("KEY3");
        garbage.url = "not a url at all".to_string();
        let unset = article("KEY4");

        let records = vec![alive, gone, garbage, unset];
        let (auditor, _gateway) = auditor_with(&records).await;

        let findings = auditor.check_urls(&records).await;
        let keys: Vec<&str> = findings.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["KEY2", "KEY3"]);
    }

    #[tokio::test]
    async fn author_normalization_respects_dry_run() {
        let mut shouty = article("KEY1");
        shouty.creators = vec![Creator::person(CreatorType::Author, "ADA", "LOVELACE")];
        let records = vec![shouty];
        let (auditor, gateway) = auditor_with(&records).await;

        let preview = auditor
            .normalize_author_names(&records, true)
            .await
            .expect("preview");
        assert_eq!(preview.changed, 1);
        assert!(preview.dry_run);
        assert_eq!(gateway.write_calls(), 0);

        let applied = auditor
            .normalize_author_names(&records, false)
            .await
            .expect("apply");
        assert_eq!(applied.changed, 1);
        assert_eq!(gateway.update_calls(), 1);

        let stored = gateway.get(&"KEY1".into()).await.expect("updated");
        assert_eq!(stored.creators[0].first_name.as_deref(), Some("Ada"));
        assert_eq!(stored.creators[0].last_name.as_deref(), Some("Lovelace"));
    }

    #[tokio::test]
    async fn already_normalized_authors_are_skipped() {
        let records = vec![article("KEY1")];
        let (auditor, gateway) = auditor_with(&records).await;

        let stats = auditor
            .normalize_author_names(&records, false)
            .await
            .expect("apply");
        assert_eq!(stats.changed, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(gateway.write_calls(), 0);
    }

    #[tokio::test]
    async fn date_fixing_writes_only_real_changes() {
        let mut textual = article("KEY1");
        textual.date = "January 15, 2023".to_string();
        let canonical = article("KEY2"); // "2020" is already canonical for YYYY
        let records = vec![textual, canonical];
        let (auditor, gateway) = auditor_with(&records).await;

        let stats = auditor
            .fix_dates(&records, Some(DateFormat::YearMonthDay), false)
            .await
            .expect("apply");

        assert_eq!(stats.changed, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(gateway.update_calls(), 1);

        let stored = gateway.get(&"KEY1".into()).await.expect("updated");
        assert_eq!(stored.date, "2023-01-15");
    }
}
