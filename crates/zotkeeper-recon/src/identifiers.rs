use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use zotkeeper_core::Record;

use crate::error::{ReconError, Result};

static DOI_WELLFORMED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^10\.\d{4,}/\S+$").expect("valid regex"));
static DOI_IN_EXTRA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)DOI:\s*(\S+)").expect("valid regex"));
static DOI_IN_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"doi\.org/(\S+)$").expect("valid regex"));

/// A parsed Digital Object Identifier, the primary cross-source join key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doi {
    pub raw: String,
    pub normalized: String,
    pub url: String,
}

impl Doi {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        // Strip known prefixes to get the raw DOI
        let stripped = if let Some(s) = input.strip_prefix("https://doi.org/") {
            s
        } else if let Some(s) = input.strip_prefix("http://doi.org/") {
            s
        } else if let Some(s) = input.strip_prefix("https://dx.doi.org/") {
            s
        } else if let Some(s) = input.strip_prefix("http://dx.doi.org/") {
            s
        } else if let Some(s) = input.strip_prefix("doi:") {
            s.trim_start()
        } else if let Some(s) = input.strip_prefix("DOI:") {
            s.trim_start()
        } else {
            input
        };

        // Must start with "10.", contain "/", and have a non-empty suffix
        if !stripped.starts_with("10.") {
            return Err(ReconError::InvalidDoi(input.to_string()));
        }
        let slash_pos = stripped
            .find('/')
            .ok_or_else(|| ReconError::InvalidDoi(input.to_string()))?;
        if stripped[slash_pos + 1..].is_empty() {
            return Err(ReconError::InvalidDoi(input.to_string()));
        }

        let normalized = stripped.to_lowercase();
        let url = format!("https://doi.org/{normalized}");

        Ok(Self {
            raw: input.to_string(),
            normalized,
            url,
        })
    }

    /// Strict registry shape: `10.` + at least four digits + `/` + suffix.
    /// Looser than `parse` rejects, stricter than it accepts; used by the
    /// quality audit.
    pub fn is_wellformed(input: &str) -> bool {
        let cleaned = input
            .trim()
            .trim_start_matches("https://doi.org/")
            .trim_start_matches("http://doi.org/");
        DOI_WELLFORMED_RE.is_match(cleaned)
    }
}

/// Probe a record for a usable DOI: the DOI field itself, a `DOI: …` line
/// in the extra field, then a doi.org URL.
pub fn doi_from_record(record: &Record) -> Option<Doi> {
    let direct = record.doi.trim();
    if !direct.is_empty()
        && let Ok(doi) = Doi::parse(direct)
    {
        return Some(doi);
    }

    if let Some(captures) = DOI_IN_EXTRA_RE.captures(&record.extra)
        && let Ok(doi) = Doi::parse(&captures[1])
    {
        return Some(doi);
    }

    if record.url.contains("doi.org")
        && let Some(captures) = DOI_IN_URL_RE.captures(record.url.trim())
        && let Ok(doi) = Doi::parse(&captures[1])
    {
        return Some(doi);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use zotkeeper_core::ItemType;

    #[test]
    fn bare_doi() {
        let doi = Doi::parse("10.1000/xyz123").unwrap();
        assert_eq!(doi.normalized, "10.1000/xyz123");
        assert_eq!(doi.url, "https://doi.org/10.1000/xyz123");
    }

    #[test]
    fn prefixed_forms_normalize_identically() {
        for raw in [
            "https://doi.org/10.1000/XYZ123",
            "http://dx.doi.org/10.1000/xyz123",
            "doi:10.1000/xyz123",
            "DOI: 10.1000/xyz123",
        ] {
            assert_eq!(Doi::parse(raw).unwrap().normalized, "10.1000/xyz123");
        }
    }

    #[test]
    fn reject_malformed_input() {
        assert!(Doi::parse("not-a-doi").is_err());
        assert!(Doi::parse("10.1000").is_err());
        assert!(Doi::parse("10.1000/").is_err());
        assert!(Doi::parse("").is_err());
    }

    #[test]
    fn wellformed_requires_four_digit_prefix() {
        assert!(Doi::is_wellformed("10.1234/test"));
        assert!(Doi::is_wellformed("10.1234/test.v1"));
        assert!(!Doi::is_wellformed("invalid"));
        assert!(!Doi::is_wellformed("10.12/x"));
        assert!(!Doi::is_wellformed("10.1234/"));
    }

    #[test]
    fn record_probe_checks_field_extra_then_url() {
        let mut record = Record::new("K1", ItemType::JournalArticle);
        record.doi = "10.1234/direct".to_string();
        assert_eq!(
            doi_from_record(&record).unwrap().normalized,
            "10.1234/direct"
        );

        let mut record = Record::new("K2", ItemType::JournalArticle);
        record.extra = "Citation Count: 5\nDOI: 10.5678/hidden".to_string();
        assert_eq!(
            doi_from_record(&record).unwrap().normalized,
            "10.5678/hidden"
        );

        let mut record = Record::new("K3", ItemType::JournalArticle);
        record.url = "https://doi.org/10.9999/fromurl".to_string();
        assert_eq!(
            doi_from_record(&record).unwrap().normalized,
            "10.9999/fromurl"
        );

        let record = Record::new("K4", ItemType::JournalArticle);
        assert!(doi_from_record(&record).is_none());
    }
}
