use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use zotkeeper_core::Field;

use crate::error::Result;
use crate::identifiers::Doi;

pub mod crossref;
pub mod openalex;
pub mod semantic_scholar;

pub use crossref::CrossRefSource;
pub use openalex::OpenAlexSource;
pub use semantic_scholar::SemanticScholarSource;

/// One external metadata service: look up a work by DOI, search by free
/// text. Implementations own their rate limiting and schema translation.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means the identifier has no match at this source; the
    /// caller falls through to the next one.
    async fn lookup_doi(&self, doi: &Doi) -> Result<Option<RawMetadata>>;

    /// Eagerly collected; a fresh call re-queries the service.
    async fn search(&self, query: &str) -> Result<Vec<RawMetadata>>;
}

/// The shared shape every source response is normalized into before it
/// reaches the enrichment pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetadata {
    pub source: String,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub date: Option<String>,
    pub venue: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub issn: Option<String>,
    pub url: Option<String>,
    pub doi: Option<String>,
    pub citation_count: Option<u64>,
    /// The source's own identifier for the work (OpenAlex ID, S2 paper id).
    pub native_id: Option<String>,
}

impl RawMetadata {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }

    /// The value this response offers for one record field, if any.
    pub fn field_value(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Title => self.title.as_deref(),
            Field::Doi => self.doi.as_deref(),
            Field::Date => self.date.as_deref(),
            Field::AbstractNote => self.abstract_text.as_deref(),
            Field::PublicationTitle => self.venue.as_deref(),
            Field::Volume => self.volume.as_deref(),
            Field::Issue => self.issue.as_deref(),
            Field::Pages => self.pages.as_deref(),
            Field::Issn => self.issn.as_deref(),
            Field::Url => self.url.as_deref(),
            Field::Extra => None,
        };
        value.map(str::trim).filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL
            .iter()
            .all(|field| self.field_value(*field).is_none())
            && self.citation_count.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_values_skip_blank_strings() {
        let mut metadata = RawMetadata::new("Test");
        assert!(metadata.is_empty());

        metadata.volume = Some("  ".to_string());
        assert!(metadata.field_value(Field::Volume).is_none());

        metadata.volume = Some("12".to_string());
        assert_eq!(metadata.field_value(Field::Volume), Some("12"));
        assert!(!metadata.is_empty());
    }
}
