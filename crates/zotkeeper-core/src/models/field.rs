use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::record::Record;

/// The scalar record fields the engine reads and patches by name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    #[serde(rename = "DOI")]
    Doi,
    Date,
    AbstractNote,
    PublicationTitle,
    Volume,
    Issue,
    Pages,
    #[serde(rename = "ISSN")]
    Issn,
    Url,
    Extra,
}

impl Field {
    pub const ALL: &'static [Field] = &[
        Field::Title,
        Field::Doi,
        Field::Date,
        Field::AbstractNote,
        Field::PublicationTitle,
        Field::Volume,
        Field::Issue,
        Field::Pages,
        Field::Issn,
        Field::Url,
        Field::Extra,
    ];

    /// Fields weighted double by the completeness score.
    pub const IMPORTANT: &'static [Field] = &[
        Field::Doi,
        Field::AbstractNote,
        Field::Date,
        Field::PublicationTitle,
        Field::Volume,
        Field::Issue,
        Field::Pages,
        Field::Issn,
        Field::Url,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Doi => "DOI",
            Field::Date => "date",
            Field::AbstractNote => "abstractNote",
            Field::PublicationTitle => "publicationTitle",
            Field::Volume => "volume",
            Field::Issue => "issue",
            Field::Pages => "pages",
            Field::Issn => "ISSN",
            Field::Url => "url",
            Field::Extra => "extra",
        }
    }

    pub fn get<'a>(&self, record: &'a Record) -> &'a str {
        match self {
            Field::Title => &record.title,
            Field::Doi => &record.doi,
            Field::Date => &record.date,
            Field::AbstractNote => &record.abstract_note,
            Field::PublicationTitle => &record.publication_title,
            Field::Volume => &record.volume,
            Field::Issue => &record.issue,
            Field::Pages => &record.pages,
            Field::Issn => &record.issn,
            Field::Url => &record.url,
            Field::Extra => &record.extra,
        }
    }

    pub fn set(&self, record: &mut Record, value: impl Into<String>) {
        let value = value.into();
        match self {
            Field::Title => record.title = value,
            Field::Doi => record.doi = value,
            Field::Date => record.date = value,
            Field::AbstractNote => record.abstract_note = value,
            Field::PublicationTitle => record.publication_title = value,
            Field::Volume => record.volume = value,
            Field::Issue => record.issue = value,
            Field::Pages => record.pages = value,
            Field::Issn => record.issn = value,
            Field::Url => record.url = value,
            Field::Extra => record.extra = value,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One proposed field update with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: String,
    pub new: String,
    pub source: String,
}
