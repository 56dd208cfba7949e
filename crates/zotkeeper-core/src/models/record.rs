use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::field::Field;

/// Library-assigned stable item key.
///
/// Keys sort lexicographically; that ordering is the deterministic tie-break
/// used by duplicate grouping and merge planning.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Item type in the library's camelCase vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemType {
    JournalArticle,
    ConferencePaper,
    Preprint,
    Book,
    BookSection,
    Report,
    Thesis,
    Webpage,
    Note,
    Attachment,
    Other(String),
}

impl ItemType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::JournalArticle => "journalArticle",
            Self::ConferencePaper => "conferencePaper",
            Self::Preprint => "preprint",
            Self::Book => "book",
            Self::BookSection => "bookSection",
            Self::Report => "report",
            Self::Thesis => "thesis",
            Self::Webpage => "webpage",
            Self::Note => "note",
            Self::Attachment => "attachment",
            Self::Other(raw) => raw,
        }
    }

    /// Notes and attachments are child items, not bibliographic records.
    pub fn is_regular(&self) -> bool {
        !matches!(self, Self::Note | Self::Attachment)
    }
}

impl Default for ItemType {
    fn default() -> Self {
        Self::JournalArticle
    }
}

impl From<String> for ItemType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "journalArticle" => Self::JournalArticle,
            "conferencePaper" => Self::ConferencePaper,
            "preprint" => Self::Preprint,
            "book" => Self::Book,
            "bookSection" => Self::BookSection,
            "report" => Self::Report,
            "thesis" => Self::Thesis,
            "webpage" => Self::Webpage,
            "note" => Self::Note,
            "attachment" => Self::Attachment,
            _ => Self::Other(value),
        }
    }
}

impl From<ItemType> for String {
    fn from(value: ItemType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CreatorType {
    Author,
    Editor,
    Contributor,
    Translator,
    Other(String),
}

impl CreatorType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Author => "author",
            Self::Editor => "editor",
            Self::Contributor => "contributor",
            Self::Translator => "translator",
            Self::Other(raw) => raw,
        }
    }
}

impl Default for CreatorType {
    fn default() -> Self {
        Self::Author
    }
}

impl From<String> for CreatorType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "author" => Self::Author,
            "editor" => Self::Editor,
            "contributor" => Self::Contributor,
            "translator" => Self::Translator,
            _ => Self::Other(value),
        }
    }
}

impl From<CreatorType> for String {
    fn from(value: CreatorType) -> Self {
        value.as_str().to_string()
    }
}

/// One entry of a record's ordered creator list.
///
/// Personal names use `first_name`/`last_name`; institutional creators use
/// the single `name` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    #[serde(default)]
    pub creator_type: CreatorType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Creator {
    pub fn person(
        creator_type: CreatorType,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            creator_type,
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            name: None,
        }
    }
}

/// Read-only snapshot of one library item.
///
/// Scalar fields use the library convention of empty string for "missing".
/// `version` is assigned by the library and must accompany every write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub key: RecordKey,

    #[serde(default)]
    pub version: u64,

    pub item_type: ItemType,

    #[serde(default)]
    pub creators: Vec<Creator>,

    #[serde(default)]
    pub title: String,

    #[serde(default, rename = "DOI")]
    pub doi: String,

    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub abstract_note: String,

    #[serde(default)]
    pub publication_title: String,

    #[serde(default)]
    pub volume: String,

    #[serde(default)]
    pub issue: String,

    #[serde(default)]
    pub pages: String,

    #[serde(default, rename = "ISSN")]
    pub issn: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub extra: String,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default)]
    pub collections: BTreeSet<String>,
}

impl Record {
    pub fn new(key: impl Into<RecordKey>, item_type: ItemType) -> Self {
        Self {
            key: key.into(),
            item_type,
            ..Default::default()
        }
    }

    pub fn field_is_empty(&self, field: Field) -> bool {
        field.get(self).trim().is_empty()
    }

    /// Metadata completeness used to rank duplicates: important scalar
    /// fields count double, creators and tags count individually.
    pub fn completeness_score(&self) -> usize {
        let mut score = 0usize;

        for field in Field::IMPORTANT {
            if !self.field_is_empty(*field) {
                score += 2;
            }
        }

        score += self.creators.len();
        score += self.tags.len();
        if !self.extra.trim().is_empty() {
            score += 1;
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_type_round_trips_through_strings() {
        let t: ItemType = "journalArticle".to_string().into();
        assert_eq!(t, ItemType::JournalArticle);
        assert_eq!(t.as_str(), "journalArticle");

        let unknown: ItemType = "artwork".to_string().into();
        assert_eq!(unknown, ItemType::Other("artwork".to_string()));
        assert_eq!(unknown.as_str(), "artwork");
    }

    #[test]
    fn record_deserializes_library_payload() {
        let json = r#"{
            "key": "ABCD2345",
            "version": 12,
            "itemType": "journalArticle",
            "title": "Deep learning",
            "DOI": "10.1038/nature14539",
            "creators": [
                {"creatorType": "author", "firstName": "Yann", "lastName": "LeCun"}
            ],
            "tags": ["ml"]
        }"#;
        let record: Record = serde_json::from_str(json).expect("valid record json");

        assert_eq!(record.key.as_str(), "ABCD2345");
        assert_eq!(record.version, 12);
        assert_eq!(record.doi, "10.1038/nature14539");
        assert_eq!(record.creators[0].last_name.as_deref(), Some("LeCun"));
        assert!(record.tags.contains("ml"));
        assert!(record.abstract_note.is_empty());
    }

    #[test]
    fn completeness_prefers_richer_records() {
        let sparse = Record::new("K1", ItemType::JournalArticle);

        let mut rich = Record::new("K2", ItemType::JournalArticle);
        rich.doi = "10.1000/x".to_string();
        rich.date = "2021".to_string();
        rich.creators
            .push(Creator::person(CreatorType::Author, "Ada", "Lovelace"));
        rich.tags.insert("computing".to_string());

        assert!(rich.completeness_score() > sparse.completeness_score());
    }

    #[test]
    fn empty_title_is_an_empty_field() {
        let mut record = Record::new("K1", ItemType::Book);
        record.title = "   ".to_string();
        assert!(record.field_is_empty(Field::Title));
        record.title = "Real title".to_string();
        assert!(!record.field_is_empty(Field::Title));
    }
}
