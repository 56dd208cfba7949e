use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::field::Field;
use crate::models::record::{Creator, Record};

/// Computed change set for one record.
///
/// A patch never carries the record version; the version observed at read
/// time is supplied when the patch is committed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default)]
    pub fields: BTreeMap<Field, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creators: Option<Vec<Creator>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.creators.is_none() && self.tags.is_none()
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    pub fn apply_to(&self, record: &mut Record) {
        for (field, value) in &self.fields {
            field.set(record, value.clone());
        }
        if let Some(creators) = &self.creators {
            record.creators = creators.clone();
        }
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{CreatorType, ItemType};

    #[test]
    fn empty_patch_changes_nothing() {
        let mut record = Record::new("K1", ItemType::JournalArticle);
        record.title = "Original".to_string();
        let before = record.clone();

        RecordPatch::default().apply_to(&mut record);

        assert!(RecordPatch::default().is_empty());
        assert_eq!(record.title, before.title);
        assert_eq!(record.version, before.version);
    }

    #[test]
    fn apply_sets_fields_creators_and_tags() {
        let mut record = Record::new("K1", ItemType::JournalArticle);
        record.tags.insert("old".to_string());

        let mut patch = RecordPatch::default();
        patch.set_field(Field::Volume, "42");
        patch.creators = Some(vec![Creator::person(CreatorType::Author, "Grace", "Hopper")]);
        patch.tags = Some(BTreeSet::from(["old".to_string(), "new".to_string()]));

        patch.apply_to(&mut record);

        assert_eq!(record.volume, "42");
        assert_eq!(record.creators.len(), 1);
        assert!(record.tags.contains("new"));
    }
}
