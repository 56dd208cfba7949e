use serde::{Deserialize, Serialize};

use crate::models::Field;

/// Canonical date layouts writes may target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    #[serde(rename = "YYYY")]
    Year,
    #[serde(rename = "YYYY-MM")]
    YearMonth,
    #[default]
    #[serde(rename = "YYYY-MM-DD")]
    YearMonthDay,
}

/// Engine configuration, deserializable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Composite-score cutoff for duplicate grouping, in (0, 1].
    pub similarity_threshold: f64,
    /// Fields a complete record must carry; drives incompleteness scans.
    pub required_fields: Vec<Field>,
    pub target_date_format: DateFormat,
    /// Forwarded to polite-pool-aware sources.
    pub contact_email: Option<String>,
    pub semantic_scholar_api_key: Option<String>,
    /// Destructive operations preview by default.
    pub dry_run: bool,
    /// Retry cap for transient source failures.
    pub max_retries: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            required_fields: vec![Field::Doi, Field::AbstractNote, Field::Date],
            target_date_format: DateFormat::default(),
            contact_email: None,
            semantic_scholar_api_key: None,
            dry_run: true,
            max_retries: 3,
        }
    }
}

impl ReconcileConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
