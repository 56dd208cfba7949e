use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ReconError, Result};
use crate::http::{RateLimitedClient, ResponseCache};
use crate::identifiers::Doi;
use crate::sources::{MetadataSource, RawMetadata};

const BASE_URL: &str = "https://api.openalex.org";
const SOURCE_NAME: &str = "OpenAlex";

/// OpenAlex works API. The contact email travels as a `mailto` query
/// parameter rather than in the User-Agent.
pub struct OpenAlexSource {
    client: RateLimitedClient,
    cache: ResponseCache,
    base_url: String,
    contact_email: Option<String>,
}

impl OpenAlexSource {
    pub fn new(contact_email: Option<&str>) -> Self {
        Self::with_params(BASE_URL, Duration::from_millis(100), 3, contact_email)
    }

    pub fn from_config(config: &zotkeeper_core::ReconcileConfig) -> Self {
        Self::with_params(
            BASE_URL,
            Duration::from_millis(100),
            config.max_retries,
            config.contact_email.as_deref(),
        )
    }

    pub fn with_params(
        base_url: &str,
        min_interval: Duration,
        max_retries: u32,
        contact_email: Option<&str>,
    ) -> Self {
        Self {
            client: RateLimitedClient::new(
                min_interval,
                max_retries,
                Duration::from_secs(30),
                "zotkeeper/0.1",
            ),
            cache: ResponseCache::new(),
            base_url: base_url.to_string(),
            contact_email: contact_email.map(ToOwned::to_owned),
        }
    }

    fn mailto_suffix(&self, separator: char) -> String {
        match &self.contact_email {
            Some(email) => format!("{separator}mailto={}", urlencoding::encode(email)),
            None => String::new(),
        }
    }
}

#[async_trait]
impl MetadataSource for OpenAlexSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn lookup_doi(&self, doi: &Doi) -> Result<Option<RawMetadata>> {
        let key = format!("doi:{}", doi.normalized);
        if let Some(cached) = self.cache.get::<RawMetadata>(&key).await {
            return Ok(Some(cached));
        }

        let url = format!(
            "{}/works/doi:{}{}",
            self.base_url,
            doi.normalized,
            self.mailto_suffix('?')
        );
        let val: Value = match self.client.get_json(&url).await {
            Ok(val) => val,
            Err(ReconError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };

        let work = work_from_json(&val);
        self.cache.set(&key, &work).await;
        Ok(Some(work))
    }

    async fn search(&self, query: &str) -> Result<Vec<RawMetadata>> {
        let url = format!(
            "{}/works?search={}&per-page=10{}",
            self.base_url,
            urlencoding::encode(query),
            self.mailto_suffix('&')
        );
        let val: Value = self.client.get_json(&url).await?;

        let results = val["results"]
            .as_array()
            .map(|items| items.iter().map(work_from_json).collect())
            .unwrap_or_default();
        Ok(results)
    }
}

fn work_from_json(v: &Value) -> RawMetadata {
    let mut work = RawMetadata::new(SOURCE_NAME);

    work.native_id = v["id"].as_str().map(ToOwned::to_owned);
    work.doi = v["doi"]
        .as_str()
        .and_then(|raw| Doi::parse(raw).ok())
        .map(|doi| doi.normalized);
    work.title = v["title"]
        .as_str()
        .or_else(|| v["display_name"].as_str())
        .map(ToOwned::to_owned);
    work.date = v["publication_date"].as_str().map(ToOwned::to_owned);
    work.abstract_text = reconstruct_abstract(&v["abstract_inverted_index"]);

    let location_source = &v["primary_location"]["source"];
    work.venue = location_source["display_name"].as_str().map(ToOwned::to_owned);
    work.issn = location_source["issn"][0]
        .as_str()
        .or_else(|| location_source["issn_l"].as_str())
        .map(ToOwned::to_owned);

    let biblio = &v["biblio"];
    work.volume = biblio["volume"].as_str().map(ToOwned::to_owned);
    work.issue = biblio["issue"].as_str().map(ToOwned::to_owned);
    work.pages = match (biblio["first_page"].as_str(), biblio["last_page"].as_str()) {
        (Some(first), Some(last)) => Some(format!("{first}-{last}")),
        (Some(first), None) => Some(first.to_string()),
        _ => None,
    };

    work.citation_count = v["cited_by_count"].as_u64();

    work
}

/// OpenAlex stores abstracts as a word -> positions inverted index; rebuild
/// the running text by slotting each word back into place.
fn reconstruct_abstract(index: &Value) -> Option<String> {
    let index: HashMap<String, Vec<usize>> = serde_json::from_value(index.clone()).ok()?;
    let max_position = index.values().flatten().max().copied()?;

    let mut slots = vec![""; max_position + 1];
    for (word, positions) in &index {
        for &position in positions {
            if position < slots.len() {
                slots[position] = word;
            }
        }
    }

    let text = slots
        .into_iter()
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!text.is_empty()).then_some(text)
}
