use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::error::{ReconError, Result};
use crate::http::{RateLimitedClient, ResponseCache};
use crate::identifiers::Doi;
use crate::sources::{MetadataSource, RawMetadata};

const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";
const SOURCE_NAME: &str = "Semantic Scholar";
const LOOKUP_FIELDS: &str = "paperId,externalIds,title,abstract,venue,year,publicationDate,citationCount";
const SEARCH_FIELDS: &str = "paperId,externalIds,title,venue,year,citationCount";
const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Semantic Scholar graph API. The free tier mandates at least one second
/// between requests; the interval is enforced per client instance.
pub struct SemanticScholarSource {
    client: RateLimitedClient,
    cache: ResponseCache,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarSource {
    pub fn new(api_key: Option<&str>) -> Self {
        Self::with_params(BASE_URL, Duration::from_secs(1), 3, api_key)
    }

    pub fn from_config(config: &zotkeeper_core::ReconcileConfig) -> Self {
        Self::with_params(
            BASE_URL,
            Duration::from_secs(1),
            config.max_retries,
            config.semantic_scholar_api_key.as_deref(),
        )
    }

    pub fn with_params(
        base_url: &str,
        min_interval: Duration,
        max_retries: u32,
        api_key: Option<&str>,
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
            api_key: api_key.map(ToOwned::to_owned),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key
            && let Ok(value) = HeaderValue::from_str(key)
        {
            headers.insert(API_KEY_HEADER, value);
        }
        headers
    }
}

#[async_trait]
impl MetadataSource for SemanticScholarSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn lookup_doi(&self, doi: &Doi) -> Result<Option<RawMetadata>> {
        let key = format!("doi:{}", doi.normalized);
        if let Some(cached) = self.cache.get::<RawMetadata>(&key).await {
            return Ok(Some(cached));
        }

        let url = format!(
            "{}/paper/DOI:{}?fields={}",
            self.base_url, doi.normalized, LOOKUP_FIELDS
        );
        let val: Value = match self.client.get_json_with_headers(&url, self.headers()).await {
            Ok(val) => val,
            Err(ReconError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };

        let paper = paper_from_json(&val);
        self.cache.set(&key, &paper).await;
        Ok(Some(paper))
    }

    async fn search(&self, query: &str) -> Result<Vec<RawMetadata>> {
        let url = format!(
            "{}/paper/search?query={}&limit=10&fields={}",
            self.base_url,
            urlencoding::encode(query),
            SEARCH_FIELDS
        );
        let val: Value = self.client.get_json_with_headers(&url, self.headers()).await?;

        let results = val["data"]
            .as_array()
            .map(|papers| papers.iter().map(paper_from_json).collect())
            .unwrap_or_default();
        Ok(results)
    }
}

fn paper_from_json(v: &Value) -> RawMetadata {
    let mut paper = RawMetadata::new(SOURCE_NAME);

    paper.native_id = v["paperId"].as_str().map(ToOwned::to_owned);
    paper.doi = v["externalIds"]["DOI"].as_str().map(ToOwned::to_owned);
    paper.title = v["title"].as_str().map(ToOwned::to_owned);
    paper.abstract_text = v["abstract"].as_str().map(ToOwned::to_owned);
    paper.venue = v["venue"]
        .as_str()
        .filter(|venue| !venue.is_empty())
        .map(ToOwned::to_owned);
    paper.date = v["publicationDate"]
        .as_str()
        .map(ToOwned::to_owned)
        .or_else(|| v["year"].as_i64().map(|year| year.to_string()));
    paper.citation_count = v["citationCount"].as_u64();

    paper
}
