use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ReconError, Result};
use crate::http::{RateLimitedClient, ResponseCache};
use crate::identifiers::Doi;
use crate::sources::{MetadataSource, RawMetadata};

const BASE_URL: &str = "https://api.crossref.org";
const SOURCE_NAME: &str = "CrossRef";

/// CrossRef works API. No mandated minimum interval; a contact email in the
/// User-Agent routes requests to the polite pool.
pub struct CrossRefSource {
    client: RateLimitedClient,
    cache: ResponseCache,
    base_url: String,
}

impl CrossRefSource {
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
        let user_agent = match contact_email {
            Some(email) => format!("zotkeeper/0.1 (mailto:{email})"),
            None => "zotkeeper/0.1".to_string(),
        };
        Self {
            client: RateLimitedClient::new(
                min_interval,
                max_retries,
                Duration::from_secs(30),
                &user_agent,
            ),
            cache: ResponseCache::new(),
            base_url: base_url.to_string(),
        }
    }

    async fn fetch_work(&self, doi: &Doi) -> Result<Option<RawMetadata>> {
        let key = format!("doi:{}", doi.normalized);
        if let Some(cached) = self.cache.get::<RawMetadata>(&key).await {
            return Ok(Some(cached));
        }

        let url = format!("{}/works/{}", self.base_url, doi.normalized);
        let val: Value = match self.client.get_json(&url).await {
            Ok(val) => val,
            Err(ReconError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };

        let work = work_from_json(&val["message"])?;
        self.cache.set(&key, &work).await;
        Ok(Some(work))
    }
}

#[async_trait]
impl MetadataSource for CrossRefSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn lookup_doi(&self, doi: &Doi) -> Result<Option<RawMetadata>> {
        self.fetch_work(doi).await
    }

    async fn search(&self, query: &str) -> Result<Vec<RawMetadata>> {
        let url = format!(
            "{}/works?query={}&rows=10",
            self.base_url,
            urlencoding::encode(query)
        );
        let val: Value = self.client.get_json(&url).await?;

        let mut results = Vec::new();
        if let Some(items) = val["message"]["items"].as_array() {
            for item in items {
                results.push(work_from_json(item)?);
            }
        }
        Ok(results)
    }
}

fn work_from_json(v: &Value) -> Result<RawMetadata> {
    let doi = v["DOI"]
        .as_str()
        .ok_or_else(|| ReconError::Parse("missing DOI in CrossRef response".to_string()))?;

    let mut work = RawMetadata::new(SOURCE_NAME);
    work.doi = Some(doi.to_string());
    work.title = v["title"][0].as_str().map(ToOwned::to_owned);
    work.abstract_text = v["abstract"].as_str().map(ToOwned::to_owned);
    work.date = date_from_parts(v);
    work.venue = v["container-title"][0].as_str().map(ToOwned::to_owned);
    work.issn = v["ISSN"][0].as_str().map(ToOwned::to_owned);
    work.volume = v["volume"].as_str().map(ToOwned::to_owned);
    work.issue = v["issue"].as_str().map(ToOwned::to_owned);
    work.pages = v["page"].as_str().map(ToOwned::to_owned);
    work.url = v["URL"].as_str().map(ToOwned::to_owned);
    work.citation_count = v["is-referenced-by-count"].as_u64();

    Ok(work)
}

/// CrossRef dates arrive as `{"date-parts": [[2017, 6, 12]]}` under several
/// alternative keys; trailing parts may be absent.
fn date_from_parts(v: &Value) -> Option<String> {
    let parts = ["published", "published-print", "published-online", "issued"]
        .iter()
        .map(|key| &v[*key]["date-parts"][0])
        .find(|parts| parts.is_array())?;

    let year = parts[0].as_i64()?;
    match (parts[1].as_i64(), parts[2].as_i64()) {
        (Some(month), Some(day)) => Some(format!("{year:04}-{month:02}-{day:02}")),
        (Some(month), None) => Some(format!("{year:04}-{month:02}")),
        _ => Some(format!("{year:04}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn source_for(server: &Server) -> CrossRefSource {
        CrossRefSource::with_params(&server.url(), Duration::ZERO, 0, None)
    }

    #[tokio::test]
    async fn lookup_normalizes_the_works_schema() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works/10.1038/nature14539")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                "status": "ok",
                "message": {
                    "DOI": "10.1038/nature14539",
                    "title": ["Human-level control through deep reinforcement learning"],
                    "abstract": "An abstract.",
                    "published": {"date-parts": [[2015, 2, 26]]},
                    "container-title": ["Nature"],
                    "ISSN": ["0028-0836", "1476-4687"],
                    "volume": "518",
                    "issue": "7540",
                    "page": "529-533",
                    "is-referenced-by-count": 14000
                }
            }"#,
            )
            .create_async()
            .await;

        let source = source_for(&server);
        let doi = Doi::parse("10.1038/nature14539").unwrap();
        let work = source.lookup_doi(&doi).await.unwrap().expect("found");

        assert_eq!(work.source, "CrossRef");
        assert_eq!(work.date.as_deref(), Some("2015-02-26"));
        assert_eq!(work.venue.as_deref(), Some("Nature"));
        assert_eq!(work.issn.as_deref(), Some("0028-0836"));
        assert_eq!(work.pages.as_deref(), Some("529-533"));
        assert_eq!(work.citation_count, Some(14000));
    }

    #[tokio::test]
    async fn unknown_doi_is_none_not_an_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works/10.9999/nope")
            .with_status(404)
            .create_async()
            .await;

        let source = source_for(&server);
        let doi = Doi::parse("10.9999/nope").unwrap();
        assert!(source.lookup_doi(&doi).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeat_lookups_hit_the_run_cache() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.1/cached")
            .with_status(200)
            .with_body(r#"{"message": {"DOI": "10.1/cached", "title": ["Once"]}}"#)
            .expect(1)
            .create_async()
            .await;

        let source = source_for(&server);
        let doi = Doi::parse("10.1/cached").unwrap();
        let first = source.lookup_doi(&doi).await.unwrap().expect("found");
        let second = source.lookup_doi(&doi).await.unwrap().expect("cached");

        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn search_returns_normalized_rows() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/works?query=deep%20learning&rows=10")
            .with_status(200)
            .with_body(
                r#"{
                "message": {
                    "items": [
                        {"DOI": "10.1/a", "title": ["First"], "issued": {"date-parts": [[2020]]}},
                        {"DOI": "10.1/b", "title": ["Second"]}
                    ]
                }
            }"#,
            )
            .create_async()
            .await;

        let source = source_for(&server);
        let results = source.search("deep learning").await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].doi.as_deref(), Some("10.1/a"));
        assert_eq!(results[0].date.as_deref(), Some("2020"));
        assert_eq!(results[1].title.as_deref(), Some("Second"));
    }
}
