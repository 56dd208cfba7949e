use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::error::{ReconError, Result};

// ─── RateLimitedClient ────────────────────────────────────────────────────────

/// HTTP client that serializes requests to one source behind a minimum
/// inter-request interval and retries transient failures with backoff.
///
/// The last-request slot is per client instance; workers sharing a client
/// share its spacing guarantee.
pub struct RateLimitedClient {
    client: reqwest::Client,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    max_retries: u32,
}

impl RateLimitedClient {
    pub fn new(
        min_interval: Duration,
        max_retries: u32,
        timeout: Duration,
        user_agent: &str,
    ) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
            max_retries,
        }
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub async fn get(&self, url: &str) -> Result<String> {
        self.get_with_headers(url, HeaderMap::new()).await
    }

    pub async fn get_with_headers(&self, url: &str, headers: HeaderMap) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            self.wait_for_rate_limit().await;
            let resp = self.client.get(url).headers(headers.clone()).send().await;
            match resp {
                Ok(r) if r.status() == 429 => {
                    if attempt >= self.max_retries {
                        return Err(ReconError::RateLimit(url.to_string(), 60));
                    }
                    let wait = r
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    sleep(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                Ok(r) if r.status() == 404 => {
                    return Err(ReconError::NotFound(url.to_string()));
                }
                Ok(r) if r.status().is_server_error() => {
                    if attempt >= self.max_retries {
                        let status = r.status().as_u16();
                        return Err(ReconError::ApiError(
                            url.to_string(),
                            format!("HTTP {status} after {attempt} retries"),
                        ));
                    }
                    sleep(backoff_delay(attempt)).await;
                    attempt += 1;
                }
                Ok(r) if !r.status().is_success() => {
                    let status = r.status().as_u16();
                    let body = r.text().await.unwrap_or_default();
                    return Err(ReconError::ApiError(
                        url.to_string(),
                        format!("HTTP {status}: {body}"),
                    ));
                }
                Ok(r) => return r.text().await.map_err(ReconError::Http),
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(ReconError::Http(e));
                    }
                    sleep(backoff_delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.get_json_with_headers(url, HeaderMap::new()).await
    }

    pub async fn get_json_with_headers<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<T> {
        let text = self.get_with_headers(url, headers).await?;
        serde_json::from_str(&text).map_err(|e| ReconError::Parse(e.to_string()))
    }

    /// HEAD probe for liveness checks; no retries, any transport failure is
    /// simply "unreachable".
    pub async fn head_status(&self, url: &str) -> Result<u16> {
        self.wait_for_rate_limit().await;
        let resp = self.client.head(url).send().await?;
        Ok(resp.status().as_u16())
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(250 * 2u64.pow(attempt))
}

// ─── ResponseCache ────────────────────────────────────────────────────────────

/// Run-scoped response cache. Nothing is persisted: the map lives only as
/// long as its owning client.
#[derive(Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, String>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().await;
        let raw = entries.get(key)?;
        serde_json::from_str(raw).ok()
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        if let Ok(raw) = serde_json::to_string(value) {
            let mut entries = self.entries.lock().await;
            entries.insert(key.to_string(), raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn consecutive_calls_respect_the_minimum_interval() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body("pong")
            .expect(3)
            .create_async()
            .await;

        let interval = Duration::from_millis(50);
        let client =
            RateLimitedClient::new(interval, 0, Duration::from_secs(5), "zotkeeper-test/0.1");
        let url = format!("{}/ping", server.url());

        let started = Instant::now();
        for _ in 0..3 {
            client.get(&url).await.expect("ping");
        }

        // Three calls share two enforced gaps.
        assert!(started.elapsed() >= interval * 2);
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let mut server = Server::new_async().await;
        // The newest matching mock wins until its hit limit, so the 500 is
        // served once before requests fall through to the 200.
        let _ok = server
            .mock("GET", "/flaky")
            .with_status(200)
            .with_body("recovered")
            .create_async()
            .await;
        let _fail = server
            .mock("GET", "/flaky")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let client = RateLimitedClient::new(
            Duration::ZERO,
            2,
            Duration::from_secs(5),
            "zotkeeper-test/0.1",
        );
        let body = client
            .get(&format!("{}/flaky", server.url()))
            .await
            .expect("eventual success");
        assert_eq!(body, "recovered");
    }

    #[tokio::test]
    async fn not_found_is_permanent_and_unretried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = RateLimitedClient::new(
            Duration::ZERO,
            3,
            Duration::from_secs(5),
            "zotkeeper-test/0.1",
        );
        let err = client
            .get(&format!("{}/missing", server.url()))
            .await
            .expect_err("404 is permanent");

        assert!(matches!(err, ReconError::NotFound(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn cache_round_trips_within_the_run() {
        let cache = ResponseCache::new();
        cache.set("doi:10.1/x", &vec!["a".to_string()]).await;
        let hit: Option<Vec<String>> = cache.get("doi:10.1/x").await;
        assert_eq!(hit, Some(vec!["a".to_string()]));

        let miss: Option<Vec<String>> = cache.get("doi:10.1/y").await;
        assert!(miss.is_none());
    }
}
