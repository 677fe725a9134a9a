//! Video byte retrieval: plain URL download or blob-store object fetch,
//! both idempotent reads retried with jittered backoff.

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

use clipfund_common::{EngineError, EngineResult};

use crate::traits::VideoFetcher;

const FETCH_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Retry an idempotent operation with exponential backoff plus jitter.
/// Never used for writes; transfers carry dedup keys instead.
pub(crate) async fn retry_with_backoff<T, F, Fut>(label: &str, op: F) -> EngineResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let mut last_err = None;
    for attempt in 0..FETCH_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt + 1 < FETCH_ATTEMPTS {
                    let jitter = rand::rng().random_range(0..250);
                    let delay = BACKOFF_BASE * 2u32.pow(attempt) + Duration::from_millis(jitter);
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "{label} failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| EngineError::external(label, "retries exhausted")))
}

/// Production fetcher: reqwest for external URLs, bucket-scoped GETs for
/// blob-store keys.
pub struct HttpVideoFetcher {
    client: reqwest::Client,
    storage_base_url: String,
    storage_bucket: String,
    storage_service_key: Option<String>,
}

impl HttpVideoFetcher {
    pub fn new(
        storage_base_url: &str,
        storage_bucket: &str,
        storage_service_key: Option<&str>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            storage_base_url: storage_base_url.trim_end_matches('/').to_string(),
            storage_bucket: storage_bucket.to_string(),
            storage_service_key: storage_service_key.map(String::from),
        }
    }

    async fn get_bytes(&self, url: &str, bearer: Option<&str>) -> EngineResult<Bytes> {
        let mut req = self.client.get(url);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| EngineError::external("video fetch", e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EngineError::ExternalService {
                service: "video fetch".into(),
                message: format!("status {status} fetching {url}"),
            });
        }

        resp.bytes()
            .await
            .map_err(|e| EngineError::external("video fetch", e))
    }
}

#[async_trait]
impl VideoFetcher for HttpVideoFetcher {
    async fn fetch_url(&self, url: &str) -> EngineResult<Bytes> {
        retry_with_backoff("url fetch", || self.get_bytes(url, None)).await
    }

    async fn fetch_object(&self, key: &str) -> EngineResult<Bytes> {
        let url = format!(
            "{}/object/{}/{}",
            self.storage_base_url, self.storage_bucket, key
        );
        retry_with_backoff("storage fetch", || {
            self.get_bytes(&url, self.storage_service_key.as_deref())
        })
        .await
    }
}
