//! Change-detection fetch with retry
//!
//! Each fetch pulls the full payload, fingerprints it, and consults
//! the content store to decide whether anything downstream needs to
//! run. Transport errors are retried under the fixed-delay policy;
//! exhaustion is fatal for the process (there is no fallback source,
//! and indefinite silent retrying is worse than a visible stop).

use crate::content_store::{ContentDigest, ContentStore};
use crate::retry::{FixedBackoff, MaxRetriesExceeded, RetryPolicy};
use async_trait::async_trait;
use std::time::Duration;

/// Result of one fetch of one resource. Consumed within the cycle that
/// produced it, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Payload bytes identical to an already-ingested fetch
    Unchanged,
    /// Previously unseen payload, now recorded in the content store
    NewPayload(Vec<u8>),
}

#[derive(Debug)]
pub enum FetchError {
    /// Network / transport failure (retried)
    Transport(String),
    /// Non-success HTTP status (retried; upstream flaps through 5xx)
    Status(u16),
    /// Marker write failed (not a network condition, still retried)
    Store(std::io::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {}", msg),
            FetchError::Status(code) => write!(f, "unexpected HTTP status {}", code),
            FetchError::Store(e) => write!(f, "content store error: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}

/// Transport seam: one GET of one URL, full body
#[async_trait]
pub trait PayloadSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// reqwest-backed transport with a per-attempt timeout, so a hung read
/// surfaces as a transport error and feeds the retry counter instead
/// of blocking forever.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(timeout_secs: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PayloadSource for HttpSource {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

/// Change-detection fetcher: transport + content store + retry policy
pub struct Fetcher<S: PayloadSource> {
    source: S,
    store: ContentStore,
    policy: RetryPolicy,
}

impl<S: PayloadSource> Fetcher<S> {
    pub fn new(source: S, store: ContentStore, policy: RetryPolicy) -> Self {
        Self {
            source,
            store,
            policy,
        }
    }

    /// Fetch one resource, retrying transient failures.
    ///
    /// The retry counter is local to this call; the next call (and the
    /// next cycle) starts from zero. Returns `Err(MaxRetriesExceeded)`
    /// after the final failed attempt, at which point the caller is
    /// expected to terminate the process with a non-zero status.
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, MaxRetriesExceeded> {
        let mut backoff = FixedBackoff::new(self.policy);

        loop {
            log::info!("📡 Fetching '{}'", url);

            match self.attempt(url).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    log::warn!("Fetch of '{}' failed: {}", url, e);
                    backoff.sleep().await?;
                }
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let payload = self.source.get(url).await?;
        let digest = ContentDigest::of(&payload);

        if self.store.has(&digest) {
            log::info!("   └─ No update available ({} bytes, digest seen before)", payload.len());
            return Ok(FetchOutcome::Unchanged);
        }

        self.store.record(&digest).map_err(FetchError::Store)?;
        log::info!("   └─ New payload ({} bytes, digest {})", payload.len(), digest);
        Ok(FetchOutcome::NewPayload(payload))
    }
}
