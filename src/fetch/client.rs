//! HTTP fetch client
//!
//! This module issues the listing requests of a sweep, including:
//! - Building the HTTP client with the site's user agent and credentials
//! - Page cache lookup and write-through
//! - Retry with linear backoff for transient failures
//! - Outcome classification (success, soft failure, hard failure)

use crate::cache::{CacheKey, PageCache};
use crate::config::{Config, HarvestConfig, SiteConfig};
use crate::fetch::classify::classify_body;
use crate::fetch::credentials::Credentials;
use crate::fetch::outcome::{FetchOutcome, HardFailureKind, SoftFailureKind};
use crate::request::{normalize_url, RequestSpec};
use crate::{ConfigError, HarvestError};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use url::Url;

/// Statuses that are retried with backoff
const TRANSIENT_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Attempts allowed for a status outside the handled set (the first try plus one retry)
const UNEXPECTED_STATUS_ATTEMPTS: u32 = 2;

/// Builds an HTTP client for the listing site
///
/// The user agent comes from the site settings, the timeout applies to each
/// request individually, and credentials become default headers.
pub fn build_http_client(
    site: &SiteConfig,
    harvest: &HarvestConfig,
    credentials: &Credentials,
) -> Result<Client, HarvestError> {
    let headers = credentials.header_map()?;

    let client = Client::builder()
        .user_agent(site.user_agent.clone())
        .default_headers(headers)
        .timeout(harvest.request_timeout())
        .connect_timeout(harvest.request_timeout().min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Linear backoff: the wait after failed attempt `n` is `base_delay * n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            base_delay: config.retry_base_delay(),
        }
    }

    /// Delay before the attempt following `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Counters shared by every fetch of a client
#[derive(Debug, Default)]
struct FetchCounters {
    network_requests: AtomicU64,
    cache_hits: AtomicU64,
}

/// Snapshot of the fetch counters of a client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// HTTP requests sent, retries included
    pub network_requests: u64,
    /// Fetches answered from the page cache
    pub cache_hits: u64,
}

impl FetchCounters {
    fn snapshot(&self) -> FetchStats {
        FetchStats {
            network_requests: self.network_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

/// Cache writes handed to the blocking pool and not yet finished
#[derive(Debug, Default)]
struct PendingWrites {
    count: AtomicUsize,
    idle: Notify,
}

impl PendingWrites {
    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// What a single HTTP attempt resolved to
enum Attempt {
    Done(FetchOutcome),
    Transient(String),
    Unexpected(u16),
}

/// Fetches listing pages through the page cache
pub struct FetchClient {
    client: Client,
    base_url: Url,
    cache: Arc<dyn PageCache>,
    retry: RetryPolicy,
    counters: Arc<FetchCounters>,
    pending_writes: Arc<PendingWrites>,
}

impl FetchClient {
    /// Creates a client for the configured site
    pub fn new(
        config: &Config,
        credentials: &Credentials,
        cache: Arc<dyn PageCache>,
    ) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.site, &config.harvest, credentials)?;
        let base_url = Url::parse(&config.site.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

        Ok(Self::with_client(
            client,
            base_url,
            cache,
            RetryPolicy::from_config(&config.harvest),
        ))
    }

    /// Creates a client from prebuilt parts
    pub fn with_client(
        client: Client,
        base_url: Url,
        cache: Arc<dyn PageCache>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            base_url,
            cache,
            retry,
            counters: Arc::new(FetchCounters::default()),
            pending_writes: Arc::new(PendingWrites::default()),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn stats(&self) -> FetchStats {
        self.counters.snapshot()
    }

    /// Cache writes still in progress
    pub fn pending_writes(&self) -> usize {
        self.pending_writes.count.load(Ordering::Acquire)
    }

    /// Waits until every cache write started so far has finished
    pub async fn flush(&self) {
        loop {
            let idle = self.pending_writes.idle.notified();
            if self.pending_writes() == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Fetches the page for one planned request
    pub async fn fetch(&self, spec: &RequestSpec) -> FetchOutcome {
        match spec.cache_key(&self.base_url) {
            Ok(key) => self.fetch_keyed(&key).await,
            Err(e) => {
                tracing::warn!(request = %spec, error = %e, "Cannot build request URL");
                FetchOutcome::HardFailure(HardFailureKind::InvalidUrl)
            }
        }
    }

    /// Fetches an arbitrary listing URL
    ///
    /// A malformed URL resolves to `HardFailure(InvalidUrl)` without any
    /// network attempt.
    pub async fn fetch_url(&self, url: &str) -> FetchOutcome {
        match normalize_url(url) {
            Ok(normalized) => self.fetch_keyed(&CacheKey::for_url(normalized)).await,
            Err(e) => {
                tracing::warn!(url, error = %e, "Rejecting malformed URL");
                FetchOutcome::HardFailure(HardFailureKind::InvalidUrl)
            }
        }
    }

    async fn fetch_keyed(&self, key: &CacheKey) -> FetchOutcome {
        match self.cache.get(key) {
            Ok(Some(body)) => {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(url = %key.url(), "Cache hit");
                return match classify_body(&body) {
                    Some(kind) => self.soft_failure(key, kind),
                    None => FetchOutcome::Success {
                        body,
                        from_cache: true,
                    },
                };
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(url = %key.url(), error = %e, "Cache read failed, fetching from network");
            }
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;

            let reason = match self.attempt(key).await {
                Attempt::Done(outcome) => return outcome,
                Attempt::Transient(reason) => {
                    if attempt >= self.retry.attempts {
                        tracing::warn!(url = %key.url(), attempt, reason = %reason, "Giving up after transient failures");
                        return FetchOutcome::HardFailure(HardFailureKind::ExhaustedRetries {
                            attempts: attempt,
                        });
                    }
                    reason
                }
                Attempt::Unexpected(status) => {
                    if attempt >= self.retry.attempts.min(UNEXPECTED_STATUS_ATTEMPTS) {
                        tracing::warn!(url = %key.url(), status, "Unexpected status");
                        return FetchOutcome::HardFailure(HardFailureKind::UnexpectedStatus {
                            status,
                        });
                    }
                    format!("unexpected status {}", status)
                }
            };

            let delay = self.retry.delay_for(attempt);
            tracing::debug!(
                url = %key.url(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "Retrying after backoff"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, key: &CacheKey) -> Attempt {
        self.counters.network_requests.fetch_add(1, Ordering::Relaxed);

        let response = match self.client.get(key.url().as_str()).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                return Attempt::Transient(e.to_string());
            }
            Err(e) => {
                tracing::warn!(url = %key.url(), error = %e, "Request failed");
                return Attempt::Done(FetchOutcome::HardFailure(HardFailureKind::NetworkError {
                    message: e.to_string(),
                }));
            }
        };

        let status = response.status();
        match status {
            StatusCode::OK => match response.text().await {
                Ok(body) => Attempt::Done(self.accept(key, body)),
                Err(e) => Attempt::Transient(format!("body read failed: {}", e)),
            },
            StatusCode::NOT_FOUND => {
                tracing::warn!(url = %key.url(), "Listing page not found");
                Attempt::Done(FetchOutcome::HardFailure(HardFailureKind::NotFound))
            }
            s if TRANSIENT_STATUSES.contains(&s.as_u16()) => {
                Attempt::Transient(format!("HTTP {}", s.as_u16()))
            }
            s => Attempt::Unexpected(s.as_u16()),
        }
    }

    /// Classifies a fresh HTTP-200 body and writes usable pages through to the cache
    fn accept(&self, key: &CacheKey, body: String) -> FetchOutcome {
        if let Some(kind) = classify_body(&body) {
            return self.soft_failure(key, kind);
        }

        self.write_through(key, &body);

        FetchOutcome::Success {
            body,
            from_cache: false,
        }
    }

    /// Stores `body` on the blocking pool; the fetch does not wait for it
    fn write_through(&self, key: &CacheKey, body: &str) {
        let cache = Arc::clone(&self.cache);
        let pending = Arc::clone(&self.pending_writes);
        let key = key.clone();
        let body = body.to_string();

        pending.count.fetch_add(1, Ordering::AcqRel);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = cache.put(&key, &body) {
                tracing::warn!(url = %key.url(), error = %e, "Failed to cache page");
            }
            pending.finish();
        });
    }

    fn soft_failure(&self, key: &CacheKey, kind: SoftFailureKind) -> FetchOutcome {
        match kind {
            SoftFailureKind::NoResults => {
                tracing::debug!(url = %key.url(), "No reviews match this filter combination");
            }
            SoftFailureKind::BotChallenge | SoftFailureKind::LoginWall => {
                tracing::warn!(url = %key.url(), kind = %kind, "Blocked page");
            }
        }
        FetchOutcome::SoftFailure(kind)
    }
}
