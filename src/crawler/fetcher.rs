//! HTTP fetcher with proxy rotation, rate limiting and response caching
//!
//! Every fetch acquires a concurrency slot, waits out the global
//! inter-request delay, then attempts the request through a freshly drawn
//! proxy endpoint. Retryable HTTP statuses are retried with exponential
//! backoff, drawing a new proxy on each attempt; non-retryable statuses fail
//! the fetch immediately. Successful bodies populate a TTL cache keyed by
//! URL, and cached URLs are served without any network or slot work.

use std::collections::HashSet;
use std::time::Duration;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{header::HeaderMap, Client};
use tokio::sync::Semaphore;

use crate::cache::{CacheStats, ResponseCache};
use crate::config::CrawlerConfig;
use crate::crawler::headers::browser_headers;
use crate::error::FetchError;
use crate::proxy::{ProxyEndpoint, ProxyPool};

/// Backoff between retry attempts never exceeds this
const MAX_BACKOFF_MS: u64 = 30_000;

/// Rate-limited, proxy-rotating HTTP fetcher
pub struct Fetcher {
    /// One pre-built client per proxy endpoint (single client when direct)
    clients: Vec<Client>,

    /// Proxy pool aligned with `clients`; `None` for a direct fetcher
    pool: Option<ProxyPool>,

    /// Bounds concurrent in-flight requests
    semaphore: Semaphore,

    /// Enforces the minimum delay between requests, globally
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,

    /// HTTP status codes eligible for retry
    retry_codes: HashSet<u16>,

    /// Maximum retry attempts per URL
    max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    base_delay_ms: u64,

    /// Response cache keyed by URL
    cache: ResponseCache,

    /// Fixed browser-like header set sent with every request
    headers: HeaderMap,
}

impl Fetcher {
    /// Create a fetcher that routes every request through the proxy pool
    ///
    /// A `reqwest::Client` is built per endpoint at construction; each fetch
    /// attempt draws one uniformly at random, so retries may use a different
    /// egress than the failed attempt.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if a client cannot be built.
    pub fn new(config: &CrawlerConfig, pool: ProxyPool) -> Result<Self, FetchError> {
        let mut clients = Vec::with_capacity(pool.len());
        for endpoint in pool.endpoints() {
            let proxy = reqwest::Proxy::all(endpoint.server_url())?
                .basic_auth(&endpoint.username, &endpoint.password);
            clients.push(Self::client_builder(config).proxy(proxy).build()?);
        }

        Ok(Self::assemble(config, clients, Some(pool)))
    }

    /// Create a fetcher without a proxy pool
    ///
    /// Used against local mock servers in tests; production crawls go
    /// through [`Fetcher::new`].
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the client cannot be built.
    pub fn direct(config: &CrawlerConfig) -> Result<Self, FetchError> {
        let client = Self::client_builder(config).build()?;
        Ok(Self::assemble(config, vec![client], None))
    }

    fn client_builder(config: &CrawlerConfig) -> reqwest::ClientBuilder {
        Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .cookie_store(true)
    }

    fn assemble(config: &CrawlerConfig, clients: Vec<Client>, pool: Option<ProxyPool>) -> Self {
        let rate_limiter = Quota::with_period(Duration::from_millis(config.min_request_delay_ms))
            .map(RateLimiter::direct);

        Self {
            clients,
            pool,
            semaphore: Semaphore::new(config.max_concurrent_requests),
            rate_limiter,
            retry_codes: config.retry_status_codes.iter().copied().collect(),
            max_retries: config.max_retries,
            base_delay_ms: 1000,
            cache: ResponseCache::new(Duration::from_secs(config.cache_ttl_secs)),
            headers: browser_headers(),
        }
    }

    /// Fetch a URL, returning the response body
    ///
    /// Serves from cache when possible; otherwise acquires a concurrency
    /// slot, waits out the inter-request delay, and runs the retry loop.
    ///
    /// # Errors
    ///
    /// `FetchError::Status` for a non-retryable status (zero retries),
    /// `FetchError::RetriesExhausted` after `max_retries` failed retryable
    /// attempts, `FetchError::Http` for unrecoverable client errors.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Some(body) = self.cache.get(url) {
            tracing::trace!(url = %url, "Cache hit");
            return Ok(body);
        }

        // The semaphore lives as long as the fetcher and is never closed,
        // so acquisition only fails if that invariant is broken.
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::Unavailable)?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        self.fetch_with_retry(url).await
    }

    /// Retry loop with exponential backoff and per-attempt proxy rotation
    async fn fetch_with_retry(&self, url: &str) -> Result<String, FetchError> {
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay =
                    (self.base_delay_ms * 2_u64.pow(attempt - 1)).min(MAX_BACKOFF_MS);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let (client, endpoint) = self.draw_client();
            tracing::trace!(
                url = %url,
                attempt,
                proxy = endpoint.map(|e| e.host.as_str()).unwrap_or("direct"),
                "Issuing request"
            );

            match client.get(url).headers(self.headers.clone()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body = response.text().await?;
                        self.cache.insert(url, body.clone());
                        return Ok(body);
                    }

                    let code = status.as_u16();
                    if self.retry_codes.contains(&code) {
                        tracing::debug!(url = %url, status = code, attempt, "Retryable status");
                        last_error = format!("status {code}");
                    } else {
                        return Err(FetchError::Status(code));
                    }
                }
                Err(e) if e.is_timeout() => {
                    tracing::debug!(url = %url, attempt, "Request timed out");
                    last_error = "timeout".to_string();
                }
                Err(e) => {
                    tracing::debug!(url = %url, attempt, error = %e, "Transport error");
                    last_error = e.to_string();
                }
            }
        }

        Err(FetchError::RetriesExhausted(last_error))
    }

    /// Draw the client (and endpoint) for one attempt
    fn draw_client(&self) -> (&Client, Option<&ProxyEndpoint>) {
        match &self.pool {
            Some(pool) => {
                let idx = pool.select_index();
                (&self.clients[idx], Some(&pool.endpoints()[idx]))
            }
            None => (&self.clients[0], None),
        }
    }

    /// Whether a status code would be retried
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retry_codes.contains(&status)
    }

    /// Snapshot of cache hit/miss counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
