//! Error types for the marketminer crawler
//!
//! This module defines custom error types used throughout the application.

use thiserror::Error;

/// Errors raised by the proxy pool
#[derive(Error, Debug)]
pub enum ProxyError {
    /// No proxy endpoints configured
    #[error("Proxy pool is empty")]
    EmptyPool,

    /// Endpoint string could not be parsed
    #[error("Invalid proxy endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-retryable HTTP status code
    #[error("Server returned status {0}")]
    Status(u16),

    /// All retry attempts exhausted on retryable failures
    #[error("Retries exhausted: {0}")]
    RetriesExhausted(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Fetcher is no longer accepting work
    #[error("Fetcher unavailable")]
    Unavailable,
}

/// Errors that can propagate out of a whole-brand crawl
///
/// Branch-level fetch failures are contained by the spider and never surface
/// here; only conditions that invalidate the entire crawl do.
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Proxy pool error
    #[error("Proxy error: {0}")]
    Proxy(#[from] ProxyError),

    /// Brand name unusable as a crawl seed
    #[error("Invalid brand name: {0:?}")]
    InvalidBrand(String),
}
