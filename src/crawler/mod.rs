//! Web crawling functionality with rate limiting
//!
//! This module implements the listing-to-detail crawl logic: building brand
//! search URLs, fetching pages through rotating proxies with rate limiting
//! and retries, and walking the pagination chain.

pub mod fetcher;
pub mod headers;
pub mod spider;
pub mod url;

pub use fetcher::Fetcher;
pub use spider::BrandSpider;
pub use url::SearchUrlBuilder;
