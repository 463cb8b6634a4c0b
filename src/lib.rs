//! marketminer - Brand-driven product catalog crawler
//!
//! A crawling system that walks a retail site's brand search results,
//! follows every product link, extracts catalog fields from the detail
//! pages, and upserts them into a relational store.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`proxy`] - Egress proxy pool with per-request rotation
//! - [`cache`] - TTL-bounded response cache
//! - [`crawler`] - Fetching, rate limiting, and crawl orchestration
//! - [`extract`] - Listing and detail page extraction
//! - [`models`] - Core data structures and types
//! - [`storage`] - SQLite persistence and batched upserts
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use marketminer::config::Config;
//! use marketminer::crawler::{BrandSpider, Fetcher, SearchUrlBuilder};
//! use marketminer::proxy::ProxyPool;
//! use marketminer::storage::create_sqlite_repository;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let pool = ProxyPool::from_strings(&config.proxy.endpoints)?;
//!     let fetcher = Arc::new(Fetcher::new(&config.crawler, pool)?);
//!     let repo = create_sqlite_repository(&config.database.sqlite_path)?;
//!     let builder = SearchUrlBuilder::new(&config.crawler.search_base_url)?;
//!
//!     let spider = BrandSpider::new(fetcher, repo, builder, config.crawler.batch_size);
//!     let summary = spider.crawl("Acme").await?;
//!     println!("persisted {} products", summary.persisted);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod models;
pub mod proxy;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::{BrandSpider, Fetcher, SearchUrlBuilder};
    pub use crate::error::{CrawlerError, FetchError, ProxyError};
    pub use crate::models::{CrawlSummary, ProductRecord, UpsertOutcome};
    pub use crate::proxy::ProxyPool;
    pub use crate::storage::{ProductRepository, SqliteProductRepository};
}

// Direct re-exports for convenience
pub use models::{CrawlSummary, ProductRecord};
