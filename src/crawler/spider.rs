//! Brand crawl orchestration
//!
//! A crawl walks the listing chain for one brand: fetch a listing page, fan
//! out over its product links concurrently, extract each detail page into a
//! record, and follow the next-page link until the chain ends. Failures are
//! contained at the branch that raised them; a dead product link costs one
//! record and a dead listing page ends pagination early, but neither fails
//! the crawl.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::crawler::fetcher::Fetcher;
use crate::crawler::url::SearchUrlBuilder;
use crate::error::CrawlerError;
use crate::extract::{extract_detail, extract_listing};
use crate::models::CrawlSummary;
use crate::storage::repository::SharedProductRepository;
use crate::storage::sink::BatchSink;

/// Crawls one brand's listing chain and persists extracted products
pub struct BrandSpider {
    fetcher: Arc<Fetcher>,
    repository: SharedProductRepository,
    url_builder: SearchUrlBuilder,
    batch_size: usize,
}

impl BrandSpider {
    /// Create a spider over the given fetcher and repository
    pub fn new(
        fetcher: Arc<Fetcher>,
        repository: SharedProductRepository,
        url_builder: SearchUrlBuilder,
        batch_size: usize,
    ) -> Self {
        Self {
            fetcher,
            repository,
            url_builder,
            batch_size,
        }
    }

    /// Crawl all listing pages for a brand
    ///
    /// # Errors
    ///
    /// Returns `CrawlerError::InvalidBrand` when the brand name is empty or
    /// whitespace. Branch-level fetch failures are counted in the summary,
    /// not raised.
    pub async fn crawl(&self, brand: &str) -> Result<CrawlSummary, CrawlerError> {
        let brand = brand.trim();
        if brand.is_empty() {
            return Err(CrawlerError::InvalidBrand(brand.to_string()));
        }

        let mut summary = CrawlSummary::default();
        let mut sink = BatchSink::new(Arc::clone(&self.repository), self.batch_size);
        let mut next_url = Some(self.url_builder.search_url(brand));

        tracing::info!(brand = %brand, "Starting brand crawl");

        while let Some(page_url) = next_url.take() {
            let body = match self.fetcher.fetch(&page_url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(url = %page_url, error = %e, "Listing fetch failed, ending pagination");
                    summary.fetch_failures += 1;
                    break;
                }
            };
            summary.pages_visited += 1;

            let listing = extract_listing(&body, &page_url);
            tracing::debug!(
                url = %page_url,
                products = listing.product_urls.len(),
                has_next = listing.next_page_url.is_some(),
                "Listing page extracted"
            );

            self.crawl_details(brand, &listing.product_urls, &mut summary, &mut sink)
                .await;

            next_url = listing.next_page_url;
        }

        sink.flush();
        sink.record_into(&mut summary);

        tracing::info!(
            brand = %brand,
            pages = summary.pages_visited,
            extracted = summary.products_extracted,
            persisted = summary.persisted,
            failures = summary.fetch_failures,
            "Brand crawl finished"
        );

        Ok(summary)
    }

    /// Crawl several brands sequentially with a bounded whole-brand retry
    ///
    /// Brands run one at a time, each fully drained before the next starts.
    /// A brand whose seed page was unreachable is re-crawled whole, up to
    /// `max_attempts` with `retry_delay` between attempts; the response
    /// cache makes repeated attempts cheap. A failed brand never prevents
    /// later brands from running.
    pub async fn crawl_many(
        &self,
        brands: &[String],
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Vec<(String, Result<CrawlSummary, CrawlerError>)> {
        let max_attempts = max_attempts.max(1);
        let mut outcomes = Vec::with_capacity(brands.len());

        for brand in brands {
            let mut result = self.crawl(brand).await;

            for attempt in 2..=max_attempts {
                match &result {
                    Ok(summary) if summary.pages_visited == 0 && summary.fetch_failures > 0 => {
                        tracing::warn!(brand = %brand, attempt, "Seed page unreachable, retrying brand");
                    }
                    Ok(_) => break,
                    // A rejected brand name cannot succeed on a re-run.
                    Err(CrawlerError::InvalidBrand(_)) => break,
                    Err(e) => {
                        tracing::warn!(brand = %brand, attempt, error = %e, "Brand crawl failed, retrying");
                    }
                }

                tokio::time::sleep(retry_delay).await;
                result = self.crawl(brand).await;
            }

            if let Err(e) = &result {
                tracing::error!(brand = %brand, error = %e, "Skipping brand");
            }
            outcomes.push((brand.clone(), result));
        }

        outcomes
    }

    /// Fetch and extract every product link of one listing page concurrently
    ///
    /// The fetcher's semaphore bounds actual parallelism; this just fans the
    /// futures out and collects them in page order.
    async fn crawl_details(
        &self,
        brand: &str,
        product_urls: &[String],
        summary: &mut CrawlSummary,
        sink: &mut BatchSink,
    ) {
        let fetches = product_urls
            .iter()
            .map(|url| async move { (url.as_str(), self.fetcher.fetch(url).await) });

        for (url, result) in join_all(fetches).await {
            let body = match result {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Detail fetch failed, skipping product");
                    summary.fetch_failures += 1;
                    continue;
                }
            };

            let record = extract_detail(&body, url, brand);
            summary.products_extracted += 1;

            let missing = record.missing_fields();
            if !missing.is_empty() {
                summary.incomplete_records += 1;
                tracing::warn!(url = %url, missing = ?missing, "Incomplete product record");
            }

            sink.append(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlerConfig;
    use crate::storage::repository::create_mock_repository;

    fn spider() -> BrandSpider {
        let config = CrawlerConfig {
            min_request_delay_ms: 0,
            max_retries: 0,
            cache_ttl_secs: 0,
            ..CrawlerConfig::default()
        };
        let fetcher = Arc::new(Fetcher::direct(&config).unwrap());
        BrandSpider::new(
            fetcher,
            create_mock_repository(),
            SearchUrlBuilder::default(),
            20,
        )
    }

    #[tokio::test]
    async fn test_empty_brand_rejected() {
        let result = spider().crawl("").await;
        assert!(matches!(result, Err(CrawlerError::InvalidBrand(_))));
    }

    #[tokio::test]
    async fn test_whitespace_brand_rejected() {
        let result = spider().crawl("   ").await;
        assert!(matches!(result, Err(CrawlerError::InvalidBrand(_))));
    }
}
