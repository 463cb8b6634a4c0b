//! Search URL construction and product link normalization
//!
//! Listing pages link to detail pages with per-session tracking noise baked
//! into the URLs. Normalization strips that noise so the cache and the
//! upsert path both see stable URLs.

use url::Url;

use crate::error::CrawlerError;

/// Default search base for the target site
pub const DEFAULT_SEARCH_BASE: &str = "https://www.amazon.com";

/// Builds brand search URLs against a configurable base
///
/// The base is overridable so tests can point the whole crawl at a local
/// mock server.
#[derive(Debug, Clone)]
pub struct SearchUrlBuilder {
    base: Url,
}

impl SearchUrlBuilder {
    /// Create a builder for the given base URL
    ///
    /// # Errors
    ///
    /// Returns `CrawlerError::Fetch` wrapping an invalid-URL error when the
    /// base cannot be parsed.
    pub fn new(base: &str) -> Result<Self, CrawlerError> {
        let base = Url::parse(base)
            .map_err(|_| crate::error::FetchError::InvalidUrl(base.to_string()))?;
        Ok(Self { base })
    }

    /// Build the seed search URL for a brand
    ///
    /// # Examples
    ///
    /// ```
    /// use marketminer::crawler::url::SearchUrlBuilder;
    ///
    /// let builder = SearchUrlBuilder::new("https://www.amazon.com").unwrap();
    /// let url = builder.search_url("Step 2");
    /// assert_eq!(url, "https://www.amazon.com/s?k=Step+2&ref=nb_sb_noss");
    /// ```
    pub fn search_url(&self, brand: &str) -> String {
        let mut url = self.base.clone();
        url.set_path("/s");
        url.query_pairs_mut()
            .append_pair("k", brand)
            .append_pair("ref", "nb_sb_noss");
        url.to_string()
    }
}

impl Default for SearchUrlBuilder {
    fn default() -> Self {
        // The constant is a valid URL; parsing it cannot fail.
        Self {
            base: Url::parse(DEFAULT_SEARCH_BASE).unwrap(),
        }
    }
}

/// Normalize a product link found on a listing page
///
/// Strips the tracking query string entirely and resolves relative hrefs
/// against the listing page URL.
pub fn normalize_product_link(href: &str, page_url: &str) -> Option<String> {
    let trimmed = href.split('?').next().unwrap_or(href);
    if trimmed.is_empty() {
        return None;
    }
    join(trimmed, page_url)
}

/// Normalize a next-page link found on a listing page
///
/// The pagination control carries an `&xpid=` impression token that varies
/// per render; everything from it onwards is dropped before resolving.
pub fn normalize_next_link(href: &str, page_url: &str) -> Option<String> {
    let trimmed = href.split("&xpid").next().unwrap_or(href);
    if trimmed.is_empty() {
        return None;
    }
    join(trimmed, page_url)
}

fn join(href: &str, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    let resolved = base.join(href).ok()?;
    Some(resolved.to_string())
}
