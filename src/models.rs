//! Core data structures for the marketminer crawler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product fields extracted from a detail page
///
/// Extraction is total: fields the page does not provide degrade to empty
/// strings instead of failing the branch. The `asin` is the external catalog
/// key and the sole product identity for upserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Brand the crawl was seeded with
    pub brand_name: String,

    /// Product display name
    pub product_name: String,

    /// External catalog key
    pub asin: String,

    /// Main product image URL
    pub image_url: String,

    /// Detail page URL the record was extracted from
    pub product_url: String,
}

impl ProductRecord {
    /// Names of the extracted fields that came back empty
    ///
    /// Used by the spider for data-quality logging; an incomplete record is
    /// still appended to the sink.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.product_name.is_empty() {
            missing.push("product_name");
        }
        if self.asin.is_empty() {
            missing.push("asin");
        }
        if self.image_url.is_empty() {
            missing.push("image_url");
        }
        missing
    }

    /// True when every extracted field is present
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Persisted brand row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    /// Row ID
    pub id: i64,

    /// Unique display name
    pub name: String,
}

/// Persisted product row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Row ID
    pub id: i64,

    /// External catalog key (unique)
    pub asin: String,

    /// Display name
    pub name: String,

    /// Image URL
    pub image: String,

    /// Internal SKU, never set by the crawler
    pub sku: Option<String>,

    /// Owning brand row ID
    pub brand_id: i64,

    /// When the row was first created
    pub created_at: DateTime<Utc>,

    /// When the row was last overwritten by a crawl
    pub updated_at: DateTime<Utc>,
}

/// Whether an upsert created a new product row or overwrote an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
        }
    }
}

/// Counters accumulated over one brand crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Listing pages fetched (monotonically increasing during the crawl)
    pub pages_visited: u64,

    /// Detail pages successfully extracted into records
    pub products_extracted: u64,

    /// Branches abandoned after retries were exhausted
    pub fetch_failures: u64,

    /// Records appended with one or more empty fields
    pub incomplete_records: u64,

    /// Records successfully upserted by the sink
    pub persisted: u64,

    /// Records dropped by the sink on persistence errors
    pub dropped: u64,
}
