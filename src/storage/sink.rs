//! Batched persistence of extracted product records
//!
//! Records accumulate in an in-memory buffer and are flushed to the
//! repository once the buffer reaches the configured batch size, plus a
//! final flush at the end of the crawl. A failed upsert drops the remainder
//! of its batch: persistence is at-most-once per record and a bad batch
//! never stalls the crawl.

use crate::models::{CrawlSummary, ProductRecord};
use crate::storage::repository::SharedProductRepository;

/// Buffers records and flushes them to the repository in batches
pub struct BatchSink {
    repo: SharedProductRepository,
    batch_size: usize,
    buffer: Vec<ProductRecord>,
    persisted: u64,
    dropped: u64,
}

impl BatchSink {
    /// Create a sink flushing every `batch_size` records
    pub fn new(repo: SharedProductRepository, batch_size: usize) -> Self {
        Self {
            repo,
            batch_size: batch_size.max(1),
            buffer: Vec::with_capacity(batch_size.max(1)),
            persisted: 0,
            dropped: 0,
        }
    }

    /// Append a record, flushing if the buffer reaches the batch size
    pub fn append(&mut self, record: ProductRecord) {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush();
        }
    }

    /// Flush all buffered records to the repository
    ///
    /// The buffer is cleared whether or not persistence succeeds. On the
    /// first upsert error the remaining records of the batch are dropped and
    /// counted.
    pub fn flush(&mut self) {
        let batch = std::mem::take(&mut self.buffer);
        if batch.is_empty() {
            return;
        }

        let total = batch.len();
        tracing::debug!(records = total, "Flushing batch");

        let mut remaining = batch.into_iter();
        for record in remaining.by_ref() {
            match self.repo.upsert_product(&record) {
                Ok((product, outcome)) => {
                    self.persisted += 1;
                    tracing::info!(
                        asin = %product.asin,
                        name = %product.name,
                        outcome = outcome.as_str(),
                        "Persisted product"
                    );
                }
                Err(e) => {
                    let dropped = 1 + remaining.len() as u64;
                    self.dropped += dropped;
                    tracing::error!(
                        asin = %record.asin,
                        dropped,
                        error = %e,
                        "Upsert failed, dropping remainder of batch"
                    );
                    break;
                }
            }
        }
    }

    /// Number of records currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Records successfully upserted so far
    pub fn persisted(&self) -> u64 {
        self.persisted
    }

    /// Records dropped on persistence errors so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Fold the sink's counters into a crawl summary
    pub fn record_into(&self, summary: &mut CrawlSummary) {
        summary.persisted = self.persisted;
        summary.dropped = self.dropped;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::repository::{MockProductRepository, ProductRepository};

    fn record(asin: &str) -> ProductRecord {
        ProductRecord {
            brand_name: "Acme".to_string(),
            product_name: format!("Product {asin}"),
            asin: asin.to_string(),
            image_url: "https://img.example.com/p.jpg".to_string(),
            product_url: format!("https://www.amazon.com/dp/{asin}"),
        }
    }

    #[test]
    fn test_flush_triggered_at_batch_size() {
        let mock = Arc::new(MockProductRepository::new());
        let mut sink = BatchSink::new(mock.clone(), 3);

        sink.append(record("B000000001"));
        sink.append(record("B000000002"));
        assert_eq!(mock.len(), 0);
        assert_eq!(sink.buffered(), 2);

        sink.append(record("B000000003"));
        assert_eq!(mock.len(), 3);
        assert_eq!(sink.buffered(), 0);
        assert_eq!(sink.persisted(), 3);
    }

    #[test]
    fn test_final_flush_below_batch_size() {
        let mock = Arc::new(MockProductRepository::new());
        let mut sink = BatchSink::new(mock.clone(), 20);

        sink.append(record("B000000001"));
        sink.append(record("B000000002"));
        sink.flush();

        assert_eq!(mock.len(), 2);
        assert_eq!(sink.persisted(), 2);
        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn test_flush_empty_buffer_is_noop() {
        let mock = Arc::new(MockProductRepository::new());
        let mut sink = BatchSink::new(mock, 5);
        sink.flush();
        assert_eq!(sink.persisted(), 0);
    }

    #[test]
    fn test_failed_upsert_drops_remainder() {
        let mock = Arc::new(MockProductRepository::new());
        let mut sink = BatchSink::new(mock.clone(), 20);

        for i in 1..=4 {
            sink.append(record(&format!("B00000000{i}")));
        }

        mock.set_fail(true);
        sink.flush();

        assert_eq!(sink.persisted(), 0);
        assert_eq!(sink.dropped(), 4);
        assert_eq!(sink.buffered(), 0, "buffer cleared even on failure");

        // Later batches are unaffected once the store recovers.
        mock.set_fail(false);
        sink.append(record("B000000005"));
        sink.flush();
        assert_eq!(sink.persisted(), 1);
        assert_eq!(mock.len(), 1);
    }

    #[test]
    fn test_counters_fold_into_summary() {
        let mock = Arc::new(MockProductRepository::new());
        let mut sink = BatchSink::new(mock, 2);

        sink.append(record("B000000001"));
        sink.append(record("B000000002"));

        let mut summary = crate::models::CrawlSummary::default();
        sink.record_into(&mut summary);
        assert_eq!(summary.persisted, 2);
        assert_eq!(summary.dropped, 0);
    }

    #[test]
    fn test_duplicate_asin_updates_not_duplicates() {
        let mock = Arc::new(MockProductRepository::new());
        let mut sink = BatchSink::new(mock.clone(), 2);

        sink.append(record("B000000001"));
        sink.append(record("B000000001"));

        assert_eq!(mock.len(), 1);
        assert_eq!(sink.persisted(), 2);
        let stored = mock.get_product_by_asin("B000000001").unwrap().unwrap();
        assert_eq!(stored.asin, "B000000001");
    }
}
