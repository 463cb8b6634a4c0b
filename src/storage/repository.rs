//! Repository Pattern for Database Abstraction
//!
//! This module provides trait-based repository abstractions to decouple
//! crawl logic from storage implementations, enabling:
//! - Easy testing with mock implementations
//! - Swappable storage backends (SQLite today, others later)
//! - Clear separation of concerns
//!
//! # Usage
//!
//! ```rust,ignore
//! use marketminer::storage::repository::{ProductRepository, SqliteProductRepository};
//!
//! // Production: use SQLite
//! let repo = SqliteProductRepository::new("data/products.db")?;
//!
//! // Testing: use Mock
//! let mock_repo = MockProductRepository::new();
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Brand, Product, ProductRecord, UpsertOutcome};

// ============================================================================
// Repository Trait
// ============================================================================

/// Repository for brand and product storage
///
/// Products are keyed by their external catalog key (`asin`): re-crawling a
/// product overwrites its mutable fields instead of inserting a duplicate.
/// The `sku` column is owned by downstream consumers and is never written by
/// the crawler.
pub trait ProductRepository: Send + Sync {
    /// Look up a brand by name, creating the row if it does not exist
    fn get_or_create_brand(&self, name: &str) -> Result<Brand>;

    /// Insert or overwrite the product identified by the record's `asin`
    ///
    /// Returns the stored row and whether it was created or updated.
    fn upsert_product(&self, record: &ProductRecord) -> Result<(Product, UpsertOutcome)>;

    /// Get a product by its catalog key
    fn get_product_by_asin(&self, asin: &str) -> Result<Option<Product>>;

    /// Get a brand by name
    fn get_brand_by_name(&self, name: &str) -> Result<Option<Brand>>;

    /// Count stored products
    fn count_products(&self) -> Result<usize>;

    /// Count stored brands
    fn count_brands(&self) -> Result<usize>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of ProductRepository
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteProductRepository {
    conn: Mutex<Connection>,
}

impl SqliteProductRepository {
    /// Create a new SQLite repository
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite repository initialized");
        Ok(repo)
    }

    /// Create in-memory repository (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory SQLite")?;
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;
        Ok(repo)
    }

    /// Create database schema
    fn create_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS brands (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE
                );

                CREATE TABLE IF NOT EXISTS products (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    asin TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    image TEXT NOT NULL,
                    sku TEXT,
                    brand_id INTEGER NOT NULL REFERENCES brands(id),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_products_brand_id
                    ON products(brand_id);
                "#,
        )
        .context("Failed to create SQLite schema")?;

        Ok(())
    }

    fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
        Ok(Product {
            id: row.get(0)?,
            asin: row.get(1)?,
            name: row.get(2)?,
            image: row.get(3)?,
            sku: row.get(4)?,
            brand_id: row.get(5)?,
            created_at: parse_timestamp(&row.get::<_, String>(6)?),
            updated_at: parse_timestamp(&row.get::<_, String>(7)?),
        })
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl ProductRepository for SqliteProductRepository {
    fn get_or_create_brand(&self, name: &str) -> Result<Brand> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO brands (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            params![name],
        )
        .context("Failed to insert brand")?;

        let brand = conn
            .query_row(
                "SELECT id, name FROM brands WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Brand {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .context("Failed to read back brand")?;

        Ok(brand)
    }

    fn upsert_product(&self, record: &ProductRecord) -> Result<(Product, UpsertOutcome)> {
        // get_or_create_brand takes the lock itself; resolve the brand first.
        let brand = self.get_or_create_brand(&record.brand_name)?;

        let conn = self.conn.lock().unwrap();

        let existed: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM products WHERE asin = ?1)",
                params![record.asin],
                |row| row.get(0),
            )
            .context("Failed to check product existence")?;

        let now = Utc::now().to_rfc3339();

        // sku is deliberately absent from the update set: it belongs to
        // downstream consumers and survives re-crawls.
        conn.execute(
            r#"
                INSERT INTO products (asin, name, image, sku, brand_id, created_at, updated_at)
                VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?5)
                ON CONFLICT(asin) DO UPDATE SET
                    name = excluded.name,
                    image = excluded.image,
                    brand_id = excluded.brand_id,
                    updated_at = excluded.updated_at
                "#,
            params![record.asin, record.product_name, record.image_url, brand.id, now],
        )
        .context("Failed to upsert product")?;

        let product = conn
            .query_row(
                "SELECT id, asin, name, image, sku, brand_id, created_at, updated_at
                 FROM products WHERE asin = ?1",
                params![record.asin],
                Self::row_to_product,
            )
            .context("Failed to read back product")?;

        let outcome = if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        };

        Ok((product, outcome))
    }

    fn get_product_by_asin(&self, asin: &str) -> Result<Option<Product>> {
        let conn = self.conn.lock().unwrap();
        let product = conn
            .query_row(
                "SELECT id, asin, name, image, sku, brand_id, created_at, updated_at
                 FROM products WHERE asin = ?1",
                params![asin],
                Self::row_to_product,
            )
            .optional()
            .context("Failed to get product")?;

        Ok(product)
    }

    fn get_brand_by_name(&self, name: &str) -> Result<Option<Brand>> {
        let conn = self.conn.lock().unwrap();
        let brand = conn
            .query_row(
                "SELECT id, name FROM brands WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Brand {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .context("Failed to get brand")?;

        Ok(brand)
    }

    fn count_products(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn count_brands(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM brands", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ============================================================================
// Mock Implementation (for testing)
// ============================================================================

/// In-memory mock implementation of ProductRepository
///
/// Useful for testing without database dependencies. Can be switched into a
/// failing mode to exercise the sink's error path.
pub struct MockProductRepository {
    brands: RwLock<HashMap<String, Brand>>,
    products: RwLock<HashMap<String, Product>>,
    next_brand_id: Mutex<i64>,
    next_product_id: Mutex<i64>,
    fail: RwLock<bool>,
}

impl MockProductRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            brands: RwLock::new(HashMap::new()),
            products: RwLock::new(HashMap::new()),
            next_brand_id: Mutex::new(1),
            next_product_id: Mutex::new(1),
            fail: RwLock::new(false),
        }
    }

    /// Make every subsequent operation fail (or succeed again)
    pub fn set_fail(&self, fail: bool) {
        *self.fail.write().unwrap() = fail;
    }

    fn check_fail(&self) -> Result<()> {
        if *self.fail.read().unwrap() {
            anyhow::bail!("mock repository failure injected");
        }
        Ok(())
    }

    /// Get the number of stored products
    pub fn len(&self) -> usize {
        self.products.read().unwrap().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.products.read().unwrap().is_empty()
    }

    /// Clear all records
    pub fn clear(&self) {
        self.brands.write().unwrap().clear();
        self.products.write().unwrap().clear();
    }
}

impl Default for MockProductRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductRepository for MockProductRepository {
    fn get_or_create_brand(&self, name: &str) -> Result<Brand> {
        self.check_fail()?;

        let mut brands = self.brands.write().unwrap();
        if let Some(brand) = brands.get(name) {
            return Ok(brand.clone());
        }

        let mut next_id = self.next_brand_id.lock().unwrap();
        let brand = Brand {
            id: *next_id,
            name: name.to_string(),
        };
        *next_id += 1;

        brands.insert(name.to_string(), brand.clone());
        Ok(brand)
    }

    fn upsert_product(&self, record: &ProductRecord) -> Result<(Product, UpsertOutcome)> {
        self.check_fail()?;

        let brand = self.get_or_create_brand(&record.brand_name)?;
        let mut products = self.products.write().unwrap();

        if let Some(existing) = products.get_mut(&record.asin) {
            existing.name = record.product_name.clone();
            existing.image = record.image_url.clone();
            existing.brand_id = brand.id;
            existing.updated_at = Utc::now();
            return Ok((existing.clone(), UpsertOutcome::Updated));
        }

        let mut next_id = self.next_product_id.lock().unwrap();
        let now = Utc::now();
        let product = Product {
            id: *next_id,
            asin: record.asin.clone(),
            name: record.product_name.clone(),
            image: record.image_url.clone(),
            sku: None,
            brand_id: brand.id,
            created_at: now,
            updated_at: now,
        };
        *next_id += 1;

        products.insert(record.asin.clone(), product.clone());
        Ok((product, UpsertOutcome::Created))
    }

    fn get_product_by_asin(&self, asin: &str) -> Result<Option<Product>> {
        self.check_fail()?;
        Ok(self.products.read().unwrap().get(asin).cloned())
    }

    fn get_brand_by_name(&self, name: &str) -> Result<Option<Brand>> {
        self.check_fail()?;
        Ok(self.brands.read().unwrap().get(name).cloned())
    }

    fn count_products(&self) -> Result<usize> {
        self.check_fail()?;
        Ok(self.products.read().unwrap().len())
    }

    fn count_brands(&self) -> Result<usize> {
        self.check_fail()?;
        Ok(self.brands.read().unwrap().len())
    }
}

// ============================================================================
// Shared Repository Types
// ============================================================================

/// Thread-safe shared repository wrapper
pub type SharedProductRepository = Arc<dyn ProductRepository>;

/// Create a shared SQLite repository
pub fn create_sqlite_repository(path: impl AsRef<Path>) -> Result<SharedProductRepository> {
    let repo = SqliteProductRepository::new(path)?;
    Ok(Arc::new(repo))
}

/// Create a shared mock repository
pub fn create_mock_repository() -> SharedProductRepository {
    Arc::new(MockProductRepository::new())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to create test repositories
    fn create_test_repos() -> Vec<Box<dyn ProductRepository>> {
        vec![
            Box::new(SqliteProductRepository::in_memory().unwrap()),
            Box::new(MockProductRepository::new()),
        ]
    }

    fn record(brand: &str, asin: &str, name: &str, image: &str) -> ProductRecord {
        ProductRecord {
            brand_name: brand.to_string(),
            product_name: name.to_string(),
            asin: asin.to_string(),
            image_url: image.to_string(),
            product_url: format!("https://www.amazon.com/dp/{asin}"),
        }
    }

    #[test]
    fn test_get_or_create_brand_is_idempotent() {
        for repo in create_test_repos() {
            let first = repo.get_or_create_brand("Acme").unwrap();
            let second = repo.get_or_create_brand("Acme").unwrap();

            assert_eq!(first.id, second.id);
            assert_eq!(repo.count_brands().unwrap(), 1);
        }
    }

    #[test]
    fn test_brand_names_are_distinct_rows() {
        for repo in create_test_repos() {
            let acme = repo.get_or_create_brand("Acme").unwrap();
            let globex = repo.get_or_create_brand("Globex").unwrap();

            assert_ne!(acme.id, globex.id);
            assert_eq!(repo.count_brands().unwrap(), 2);
        }
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        for repo in create_test_repos() {
            let (created, outcome) = repo
                .upsert_product(&record("Acme", "B000000001", "Widget", "http://img/1.jpg"))
                .unwrap();
            assert_eq!(outcome, UpsertOutcome::Created);
            assert_eq!(created.name, "Widget");

            let (updated, outcome) = repo
                .upsert_product(&record(
                    "Acme",
                    "B000000001",
                    "Widget v2",
                    "http://img/2.jpg",
                ))
                .unwrap();
            assert_eq!(outcome, UpsertOutcome::Updated);
            assert_eq!(updated.id, created.id);
            assert_eq!(updated.name, "Widget v2");
            assert_eq!(updated.image, "http://img/2.jpg");

            assert_eq!(repo.count_products().unwrap(), 1);
        }
    }

    #[test]
    fn test_upsert_preserves_sku() {
        // The crawler never writes sku; an update must not clear it.
        let repo = SqliteProductRepository::in_memory().unwrap();

        repo.upsert_product(&record("Acme", "B000000001", "Widget", "img"))
            .unwrap();

        {
            let conn = repo.conn.lock().unwrap();
            conn.execute(
                "UPDATE products SET sku = 'ACME-001' WHERE asin = 'B000000001'",
                [],
            )
            .unwrap();
        }

        let (updated, _) = repo
            .upsert_product(&record("Acme", "B000000001", "Widget v2", "img2"))
            .unwrap();
        assert_eq!(updated.sku.as_deref(), Some("ACME-001"));
    }

    #[test]
    fn test_upsert_links_product_to_brand() {
        for repo in create_test_repos() {
            let (product, _) = repo
                .upsert_product(&record("Acme", "B000000001", "Widget", "img"))
                .unwrap();

            let brand = repo.get_brand_by_name("Acme").unwrap().unwrap();
            assert_eq!(product.brand_id, brand.id);
        }
    }

    #[test]
    fn test_get_product_by_asin() {
        for repo in create_test_repos() {
            assert!(repo.get_product_by_asin("B0MISSING").unwrap().is_none());

            repo.upsert_product(&record("Acme", "B000000001", "Widget", "img"))
                .unwrap();

            let found = repo.get_product_by_asin("B000000001").unwrap().unwrap();
            assert_eq!(found.asin, "B000000001");
        }
    }

    #[test]
    fn test_get_brand_by_name_missing() {
        for repo in create_test_repos() {
            assert!(repo.get_brand_by_name("Nobody").unwrap().is_none());
        }
    }

    #[test]
    fn test_file_backed_repository_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.db");

        {
            let repo = SqliteProductRepository::new(&path).unwrap();
            repo.upsert_product(&record("Acme", "B000000001", "Widget", "img"))
                .unwrap();
        }

        let reopened = SqliteProductRepository::new(&path).unwrap();
        assert_eq!(reopened.count_products().unwrap(), 1);
        assert_eq!(reopened.count_brands().unwrap(), 1);
    }

    #[test]
    fn test_mock_failure_injection() {
        let mock = MockProductRepository::new();
        mock.set_fail(true);
        assert!(mock
            .upsert_product(&record("Acme", "B000000001", "Widget", "img"))
            .is_err());

        mock.set_fail(false);
        assert!(mock
            .upsert_product(&record("Acme", "B000000001", "Widget", "img"))
            .is_ok());
    }

    #[test]
    fn test_mock_repository_utilities() {
        let mock = MockProductRepository::new();

        assert!(mock.is_empty());
        mock.upsert_product(&record("Acme", "B000000001", "Widget", "img"))
            .unwrap();
        assert_eq!(mock.len(), 1);

        mock.clear();
        assert!(mock.is_empty());
    }

    #[test]
    fn test_shared_repository_creation() {
        let repo = create_mock_repository();
        repo.upsert_product(&record("Acme", "B000000001", "Widget", "img"))
            .unwrap();
        assert_eq!(repo.count_products().unwrap(), 1);
    }
}
