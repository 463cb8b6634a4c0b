//! Data persistence for brands and products
//!
//! This module handles the SQLite-backed product store and the batching
//! sink the spider writes through.

pub mod repository;
pub mod sink;

pub use repository::{
    create_mock_repository, create_sqlite_repository, MockProductRepository, ProductRepository,
    SharedProductRepository, SqliteProductRepository,
};
pub use sink::BatchSink;
