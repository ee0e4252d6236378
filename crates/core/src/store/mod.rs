//! Durable storage for the catalog and the rating ledger.
//!
//! One backend object implements both traits so that deleting an entry and
//! its ratings happens under a single lock or transaction.

mod json;
mod sqlite;

pub use json::JsonStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::catalog::CatalogStore;
use crate::config::{DatabaseConfig, StoreBackend};
use crate::ledger::RatingLedger;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// A backend holding both the catalog and the ledger.
pub trait Store: CatalogStore + RatingLedger {}

impl<T: CatalogStore + RatingLedger> Store for T {}

/// Open the configured store backend.
pub fn create_store(config: &DatabaseConfig) -> Result<Arc<dyn Store>, StoreError> {
    info!(backend = ?config.backend, path = %config.path.display(), "Opening store");
    match config.backend {
        StoreBackend::Json => Ok(Arc::new(JsonStore::new(&config.path)?)),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::new(&config.path)?)),
    }
}
