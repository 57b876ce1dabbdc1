pub mod json_store;
pub mod migrations;
pub mod models;
pub mod sql_store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use gamex_types::{Product, ProductInput};
use tracing::info;

pub use json_store::{Document, JsonStore};
pub use sql_store::SqlStore;

/// Whether a write reached disk or only lives in process memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    Persisted,
    EphemeralOnly,
}

impl Durability {
    /// Combine two writes of one logical operation. Durable only if both are.
    pub fn and(self, other: Durability) -> Durability {
        match (self, other) {
            (Durability::Persisted, Durability::Persisted) => Durability::Persisted,
            _ => Durability::EphemeralOnly,
        }
    }

    pub fn is_persisted(self) -> bool {
        self == Durability::Persisted
    }
}

/// Result of a mutating store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written<T> {
    pub value: T,
    pub durability: Durability,
}

impl<T> Written<T> {
    pub fn persisted(value: T) -> Self {
        Self {
            value,
            durability: Durability::Persisted,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection lock poisoned")]
    LockPoisoned,
    #[error("product id space exhausted")]
    IdsExhausted,
}

/// The catalog operations both backends provide. Not-found is a value
/// (`None` / `false`), never an error.
pub trait ProductStore: Send + Sync {
    fn backend(&self) -> &'static str;

    fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    fn get_product(&self, id: i64) -> Result<Option<Product>, StoreError>;

    fn create_product(&self, input: &ProductInput) -> Result<Written<Product>, StoreError>;

    fn update_product(&self, id: i64, input: &ProductInput)
    -> Result<Written<bool>, StoreError>;

    fn delete_product(&self, id: i64) -> Result<Written<bool>, StoreError>;
}

/// Which backend a deployment runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Sqlite(PathBuf),
    Json(PathBuf),
}

pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn ProductStore>> {
    let store: Arc<dyn ProductStore> = match config {
        StoreConfig::Sqlite(path) => Arc::new(SqlStore::open(path)?),
        StoreConfig::Json(path) => Arc::new(JsonStore::open(path)),
    };
    info!("Product store ready ({} backend)", store.backend());
    Ok(store)
}
