//! Core domain entities, rules, and traits for Stockroom.

use async_trait::async_trait;
use thiserror::Error;

mod analytics;
mod product;
mod query;
mod repository;
mod service;

pub use analytics::{
    compute_analytics, compute_stats, Analytics, CategorySummary, DashboardStats, StockSummary,
    TopProduct,
};
pub use product::{
    Category, Product, ProductFormData, ProductId, ProductPatch, ProductStatus, StockLevel,
};
pub use query::{ProductQuery, SortDirection, SortField, StockFilter};
pub use repository::{Clock, MemoryStore, ProductRepository, SystemClock};
pub use service::InventoryService;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors returned by core validation, domain rules, and backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Returned when a field fails validation at the input boundary.
    #[error("validation error: {0}")]
    Validation(String),
    /// Returned when another live product already uses the SKU.
    #[error("SKU already exists: {0}")]
    DuplicateSku(String),
    /// Returned when an operation targets an id that does not exist.
    #[error("product not found: {0}")]
    NotFound(String),
    /// Returned when the durable store cannot be read or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Returned when a remote call fails without an authoritative answer.
    #[error("transport error: {0}")]
    Transport(String),
}

impl CoreError {
    /// Whether a read may be retried against the local store after this error.
    pub fn is_transport(&self) -> bool {
        matches!(self, CoreError::Transport(_))
    }
}

/// Durable slot holding the full product collection.
///
/// Implementations read and write the whole collection as one unit.
pub trait ProductStore {
    /// Load every stored product in storage order.
    fn load(&self) -> CoreResult<Vec<Product>>;
    /// Replace the stored collection.
    fn save(&self, products: &[Product]) -> CoreResult<()>;
}

/// Data-access operations shared by the local repository and the remote API.
#[async_trait]
pub trait ProductBackend: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;
    /// Fetch all products.
    async fn list(&self) -> CoreResult<Vec<Product>>;
    /// Fetch a single product by id.
    async fn get(&self, id: &ProductId) -> CoreResult<Product>;
    /// Create a new product.
    async fn create(&self, data: ProductFormData) -> CoreResult<Product>;
    /// Merge a partial update onto an existing product.
    async fn update(&self, id: &ProductId, patch: ProductPatch) -> CoreResult<Product>;
    /// Delete a product by id.
    async fn delete(&self, id: &ProductId) -> CoreResult<()>;
    /// Summary statistics over the current catalog.
    async fn stats(&self) -> CoreResult<DashboardStats>;
}
