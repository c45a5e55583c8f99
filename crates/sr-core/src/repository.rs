//! Local product repository over a [`ProductStore`].

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    compute_stats, CoreError, CoreResult, DashboardStats, Product, ProductBackend,
    ProductFormData, ProductId, ProductPatch, ProductStore,
};

/// Source of the current time for timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// In-memory product store, used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: Mutex<Vec<Product>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> CoreResult<MutexGuard<'_, Vec<Product>>> {
        self.products
            .lock()
            .map_err(|_| CoreError::StorageUnavailable("memory store lock poisoned".into()))
    }
}

impl ProductStore for MemoryStore {
    fn load(&self) -> CoreResult<Vec<Product>> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, products: &[Product]) -> CoreResult<()> {
        *self.slot()? = products.to_vec();
        Ok(())
    }
}

/// Repository enforcing SKU uniqueness and timestamps over a store.
///
/// Each mutation loads the whole collection, checks it, and persists it
/// back before returning. Mutations through one repository are serialized;
/// separate processes sharing a store are last-writer-wins.
pub struct ProductRepository<S, C = SystemClock> {
    store: S,
    clock: C,
    write_lock: Mutex<()>,
}

impl<S: ProductStore> ProductRepository<S> {
    /// Create a repository using the system clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: ProductStore, C: Clock> ProductRepository<S, C> {
    /// Create a repository with an explicit clock.
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    fn lock_writes(&self) -> CoreResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| CoreError::StorageUnavailable("repository lock poisoned".into()))
    }

    fn load(&self) -> CoreResult<Vec<Product>> {
        let products = self.store.load()?;
        debug!(count = products.len(), "loaded products");
        Ok(products)
    }

    fn persist(&self, products: &[Product]) -> CoreResult<()> {
        self.store.save(products)?;
        debug!(count = products.len(), "persisted products");
        Ok(())
    }

    /// Fetch all products in storage order.
    pub fn list_products(&self) -> CoreResult<Vec<Product>> {
        self.load()
    }

    /// Fetch a product, failing with `NotFound` when absent.
    pub fn get_product(&self, id: &ProductId) -> CoreResult<Product> {
        self.load()?
            .into_iter()
            .find(|product| &product.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    /// Create a product with a fresh id and timestamps.
    pub fn create_product(&self, data: ProductFormData) -> CoreResult<Product> {
        let _guard = self.lock_writes()?;
        let mut products = self.load()?;
        if products.iter().any(|product| product.sku == data.sku) {
            return Err(CoreError::DuplicateSku(data.sku));
        }

        let product = Product::from_form(ProductId::generate(), data, self.clock.now());
        products.push(product.clone());
        self.persist(&products)?;
        info!(id = %product.id, sku = %product.sku, "created product");
        Ok(product)
    }

    /// Merge a partial update onto an existing product.
    pub fn update_product(&self, id: &ProductId, patch: ProductPatch) -> CoreResult<Product> {
        let _guard = self.lock_writes()?;
        let mut products = self.load()?;
        let index = products
            .iter()
            .position(|product| &product.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        if let Some(sku) = &patch.sku {
            if products
                .iter()
                .any(|product| &product.sku == sku && &product.id != id)
            {
                return Err(CoreError::DuplicateSku(sku.clone()));
            }
        }

        products[index].apply(patch, self.clock.now());
        let product = products[index].clone();
        self.persist(&products)?;
        info!(id = %product.id, sku = %product.sku, "updated product");
        Ok(product)
    }

    /// Remove a product entirely.
    pub fn delete_product(&self, id: &ProductId) -> CoreResult<()> {
        let _guard = self.lock_writes()?;
        let mut products = self.load()?;
        let before = products.len();
        products.retain(|product| &product.id != id);
        if products.len() == before {
            return Err(CoreError::NotFound(id.to_string()));
        }
        self.persist(&products)?;
        info!(id = %id, "deleted product");
        Ok(())
    }
}

#[async_trait]
impl<S, C> ProductBackend for ProductRepository<S, C>
where
    S: ProductStore + Send + Sync,
    C: Clock,
{
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list(&self) -> CoreResult<Vec<Product>> {
        self.list_products()
    }

    async fn get(&self, id: &ProductId) -> CoreResult<Product> {
        self.get_product(id)
    }

    async fn create(&self, data: ProductFormData) -> CoreResult<Product> {
        self.create_product(data)
    }

    async fn update(&self, id: &ProductId, patch: ProductPatch) -> CoreResult<Product> {
        self.update_product(id, patch)
    }

    async fn delete(&self, id: &ProductId) -> CoreResult<()> {
        self.delete_product(id)
    }

    async fn stats(&self) -> CoreResult<DashboardStats> {
        Ok(compute_stats(&self.list_products()?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use chrono::TimeZone;

    use super::*;
    use crate::{Category, ProductStatus};

    /// Advances one second on every reading.
    struct StepClock {
        seconds: AtomicI64,
    }

    impl StepClock {
        fn new() -> Self {
            Self {
                seconds: AtomicI64::new(1_700_000_000),
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let seconds = self.seconds.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(seconds, 0).unwrap()
        }
    }

    struct ReadOnlyStore;

    impl ProductStore for ReadOnlyStore {
        fn load(&self) -> CoreResult<Vec<Product>> {
            Ok(Vec::new())
        }

        fn save(&self, _products: &[Product]) -> CoreResult<()> {
            Err(CoreError::StorageUnavailable("read-only".into()))
        }
    }

    fn repo() -> ProductRepository<MemoryStore, StepClock> {
        ProductRepository::with_clock(MemoryStore::new(), StepClock::new())
    }

    fn form(sku: &str) -> ProductFormData {
        ProductFormData {
            sku: sku.into(),
            name: "Logitech MX Master 3".into(),
            description: Some("Wireless ergonomic mouse".into()),
            category: Category::Electronics,
            price: 99.99,
            quantity: 3,
            min_stock: 10,
            supplier: Some("Logitech".into()),
            image_url: None,
            status: ProductStatus::Active,
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_input_plus_generated_fields() {
        let repo = repo();
        let created = repo.create(form("MOUSE-001")).await.unwrap();
        let fetched = repo.get(&created.id).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.to_form(), form("MOUSE-001"));
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn duplicate_sku_is_rejected_without_mutation() {
        let repo = repo();
        repo.create(form("A-1")).await.unwrap();
        let second = repo.create(form("A-1")).await;

        assert_eq!(second, Err(CoreError::DuplicateSku("A-1".into())));
        let products = repo.list().await.unwrap();
        assert_eq!(products.iter().filter(|p| p.sku == "A-1").count(), 1);
    }

    #[tokio::test]
    async fn update_rejects_sku_of_another_product() {
        let repo = repo();
        repo.create(form("A-1")).await.unwrap();
        let other = repo.create(form("B-2")).await.unwrap();

        let patch = ProductPatch {
            sku: Some("A-1".into()),
            ..ProductPatch::default()
        };
        let result = repo.update(&other.id, patch).await;
        assert_eq!(result, Err(CoreError::DuplicateSku("A-1".into())));
        assert_eq!(repo.get(&other.id).await.unwrap().sku, "B-2");
    }

    #[tokio::test]
    async fn update_accepts_its_own_sku() {
        let repo = repo();
        let product = repo.create(form("A-1")).await.unwrap();
        let patch = ProductPatch {
            sku: Some("A-1".into()),
            quantity: Some(40),
            ..ProductPatch::default()
        };
        let updated = repo.update(&product.id, patch).await.unwrap();
        assert_eq!(updated.quantity, 40);
    }

    #[tokio::test]
    async fn empty_update_only_refreshes_timestamp() {
        let repo = repo();
        let product = repo.create(form("A-1")).await.unwrap();
        let updated = repo
            .update(&product.id, ProductPatch::default())
            .await
            .unwrap();

        assert_eq!(updated.to_form(), product.to_form());
        assert_eq!(updated.id, product.id);
        assert_eq!(updated.created_at, product.created_at);
        assert!(updated.updated_at > product.updated_at);
    }

    #[tokio::test]
    async fn update_missing_product_is_not_found() {
        let repo = repo();
        let result = repo
            .update(&ProductId::from("missing"), ProductPatch::default())
            .await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_is_not_found_the_second_time() {
        let repo = repo();
        let product = repo.create(form("A-1")).await.unwrap();

        repo.delete(&product.id).await.unwrap();
        assert!(matches!(repo.get(&product.id).await, Err(CoreError::NotFound(_))));
        assert!(matches!(
            repo.delete(&product.id).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleted_sku_can_be_reused() {
        let repo = repo();
        let product = repo.create(form("A-1")).await.unwrap();
        repo.delete(&product.id).await.unwrap();
        let again = repo.create(form("A-1")).await.unwrap();
        assert_ne!(again.id, product.id);
    }

    #[tokio::test]
    async fn mixed_operations_never_duplicate_skus() {
        let repo = repo();
        let skus = ["A-1", "B-2", "A-1", "C-3", "B-2"];
        let mut ids = Vec::new();
        for sku in skus {
            if let Ok(product) = repo.create(form(sku)).await {
                ids.push(product.id);
            }
        }
        for (id, sku) in ids.iter().zip(["C-3", "A-1", "D-4"]) {
            let patch = ProductPatch {
                sku: Some(sku.into()),
                ..ProductPatch::default()
            };
            let _ = repo.update(id, patch).await;
        }
        repo.delete(&ids[0]).await.unwrap();
        let _ = repo.create(form("D-4")).await;

        let products = repo.list().await.unwrap();
        let mut seen = std::collections::HashSet::new();
        assert!(products.iter().all(|p| seen.insert(p.sku.clone())));
    }

    #[tokio::test]
    async fn stats_follow_the_store() {
        let repo = repo();
        repo.create(ProductFormData {
            price: 10.0,
            quantity: 5,
            min_stock: 5,
            ..form("A-1")
        })
        .await
        .unwrap();
        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total_products, 1);
        assert!((stats.total_value - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn storage_failure_is_reported() {
        let repo = ProductRepository::new(ReadOnlyStore);
        let result = repo.create(form("A-1")).await;
        assert!(matches!(result, Err(CoreError::StorageUnavailable(_))));
    }
}
