//! The single data-access surface used by consumers.

use std::sync::Arc;

use tracing::warn;

use crate::{
    compute_analytics, Analytics, CoreResult, DashboardStats, Product, ProductBackend,
    ProductFormData, ProductId, ProductPatch, ProductQuery,
};

/// Routes operations to the remote API when one is configured, with the
/// local repository as the read fallback.
///
/// Reads that fail at the transport level are retried locally. Writes are
/// sent to the selected backend only and never fall back, so the two stores
/// cannot diverge.
#[derive(Clone)]
pub struct InventoryService {
    local: Arc<dyn ProductBackend>,
    remote: Option<Arc<dyn ProductBackend>>,
}

impl InventoryService {
    /// Serve everything from the local backend.
    pub fn local(local: Arc<dyn ProductBackend>) -> Self {
        Self {
            local,
            remote: None,
        }
    }

    /// Prefer `remote`, falling back to `local` for failed reads.
    pub fn with_remote(local: Arc<dyn ProductBackend>, remote: Arc<dyn ProductBackend>) -> Self {
        Self {
            local,
            remote: Some(remote),
        }
    }

    /// Whether a remote backend is configured.
    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    fn writer(&self) -> &dyn ProductBackend {
        self.remote.as_deref().unwrap_or(self.local.as_ref())
    }

    pub async fn list(&self) -> CoreResult<Vec<Product>> {
        if let Some(remote) = &self.remote {
            match remote.list().await {
                Err(err) if err.is_transport() => {
                    warn!(backend = remote.name(), error = %err, "list failed, using local store");
                }
                result => return result,
            }
        }
        self.local.list().await
    }

    pub async fn get(&self, id: &ProductId) -> CoreResult<Product> {
        if let Some(remote) = &self.remote {
            match remote.get(id).await {
                Err(err) if err.is_transport() => {
                    warn!(backend = remote.name(), %id, error = %err, "get failed, using local store");
                }
                result => return result,
            }
        }
        self.local.get(id).await
    }

    pub async fn stats(&self) -> CoreResult<DashboardStats> {
        if let Some(remote) = &self.remote {
            match remote.stats().await {
                Err(err) if err.is_transport() => {
                    warn!(backend = remote.name(), error = %err, "stats failed, using local store");
                }
                result => return result,
            }
        }
        self.local.stats().await
    }

    pub async fn create(&self, data: ProductFormData) -> CoreResult<Product> {
        self.writer().create(data).await
    }

    pub async fn update(&self, id: &ProductId, patch: ProductPatch) -> CoreResult<Product> {
        self.writer().update(id, patch).await
    }

    pub async fn delete(&self, id: &ProductId) -> CoreResult<()> {
        self.writer().delete(id).await
    }

    /// List, then filter and sort.
    pub async fn query(&self, query: &ProductQuery) -> CoreResult<Vec<Product>> {
        Ok(query.apply(self.list().await?))
    }

    /// Chart breakdowns over the current list.
    pub async fn analytics(&self) -> CoreResult<Analytics> {
        Ok(compute_analytics(&self.list().await?))
    }
}
