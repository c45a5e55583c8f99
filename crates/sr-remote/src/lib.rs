//! HTTP backend speaking the products REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use sr_core::{
    CoreError, CoreResult, DashboardStats, Product, ProductBackend, ProductFormData, ProductId,
    ProductPatch,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote product API client.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: Client,
    base_url: Url,
}

impl RemoteBackend {
    /// Create a client for the API at `base_url` (e.g. `http://localhost:5000`).
    pub fn new(base_url: &str) -> CoreResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| CoreError::Transport(err.to_string()))?;
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|err| CoreError::Validation(format!("invalid API URL {base_url:?}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CoreError::Validation(format!(
                "invalid API URL {base_url}: not a base URL"
            )));
        }
        Ok(Self { client, base_url })
    }

    /// The base URL with trailing slashes removed.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> CoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CoreError::Validation(format!("invalid API URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn products_url(&self) -> CoreResult<Url> {
        self.endpoint(&["api", "products"])
    }

    /// `.` and `..` would be dropped as path segments, so they never name a product.
    fn product_url(&self, id: &ProductId) -> CoreResult<Url> {
        if matches!(id.as_str(), "" | "." | "..") {
            return Err(CoreError::NotFound(id.to_string()));
        }
        self.endpoint(&["api", "products", id.as_str()])
    }

    fn stats_url(&self) -> CoreResult<Url> {
        self.endpoint(&["api", "dashboard", "stats"])
    }

    async fn send(&self, request: RequestBuilder) -> CoreResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|err| CoreError::Transport(err.to_string()))?;
        let status = response.status();
        debug!(url = %response.url(), %status, "remote response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, &body))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> CoreResult<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|err| CoreError::Transport(err.to_string()))
    }
}

/// Map a non-success status to a core error.
///
/// Only answers that say something about the data itself are
/// authoritative; everything else is a transport failure.
fn error_for_status(status: StatusCode, body: &str) -> CoreError {
    let message = error_message(body).unwrap_or_else(|| format!("HTTP {status}"));
    match status {
        StatusCode::NOT_FOUND => CoreError::NotFound(message),
        StatusCode::CONFLICT => CoreError::DuplicateSku(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            CoreError::Validation(message)
        }
        _ => CoreError::Transport(format!("HTTP {}: {message}", status.as_u16())),
    }
}

fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(text) = json.get(key).and_then(serde_json::Value::as_str) {
                return Some(text.to_string());
            }
        }
    }
    Some(body.to_string())
}

#[async_trait]
impl ProductBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn list(&self) -> CoreResult<Vec<Product>> {
        self.fetch(self.client.get(self.products_url()?)).await
    }

    async fn get(&self, id: &ProductId) -> CoreResult<Product> {
        self.fetch(self.client.get(self.product_url(id)?)).await
    }

    async fn create(&self, data: ProductFormData) -> CoreResult<Product> {
        self.fetch(self.client.post(self.products_url()?).json(&data))
            .await
    }

    async fn update(&self, id: &ProductId, patch: ProductPatch) -> CoreResult<Product> {
        self.fetch(self.client.put(self.product_url(id)?).json(&patch))
            .await
    }

    async fn delete(&self, id: &ProductId) -> CoreResult<()> {
        self.send(self.client.delete(self.product_url(id)?)).await?;
        Ok(())
    }

    async fn stats(&self) -> CoreResult<DashboardStats> {
        self.fetch(self.client.get(self.stats_url()?)).await
    }
}
