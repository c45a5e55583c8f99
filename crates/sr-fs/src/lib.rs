//! Filesystem-backed persistence and configuration for Stockroom.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use sr_core::{
    Category, CoreError, CoreResult, Product, ProductId, ProductStatus, ProductStore,
};

/// Default directory name for the data store and config.
pub const STORE_DIR_NAME: &str = "stockroom";

/// File holding the serialized product array.
pub const SLOT_FILE_NAME: &str = "inventory_products.json";

const CONFIG_FILE_NAME: &str = "config.yaml";

const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Product store keeping the whole catalog in one JSON file.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at the provided directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the root path of the store.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve the default store path (~/.stockroom).
    pub fn default_path() -> CoreResult<PathBuf> {
        if let Some(dir) = dirs::home_dir() {
            return Ok(dir.join(format!(".{STORE_DIR_NAME}")));
        }
        Err(CoreError::StorageUnavailable(
            "unable to determine a default data path".into(),
        ))
    }

    /// Path of the product slot file.
    pub fn slot_path(&self) -> PathBuf {
        self.root.join(SLOT_FILE_NAME)
    }

    /// Check if the store has been initialized.
    pub fn exists(&self) -> bool {
        self.slot_path().exists()
    }

    /// Create the directory and an empty slot if they are missing.
    pub fn init(&self) -> CoreResult<()> {
        if self.exists() {
            return Ok(());
        }
        fs::create_dir_all(&self.root)
            .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
        self.save(&[])
    }

    /// Write `products` only when the slot is currently empty.
    ///
    /// Returns whether anything was written.
    pub fn seed(&self, products: &[Product]) -> CoreResult<bool> {
        if !self.load()?.is_empty() {
            return Ok(false);
        }
        self.save(products)?;
        Ok(true)
    }
}

impl ProductStore for FsStore {
    fn load(&self) -> CoreResult<Vec<Product>> {
        let path = self.slot_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path)
            .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents)
            .map_err(|err| CoreError::StorageUnavailable(format!("{}: {err}", path.display())))
    }

    fn save(&self, products: &[Product]) -> CoreResult<()> {
        let path = self.slot_path();
        fs::create_dir_all(&self.root)
            .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
        let contents = serde_json::to_string(products)
            .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;

        // Replace the slot in one rename so readers never see a partial array.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, contents)
            .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
        fs::rename(&staging, &path)
            .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
        debug!(path = %path.display(), count = products.len(), "wrote product slot");
        Ok(())
    }
}

/// Remote API settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Route operations through the remote API.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the API, without the `/api` suffix.
    #[serde(default = "default_api_url")]
    pub base_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_api_url(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Persisted application settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory holding the product slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl AppConfig {
    /// Apply `STOCKROOM_*` overrides read through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        if let Some(dir) = lookup("STOCKROOM_DATA_DIR").filter(|value| !value.trim().is_empty()) {
            self.data_dir = Some(dir);
        }
        if let Some(url) = lookup("STOCKROOM_API_URL").filter(|value| !value.trim().is_empty()) {
            self.remote.base_url = url;
            self.remote.enabled = true;
        }
        if let Some(flag) = lookup("STOCKROOM_REMOTE") {
            self.remote.enabled = parse_flag(&flag)?;
        }
        Ok(self)
    }

    /// Resolve the data directory, defaulting to ~/.stockroom.
    pub fn data_path(&self) -> CoreResult<PathBuf> {
        match self.data_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
            _ => FsStore::default_path(),
        }
    }
}

fn parse_flag(value: &str) -> CoreResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CoreError::Validation(format!(
            "STOCKROOM_REMOTE must be true or false, got {other:?}"
        ))),
    }
}

fn config_path() -> CoreResult<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join(STORE_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    Err(CoreError::StorageUnavailable(
        "unable to determine config directory".into(),
    ))
}

/// Read a config file, returning defaults when it does not exist.
pub fn load_config_from(path: &Path) -> CoreResult<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
    serde_yaml::from_str(&contents).map_err(|err| CoreError::StorageUnavailable(err.to_string()))
}

/// Write a config file, creating parent directories as needed.
pub fn save_config_to(path: &Path, config: &AppConfig) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
    }
    let contents = serde_yaml::to_string(config)
        .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
    fs::write(path, contents).map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
    Ok(())
}

pub fn load_config() -> CoreResult<AppConfig> {
    load_config_from(&config_path()?)
}

pub fn save_config(config: &AppConfig) -> CoreResult<()> {
    save_config_to(&config_path()?, config)
}

/// Remember `path` as the data directory in the user config.
pub fn set_data_dir(path: &Path) -> CoreResult<()> {
    let mut config = load_config()?;
    config.data_dir = Some(path.to_string_lossy().to_string());
    save_config(&config)
}

/// Load the user config and apply environment overrides.
pub fn resolve_config() -> CoreResult<AppConfig> {
    load_config()?.with_overrides(|key| std::env::var(key).ok())
}

/// The starter catalog written by `init --sample`.
pub fn sample_products() -> CoreResult<Vec<Product>> {
    Ok(vec![
        sample(
            "1",
            "LAPTOP-001",
            "Dell XPS 13 Laptop",
            "High-performance ultrabook with 16GB RAM",
            Category::Electronics,
            (1299.99, 25, 5),
            "Dell Inc.",
            "https://images.unsplash.com/photo-1531297484001-80022131f5a1?w=400&h=400&fit=crop",
            (date(2024, 1, 15)?, date(2024, 1, 20)?),
        ),
        sample(
            "2",
            "MOUSE-001",
            "Logitech MX Master 3",
            "Wireless ergonomic mouse",
            Category::Electronics,
            (99.99, 3, 10),
            "Logitech",
            "https://images.unsplash.com/photo-1527864550417-7fd91fc51a46?w=400&h=400&fit=crop",
            (date(2024, 1, 10)?, date(2024, 1, 18)?),
        ),
        sample(
            "3",
            "CHAIR-001",
            "Herman Miller Aeron",
            "Ergonomic office chair",
            Category::Furniture,
            (1395.0, 0, 2),
            "Herman Miller",
            "https://images.unsplash.com/photo-1721322800607-8c38375eef04?w=400&h=400&fit=crop",
            (date(2024, 1, 5)?, date(2024, 1, 15)?),
        ),
        sample(
            "4",
            "PHONE-001",
            "iPhone 15 Pro",
            "Latest Apple smartphone",
            Category::Electronics,
            (999.99, 50, 10),
            "Apple Inc.",
            "https://images.unsplash.com/photo-1511707171634-5f897ff02aa9?w=400&h=400&fit=crop",
            (date(2024, 1, 1)?, date(2024, 1, 22)?),
        ),
    ])
}

#[allow(clippy::too_many_arguments)]
fn sample(
    id: &str,
    sku: &str,
    name: &str,
    description: &str,
    category: Category,
    (price, quantity, min_stock): (f64, u32, u32),
    supplier: &str,
    image_url: &str,
    (created_at, updated_at): (DateTime<Utc>, DateTime<Utc>),
) -> Product {
    Product {
        id: ProductId::from(id),
        sku: sku.into(),
        name: name.into(),
        description: Some(description.into()),
        category,
        price,
        quantity,
        min_stock,
        supplier: Some(supplier.into()),
        image_url: Some(image_url.into()),
        status: ProductStatus::Active,
        created_at,
        updated_at,
    }
}

fn date(year: i32, month: u32, day: u32) -> CoreResult<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .ok_or_else(|| CoreError::Validation(format!("invalid date {year}-{month}-{day}")))
}
