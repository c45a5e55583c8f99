use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

const MIN_PRICE: f64 = 0.01;
const MIN_NAME_LEN: usize = 2;

fn sku_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9-]+$").expect("valid sku pattern"))
}

fn image_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^https?://.+\.(jpg|jpeg|png|gif|webp)$").expect("valid image url pattern")
    })
}

/// Opaque product identifier, immutable after creation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Access the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed set of product categories.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Electronics,
    Furniture,
    Clothing,
    Books,
    Sports,
    #[serde(rename = "Home & Garden")]
    HomeAndGarden,
    Automotive,
    #[serde(rename = "Health & Beauty")]
    HealthAndBeauty,
    #[serde(rename = "Toys & Games")]
    ToysAndGames,
    #[serde(rename = "Food & Beverage")]
    FoodAndBeverage,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 10] = [
        Category::Electronics,
        Category::Furniture,
        Category::Clothing,
        Category::Books,
        Category::Sports,
        Category::HomeAndGarden,
        Category::Automotive,
        Category::HealthAndBeauty,
        Category::ToysAndGames,
        Category::FoodAndBeverage,
    ];

    /// Human-readable name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Furniture => "Furniture",
            Category::Clothing => "Clothing",
            Category::Books => "Books",
            Category::Sports => "Sports",
            Category::HomeAndGarden => "Home & Garden",
            Category::Automotive => "Automotive",
            Category::HealthAndBeauty => "Health & Beauty",
            Category::ToysAndGames => "Toys & Games",
            Category::FoodAndBeverage => "Food & Beverage",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(value: &str) -> CoreResult<Self> {
        let wanted = value.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::Validation(format!("unknown category: {wanted}")))
    }
}

/// Lifecycle status of a product.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    Discontinued,
}

impl ProductStatus {
    /// Serialized name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::Discontinued => "discontinued",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stock classification derived from quantity and minimum stock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StockLevel {
    /// `quantity > min_stock`.
    InStock,
    /// `0 < quantity <= min_stock`.
    LowStock,
    /// `quantity == 0`.
    OutOfStock,
}

/// A persisted product record.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: Category,
    pub price: f64,
    pub quantity: u32,
    pub min_stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a product from form data, stamping both timestamps with `now`.
    pub fn from_form(id: ProductId, data: ProductFormData, now: DateTime<Utc>) -> Self {
        Self {
            id,
            sku: data.sku,
            name: data.name,
            description: non_blank(data.description),
            category: data.category,
            price: data.price,
            quantity: data.quantity,
            min_stock: data.min_stock,
            supplier: non_blank(data.supplier),
            image_url: trimmed(data.image_url),
            status: data.status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stock value of this product (`price * quantity`).
    pub fn value(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }

    /// Classify the current stock position.
    pub fn stock_level(&self) -> StockLevel {
        if self.quantity == 0 {
            StockLevel::OutOfStock
        } else if self.quantity <= self.min_stock {
            StockLevel::LowStock
        } else {
            StockLevel::InStock
        }
    }

    /// Merge the supplied patch fields and refresh `updated_at`.
    ///
    /// An empty string for an optional text field clears it.
    pub fn apply(&mut self, patch: ProductPatch, now: DateTime<Utc>) {
        if let Some(sku) = patch.sku {
            self.sku = sku;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = non_blank(Some(description));
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(min_stock) = patch.min_stock {
            self.min_stock = min_stock;
        }
        if let Some(supplier) = patch.supplier {
            self.supplier = non_blank(Some(supplier));
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = trimmed(Some(image_url));
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now.max(self.created_at);
    }

    /// The business fields of this product as form data.
    pub fn to_form(&self) -> ProductFormData {
        ProductFormData {
            sku: self.sku.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category,
            price: self.price,
            quantity: self.quantity,
            min_stock: self.min_stock,
            supplier: self.supplier.clone(),
            image_url: self.image_url.clone(),
            status: self.status,
        }
    }
}

/// Input for creating a product.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductFormData {
    pub sku: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: Category,
    pub price: f64,
    pub quantity: u32,
    pub min_stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: ProductStatus,
}

impl ProductFormData {
    /// Check field-level rules. Uniqueness is enforced by the repository.
    pub fn validate(&self) -> CoreResult<()> {
        validate_sku(&self.sku)?;
        validate_name(&self.name)?;
        validate_price(self.price)?;
        validate_image_url(self.image_url.as_deref())
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stock: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
}

impl ProductPatch {
    /// Check the rules for every field that is present.
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(sku) = &self.sku {
            validate_sku(sku)?;
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        validate_image_url(self.image_url.as_deref())
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn validate_sku(sku: &str) -> CoreResult<()> {
    if sku.is_empty() {
        return Err(CoreError::Validation("SKU is required".into()));
    }
    if !sku_pattern().is_match(sku) {
        return Err(CoreError::Validation(
            "SKU must contain only uppercase letters, numbers, and hyphens".into(),
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> CoreResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation("product name is required".into()));
    }
    if name.chars().count() < MIN_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "product name must be at least {MIN_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> CoreResult<()> {
    if !price.is_finite() || price < MIN_PRICE {
        return Err(CoreError::Validation(format!(
            "price must be at least {MIN_PRICE}"
        )));
    }
    Ok(())
}

fn validate_image_url(url: Option<&str>) -> CoreResult<()> {
    match url.map(str::trim) {
        None | Some("") => Ok(()),
        Some(url) if image_url_pattern().is_match(url) => Ok(()),
        Some(_) => Err(CoreError::Validation("please enter a valid image URL".into())),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Stores exactly the text the image URL validator matched.
fn trimmed(value: Option<String>) -> Option<String> {
    non_blank(value).map(|text| text.trim().to_string())
}
