//! Dashboard aggregates, recomputed from the full product list on every call.

use serde::{Deserialize, Serialize};

use crate::{Category, Product, ProductId, StockLevel};

const TOP_PRODUCTS: usize = 10;

/// Headline numbers for the dashboard.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_products: usize,
    pub total_value: f64,
    pub low_stock_items: usize,
    pub out_of_stock_items: usize,
}

/// Summarize a product collection. An empty slice yields all zeros.
pub fn compute_stats(products: &[Product]) -> DashboardStats {
    let mut stats = DashboardStats {
        total_products: products.len(),
        ..DashboardStats::default()
    };
    for product in products {
        stats.total_value += product.value();
        match product.stock_level() {
            StockLevel::LowStock => stats.low_stock_items += 1,
            StockLevel::OutOfStock => stats.out_of_stock_items += 1,
            StockLevel::InStock => {}
        }
    }
    stats
}

/// Per-category totals.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CategorySummary {
    pub category: Category,
    pub products: usize,
    pub value: f64,
}

/// Product counts per stock level.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct StockSummary {
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
}

/// One entry in the highest-value ranking.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TopProduct {
    pub id: ProductId,
    pub name: String,
    pub value: f64,
    pub quantity: u32,
}

/// Chart-oriented breakdowns of the catalog.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct Analytics {
    /// Categories in order of first appearance.
    pub categories: Vec<CategorySummary>,
    pub stock: StockSummary,
    /// Highest stock value first, at most ten entries.
    pub top_products: Vec<TopProduct>,
    pub most_valuable_category: Option<Category>,
    /// Total stock value divided by product count; zero for an empty catalog.
    pub average_value: f64,
}

/// Build category, stock, and ranking breakdowns.
pub fn compute_analytics(products: &[Product]) -> Analytics {
    let mut categories: Vec<CategorySummary> = Vec::new();
    let mut stock = StockSummary::default();
    let mut total_value = 0.0;

    for product in products {
        let value = product.value();
        total_value += value;
        match categories
            .iter_mut()
            .find(|summary| summary.category == product.category)
        {
            Some(summary) => {
                summary.products += 1;
                summary.value += value;
            }
            None => categories.push(CategorySummary {
                category: product.category,
                products: 1,
                value,
            }),
        }

        match product.stock_level() {
            StockLevel::InStock => stock.in_stock += 1,
            StockLevel::LowStock => stock.low_stock += 1,
            StockLevel::OutOfStock => stock.out_of_stock += 1,
        }
    }

    let mut ranked: Vec<&Product> = products.iter().collect();
    ranked.sort_by(|a, b| b.value().total_cmp(&a.value()));
    let top_products = ranked
        .into_iter()
        .take(TOP_PRODUCTS)
        .map(|product| TopProduct {
            id: product.id.clone(),
            name: product.name.clone(),
            value: product.value(),
            quantity: product.quantity,
        })
        .collect();

    // Ties keep the category that appeared first.
    let most_valuable_category = categories
        .iter()
        .fold(None::<&CategorySummary>, |best, summary| match best {
            Some(best) if best.value >= summary.value => Some(best),
            _ => Some(summary),
        })
        .map(|summary| summary.category);

    #[allow(clippy::cast_precision_loss)]
    let average_value = if products.is_empty() {
        0.0
    } else {
        total_value / products.len() as f64
    };

    Analytics {
        categories,
        stock,
        top_products,
        most_valuable_category,
        average_value,
    }
}
