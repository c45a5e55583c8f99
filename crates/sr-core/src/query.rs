//! Listing filters and sort orders.

use std::cmp::Ordering;

use crate::{Category, Product, StockLevel};

/// Stock-position filter for listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StockFilter {
    #[default]
    All,
    InStock,
    LowStock,
    OutOfStock,
}

impl StockFilter {
    fn matches(self, product: &Product) -> bool {
        match self {
            StockFilter::All => true,
            StockFilter::InStock => product.stock_level() == StockLevel::InStock,
            StockFilter::LowStock => product.stock_level() == StockLevel::LowStock,
            StockFilter::OutOfStock => product.stock_level() == StockLevel::OutOfStock,
        }
    }
}

/// Column to sort a listing by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortField {
    Sku,
    #[default]
    Name,
    Category,
    Price,
    Quantity,
    Status,
    UpdatedAt,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Search, filter, and sort options for a product listing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductQuery {
    /// Case-insensitive match against name, SKU, or category.
    pub search: Option<String>,
    pub category: Option<Category>,
    pub stock: StockFilter,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl ProductQuery {
    /// Whether a single product passes every filter.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                let needle = search.to_lowercase();
                let hit = product.name.to_lowercase().contains(&needle)
                    || product.sku.to_lowercase().contains(&needle)
                    || product.category.as_str().to_lowercase().contains(&needle);
                if !hit {
                    return false;
                }
            }
        }
        if let Some(category) = self.category {
            if product.category != category {
                return false;
            }
        }
        self.stock.matches(product)
    }

    /// Filter then sort. Equal keys keep their storage order.
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let mut filtered: Vec<Product> = products
            .into_iter()
            .filter(|product| self.matches(product))
            .collect();
        filtered.sort_by(|a, b| {
            let ordering = compare(self.sort, a, b);
            match self.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        filtered
    }
}

fn compare(field: SortField, a: &Product, b: &Product) -> Ordering {
    match field {
        SortField::Sku => a.sku.cmp(&b.sku),
        SortField::Name => a.name.cmp(&b.name),
        SortField::Category => a.category.as_str().cmp(b.category.as_str()),
        SortField::Price => a.price.total_cmp(&b.price),
        SortField::Quantity => a.quantity.cmp(&b.quantity),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{ProductFormData, ProductId, ProductStatus};

    fn product(sku: &str, name: &str, category: Category, price: f64, quantity: u32) -> Product {
        Product::from_form(
            ProductId::from(sku),
            ProductFormData {
                sku: sku.into(),
                name: name.into(),
                description: None,
                category,
                price,
                quantity,
                min_stock: 5,
                supplier: None,
                image_url: None,
                status: ProductStatus::Active,
            },
            Utc::now(),
        )
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("LAPTOP-001", "Dell XPS 13 Laptop", Category::Electronics, 1299.99, 25),
            product("MOUSE-001", "Logitech MX Master 3", Category::Electronics, 99.99, 3),
            product("CHAIR-001", "Herman Miller Aeron", Category::Furniture, 1395.0, 0),
        ]
    }

    fn skus(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.sku.as_str()).collect()
    }

    #[test]
    fn default_query_sorts_by_name() {
        let result = ProductQuery::default().apply(catalog());
        assert_eq!(skus(&result), vec!["LAPTOP-001", "CHAIR-001", "MOUSE-001"]);
    }

    #[test]
    fn search_matches_name_sku_and_category() {
        let query = ProductQuery {
            search: Some("furn".into()),
            ..ProductQuery::default()
        };
        assert_eq!(skus(&query.apply(catalog())), vec!["CHAIR-001"]);

        let query = ProductQuery {
            search: Some("mouse".into()),
            ..ProductQuery::default()
        };
        assert_eq!(skus(&query.apply(catalog())), vec!["MOUSE-001"]);
    }

    #[test]
    fn stock_and_category_filters_combine() {
        let query = ProductQuery {
            category: Some(Category::Electronics),
            stock: StockFilter::LowStock,
            ..ProductQuery::default()
        };
        assert_eq!(skus(&query.apply(catalog())), vec!["MOUSE-001"]);

        let query = ProductQuery {
            stock: StockFilter::OutOfStock,
            ..ProductQuery::default()
        };
        assert_eq!(skus(&query.apply(catalog())), vec!["CHAIR-001"]);
    }

    #[test]
    fn price_sort_descending() {
        let query = ProductQuery {
            sort: SortField::Price,
            direction: SortDirection::Desc,
            ..ProductQuery::default()
        };
        assert_eq!(
            skus(&query.apply(catalog())),
            vec!["CHAIR-001", "LAPTOP-001", "MOUSE-001"]
        );
    }
}
