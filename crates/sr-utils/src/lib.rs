//! Shared helpers and error types for Stockroom.

use std::path::Path;

use sr_core::Product;
use thiserror::Error;

/// Result type for shared helpers.
pub type UtilsResult<T> = Result<T, UtilsError>;

/// Shared error variants for cross-crate helpers.
#[derive(Debug, Error)]
pub enum UtilsError {
    /// An IO error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

const CSV_HEADER: &str = "SKU,Name,Category,Price,Quantity,Min Stock,Status";

/// Render products as CSV, one row per product in the given order.
///
/// Text columns are double-quoted; numeric columns are bare.
pub fn render_csv(products: &[Product]) -> String {
    let mut lines = Vec::with_capacity(products.len() + 1);
    lines.push(CSV_HEADER.to_string());
    for product in products {
        lines.push(format!(
            "{},{},{},{},{},{},{}",
            quote(&product.sku),
            quote(&product.name),
            quote(product.category.as_str()),
            product.price,
            product.quantity,
            product.min_stock,
            quote(product.status.as_str()),
        ));
    }
    lines.join("\n")
}

/// Write the CSV rendering of `products` to `path`.
pub fn write_csv(path: &Path, products: &[Product]) -> UtilsResult<()> {
    std::fs::write(path, render_csv(products))?;
    Ok(())
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Format an amount as US dollars with thousands separators.
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sr_core::{Category, ProductFormData, ProductId, ProductStatus};
    use tempfile::TempDir;

    fn product(sku: &str, name: &str, category: Category, price: f64, status: ProductStatus) -> Product {
        Product::from_form(
            ProductId::from(sku),
            ProductFormData {
                sku: sku.into(),
                name: name.into(),
                description: None,
                category,
                price,
                quantity: 25,
                min_stock: 5,
                supplier: None,
                image_url: None,
                status,
            },
            Utc::now(),
        )
    }

    #[test]
    fn csv_quotes_text_columns() {
        let products = vec![
            product(
                "LAPTOP-001",
                "Dell \"XPS\" 13",
                Category::Electronics,
                1299.99,
                ProductStatus::Active,
            ),
            product(
                "RAKE-001",
                "Leaf Rake, Steel",
                Category::HomeAndGarden,
                1395.0,
                ProductStatus::Discontinued,
            ),
        ];
        insta::assert_snapshot!(render_csv(&products), @r#"
        SKU,Name,Category,Price,Quantity,Min Stock,Status
        "LAPTOP-001","Dell ""XPS"" 13","Electronics",1299.99,25,5,"active"
        "RAKE-001","Leaf Rake, Steel","Home & Garden",1395,25,5,"discontinued"
        "#);
    }

    #[test]
    fn empty_export_is_just_the_header() {
        assert_eq!(render_csv(&[]), CSV_HEADER);
    }

    #[test]
    fn write_csv_creates_file() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("products.csv");
        write_csv(&path, &[]).expect("write");
        assert_eq!(std::fs::read_to_string(path).expect("read"), CSV_HEADER);
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(99.99), "$99.99");
        assert_eq!(format_currency(1299.99), "$1,299.99");
        assert_eq!(format_currency(1_234_567.5), "$1,234,567.50");
        assert_eq!(format_currency(-50.0), "-$50.00");
    }
}
