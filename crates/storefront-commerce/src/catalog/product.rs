//! Product snapshots.

use crate::cart::MAX_QUANTITY_PER_ITEM;
use crate::catalog::Category;
use crate::ids::ProductId;
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A product as last returned by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Unit price.
    pub price: Money,
    /// Category, selects the tax rate.
    pub category: Category,
    /// Units available for purchase.
    pub stock: u32,
    /// Image reference (URL or asset key).
    pub image: Option<String>,
}

impl Product {
    /// Create a product with no stock and no image.
    pub fn new(
        id: ProductId,
        title: impl Into<String>,
        price: Money,
        category: Category,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            price,
            category,
            stock: 0,
            image: None,
        }
    }

    /// Set the available stock.
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    /// Set the image reference.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Check if at least one unit is available.
    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Check if a specific quantity is available.
    pub fn can_fulfill(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }

    /// Clamp a requested quantity to what can actually be bought.
    pub fn clamp_quantity(&self, quantity: u32) -> u32 {
        quantity.min(self.stock).min(MAX_QUANTITY_PER_ITEM)
    }
}

/// Lookup from product id to its last known snapshot.
///
/// This is the pricing engine's only view of the catalog.
pub trait ProductLookup {
    /// Find a product by id.
    fn product(&self, id: &ProductId) -> Option<&Product>;
}

impl ProductLookup for HashMap<ProductId, Product> {
    fn product(&self, id: &ProductId) -> Option<&Product> {
        self.get(id)
    }
}

impl ProductLookup for [Product] {
    fn product(&self, id: &ProductId) -> Option<&Product> {
        self.iter().find(|p| &p.id == id)
    }
}

impl ProductLookup for Vec<Product> {
    fn product(&self, id: &ProductId) -> Option<&Product> {
        self.as_slice().product(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn lamp() -> Product {
        Product::new(
            ProductId::new("lamp"),
            "Desk lamp",
            Money::new(2500, Currency::USD),
            Category::new("home"),
        )
        .with_stock(3)
    }

    #[test]
    fn test_product_stock_checks() {
        let product = lamp();
        assert!(product.is_in_stock());
        assert!(product.can_fulfill(3));
        assert!(!product.can_fulfill(4));
        assert!(!product.clone().with_stock(0).is_in_stock());
    }

    #[test]
    fn test_clamp_quantity() {
        let product = lamp();
        assert_eq!(product.clamp_quantity(2), 2);
        assert_eq!(product.clamp_quantity(10), 3);
    }

    #[test]
    fn test_slice_lookup() {
        let products = vec![lamp()];
        assert!(products.product(&ProductId::new("lamp")).is_some());
        assert!(products.product(&ProductId::new("missing")).is_none());
    }
}
