//! Last-known product snapshots held next to the cart.

use crate::catalog::{Product, ProductLookup};
use crate::ids::ProductId;
use std::collections::HashMap;

/// Map of product id to the most recent snapshot seen from the backend.
///
/// Snapshots arrive from catalog fetches and from cart responses that embed
/// product data; newer snapshots replace older ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductIndex {
    products: HashMap<ProductId, Product>,
}

impl ProductIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace a snapshot.
    pub fn remember(&mut self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    /// Store or replace several snapshots.
    pub fn remember_all(&mut self, products: impl IntoIterator<Item = Product>) {
        for product in products {
            self.remember(product);
        }
    }

    /// Get a snapshot.
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    /// Last known available stock, if the product is known.
    pub fn available_stock(&self, id: &ProductId) -> Option<u32> {
        self.products.get(id).map(|p| p.stock)
    }

    /// Number of known products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Check if no product is known.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Forget every snapshot.
    pub fn clear(&mut self) {
        self.products.clear();
    }
}

impl ProductLookup for ProductIndex {
    fn product(&self, id: &ProductId) -> Option<&Product> {
        self.get(id)
    }
}

impl FromIterator<Product> for ProductIndex {
    fn from_iter<T: IntoIterator<Item = Product>>(iter: T) -> Self {
        let mut index = Self::new();
        index.remember_all(iter);
        index
    }
}
