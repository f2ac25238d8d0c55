//! Product loading.

use crate::backend::BackendError;
use crate::controller::SyncController;
use crate::error::SyncError;
use crate::latest::{Latest, LatestOnly};
use std::sync::Arc;
use storefront_commerce::prelude::*;

/// Loads products for the catalog views.
///
/// A new search cancels the one in flight, as does a new product lookup.
/// Everything loaded is remembered by the cart store, so prices and stock
/// limits stay current.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    sync: SyncController,
    search_gate: LatestOnly,
    product_gate: LatestOnly,
}

impl CatalogLoader {
    pub fn new(sync: SyncController) -> Self {
        Self {
            sync,
            search_gate: LatestOnly::new(),
            product_gate: LatestOnly::new(),
        }
    }

    /// Products matching `filter`, in the filter's sort order.
    pub async fn search(&self, filter: &ProductFilter) -> Result<Latest<Vec<Product>>, SyncError> {
        let backend = Arc::clone(self.sync.backend());
        let query = filter.clone();
        let outcome = self
            .search_gate
            .run(async move { backend.fetch_products(&query).await })
            .await;

        let mut products = match outcome {
            Latest::Current(result) => result.map_err(|e| self.map_error(e))?,
            Latest::Superseded => return Ok(Latest::Superseded),
        };
        filter.sort_products(&mut products);
        tracing::debug!(found = products.len(), "catalog search finished");

        self.sync
            .store()
            .update(|store| store.remember_products(products.iter().cloned()));
        Ok(Latest::Current(products))
    }

    /// One product's current snapshot.
    pub async fn product(&self, product_id: &ProductId) -> Result<Latest<Product>, SyncError> {
        let backend = Arc::clone(self.sync.backend());
        let id = product_id.clone();
        let outcome = self
            .product_gate
            .run(async move { backend.fetch_product(&id).await })
            .await;

        let product = match outcome {
            Latest::Current(result) => result.map_err(|e| self.map_error(e))?,
            Latest::Superseded => return Ok(Latest::Superseded),
        };
        self.sync
            .store()
            .update(|store| store.remember_products([product.clone()]));
        Ok(Latest::Current(product))
    }

    /// Abort any fetch in flight.
    pub fn cancel(&self) {
        self.search_gate.cancel();
        self.product_gate.cancel();
    }

    fn map_error(&self, error: BackendError) -> SyncError {
        if error.is_unauthorized() {
            self.sync.handle_unauthorized()
        } else {
            SyncError::from(error)
        }
    }
}
