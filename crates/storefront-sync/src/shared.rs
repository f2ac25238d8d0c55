//! The session's cart store, shared between controllers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use storefront_commerce::prelude::*;

/// Shared handle to the session's [`CartStore`].
///
/// Access goes through closures so the lock is never held across an
/// `.await`.
#[derive(Debug, Clone)]
pub struct SharedCart(Arc<Mutex<CartStore>>);

impl SharedCart {
    pub fn new(store: CartStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    /// Read the store.
    pub fn read<R>(&self, f: impl FnOnce(&CartStore) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate the store.
    pub fn update<R>(&self, f: impl FnOnce(&mut CartStore) -> R) -> R {
        f(&mut self.lock())
    }

    /// Line items in cart order.
    pub fn items(&self) -> Vec<CartLineItem> {
        self.read(|store| store.items().to_vec())
    }

    pub fn status(&self) -> CartStatus {
        self.read(|store| store.status())
    }

    pub fn breakdown(&self) -> PricingBreakdown {
        self.read(|store| store.breakdown())
    }

    pub fn total_item_count(&self) -> u64 {
        self.read(|store| store.total_item_count())
    }

    pub fn is_empty(&self) -> bool {
        self.read(|store| store.is_empty())
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CartStore> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SharedCart {
    fn default() -> Self {
        Self::new(CartStore::default())
    }
}
