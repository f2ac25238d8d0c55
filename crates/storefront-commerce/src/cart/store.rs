//! In-memory cart store.

use crate::cart::{
    compute_breakdown, CartLineItem, CartStatus, PricingBreakdown, PricingConfig,
    MAX_QUANTITY_PER_ITEM,
};
use crate::catalog::{Product, ProductIndex};
use crate::ids::ProductId;
use std::fmt;
use std::sync::Arc;

/// What changed in a [`CartStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// All line items were replaced (server fetch or reconciliation).
    Replaced,
    /// A line was inserted or its quantity changed.
    Upserted {
        product_id: ProductId,
        quantity: u32,
    },
    /// A line was removed.
    Removed { product_id: ProductId },
    /// The cart was emptied and reset to `Open`.
    Cleared,
    /// The status changed.
    StatusChanged(CartStatus),
    /// Known product snapshots were updated.
    ProductsUpdated,
}

/// A change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEvent {
    /// Store revision after the change.
    pub revision: u64,
    /// The change.
    pub change: CartChange,
}

/// Receives change notifications from a [`CartStore`].
///
/// Called synchronously while the store is being mutated; implementations
/// must not call back into the store.
pub trait CartListener: Send + Sync {
    fn cart_changed(&self, event: &CartEvent);
}

impl<F> CartListener for F
where
    F: Fn(&CartEvent) + Send + Sync,
{
    fn cart_changed(&self, event: &CartEvent) {
        self(event)
    }
}

/// The cart of the current session.
///
/// Holds ordered line items (product ids unique), the cart status and the
/// last-known product snapshots used for pricing and stock clamping. Does
/// no I/O.
pub struct CartStore {
    items: Vec<CartLineItem>,
    status: CartStatus,
    products: ProductIndex,
    pricing: PricingConfig,
    revision: u64,
    generation: u64,
    listeners: Vec<Arc<dyn CartListener>>,
}

impl CartStore {
    /// Create an empty, open cart.
    pub fn new(pricing: PricingConfig) -> Self {
        Self {
            items: Vec::new(),
            status: CartStatus::Open,
            products: ProductIndex::new(),
            pricing,
            revision: 0,
            generation: 0,
            listeners: Vec::new(),
        }
    }

    /// Register a change listener.
    pub fn subscribe(&mut self, listener: Arc<dyn CartListener>) {
        self.listeners.push(listener);
    }

    /// Line items in cart order.
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Line for a product, if present.
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    /// Quantity of a product, 0 if absent.
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.line(product_id).map(|i| i.quantity).unwrap_or(0)
    }

    /// Position of a product's line.
    pub fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.items.iter().position(|i| &i.product_id == product_id)
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    /// Set the status. Notifies only if it changed.
    pub fn set_status(&mut self, status: CartStatus) {
        if self.status != status {
            self.status = status;
            self.notify(CartChange::StatusChanged(status));
        }
    }

    /// Incremented on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Incremented on every [`clear`](Self::clear). Work started against an
    /// older generation belongs to a cart that no longer exists.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Known product snapshots.
    pub fn products(&self) -> &ProductIndex {
        &self.products
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Replace all line items.
    ///
    /// Zero-quantity lines are dropped. Duplicate product ids coalesce into
    /// one line at the first position, carrying the last quantity.
    pub fn set_items(&mut self, items: impl IntoIterator<Item = CartLineItem>) {
        let mut coalesced: Vec<CartLineItem> = Vec::new();
        for item in items {
            match coalesced.iter().position(|i| i.product_id == item.product_id) {
                Some(pos) if item.quantity == 0 => {
                    coalesced.remove(pos);
                }
                Some(pos) => coalesced[pos].quantity = item.quantity,
                None if item.quantity == 0 => {}
                None => coalesced.push(item),
            }
        }
        self.items = coalesced;
        self.notify(CartChange::Replaced);
    }

    /// Insert or update a line.
    ///
    /// A quantity of 0 or less removes the line. Otherwise the quantity is
    /// clamped to the product's known stock, and a clamp to 0 removes too.
    /// Returns the stored quantity.
    pub fn upsert_quantity(&mut self, product_id: &ProductId, quantity: i64) -> u32 {
        if quantity <= 0 {
            self.remove_item(product_id);
            return 0;
        }

        let requested = u32::try_from(quantity).unwrap_or(u32::MAX);
        let clamped = self.clamp_quantity(product_id, requested);
        if clamped == 0 {
            self.remove_item(product_id);
            return 0;
        }

        match self.items.iter_mut().find(|i| &i.product_id == product_id) {
            Some(line) if line.quantity == clamped => return clamped,
            Some(line) => line.quantity = clamped,
            None => self.items.push(CartLineItem {
                product_id: product_id.clone(),
                quantity: clamped,
            }),
        }
        self.notify(CartChange::Upserted {
            product_id: product_id.clone(),
            quantity: clamped,
        });
        clamped
    }

    /// Clamp a requested quantity to the product's known stock and the
    /// per-line limit. Products without a snapshot are only capped by the
    /// limit.
    pub fn clamp_quantity(&self, product_id: &ProductId, requested: u32) -> u32 {
        match self.products.get(product_id) {
            Some(product) => product.clamp_quantity(requested),
            None => requested.min(MAX_QUANTITY_PER_ITEM),
        }
    }

    /// Remove a line. Idempotent; returns whether a line was removed.
    pub fn remove_item(&mut self, product_id: &ProductId) -> bool {
        let Some(pos) = self.position(product_id) else {
            return false;
        };
        self.items.remove(pos);
        self.notify(CartChange::Removed {
            product_id: product_id.clone(),
        });
        true
    }

    /// Put a line back the way it was: `Some((position, quantity))`
    /// re-inserts it at that position (or the end if the cart is shorter),
    /// `None` removes it.
    pub fn restore_line(&mut self, product_id: &ProductId, saved: Option<(usize, u32)>) {
        let Some((position, quantity)) = saved.filter(|(_, q)| *q > 0) else {
            self.remove_item(product_id);
            return;
        };

        if let Some(pos) = self.position(product_id) {
            self.items.remove(pos);
        }
        let at = position.min(self.items.len());
        self.items.insert(
            at,
            CartLineItem {
                product_id: product_id.clone(),
                quantity,
            },
        );
        self.notify(CartChange::Upserted {
            product_id: product_id.clone(),
            quantity,
        });
    }

    /// Empty the cart and reset the status to `Open`.
    pub fn clear(&mut self) {
        self.items.clear();
        self.status = CartStatus::Open;
        self.generation += 1;
        self.notify(CartChange::Cleared);
    }

    /// Store product snapshots (newer replaces older).
    pub fn remember_products(&mut self, products: impl IntoIterator<Item = Product>) {
        let before = self.products.len();
        let mut any = false;
        for product in products {
            self.products.remember(product);
            any = true;
        }
        if any {
            tracing::trace!(
                known = self.products.len(),
                added = self.products.len() - before,
                "product snapshots updated"
            );
            self.notify(CartChange::ProductsUpdated);
        }
    }

    /// Sum of all quantities.
    pub fn total_item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Current pricing. Lines without a known product are logged and priced
    /// at zero.
    pub fn breakdown(&self) -> PricingBreakdown {
        let breakdown = compute_breakdown(&self.items, &self.products, &self.pricing);
        for issue in &breakdown.issues {
            tracing::warn!(product_id = %issue.product_id(), %issue, "cart line not priced");
        }
        breakdown
    }

    fn notify(&mut self, change: CartChange) {
        self.revision += 1;
        if self.listeners.is_empty() {
            return;
        }
        let event = CartEvent {
            revision: self.revision,
            change,
        };
        for listener in &self.listeners {
            listener.cart_changed(&event);
        }
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .field("status", &self.status)
            .field("products", &self.products.len())
            .field("revision", &self.revision)
            .field("generation", &self.generation)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
