//! Cart line items and cart status.

use crate::error::CommerceError;
use crate::ids::ProductId;
use serde::{Deserialize, Serialize};

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: u32 = 9999;

/// One product + quantity pairing inside a cart.
///
/// A zero quantity is never represented; the line is removed instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Product being purchased.
    pub product_id: ProductId,
    /// Quantity, at least 1.
    pub quantity: u32,
}

impl CartLineItem {
    /// Create a line item.
    ///
    /// Returns an error if the quantity is zero or above
    /// [`MAX_QUANTITY_PER_ITEM`].
    pub fn new(product_id: ProductId, quantity: u32) -> Result<Self, CommerceError> {
        if quantity == 0 {
            return Err(CommerceError::InvalidQuantity(0));
        }
        if quantity > MAX_QUANTITY_PER_ITEM {
            return Err(CommerceError::QuantityExceedsLimit(
                i64::from(quantity),
                i64::from(MAX_QUANTITY_PER_ITEM),
            ));
        }
        Ok(Self {
            product_id,
            quantity,
        })
    }
}

/// Lifecycle status of the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CartStatus {
    /// Accepting mutations.
    #[default]
    Open,
    /// A finalize request is in flight; quantity controls are disabled.
    Submitting,
    /// The order was placed; the cart is about to be cleared.
    Finalized,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Open => "open",
            CartStatus::Submitting => "submitting",
            CartStatus::Finalized => "finalized",
        }
    }

    /// Check if quantity changes are accepted in this status.
    pub fn accepts_mutations(&self) -> bool {
        matches!(self, CartStatus::Open)
    }
}
