//! What the customer submits at checkout.

use crate::checkout::{PaymentDetails, ShippingAddress};
use crate::error::CommerceError;
use serde::{Deserialize, Serialize};

/// Shipping and payment details for one finalize request.
///
/// The line items are not part of it: the backend finalizes its own
/// authoritative cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub shipping_address: ShippingAddress,
    pub payment: PaymentDetails,
}

impl CheckoutDetails {
    pub fn new(shipping_address: ShippingAddress, payment: PaymentDetails) -> Self {
        Self {
            shipping_address,
            payment,
        }
    }

    /// Check that every required field is filled in.
    pub fn validate(&self) -> Result<(), CommerceError> {
        let mut missing = self.shipping_address.missing_fields();
        if !self.payment.is_complete() {
            missing.push("payment method");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CommerceError::CheckoutIncomplete(missing.join(", ")))
        }
    }
}
