//! Checkout module.
//!
//! Contains shipping/payment details, order types and the checkout flow
//! state machine.

mod address;
mod details;
mod flow;
mod order;
mod payment;

pub use address::ShippingAddress;
pub use details::CheckoutDetails;
pub use flow::{CheckoutFlow, CheckoutPhase};
pub use order::{OrderConfirmation, OrderLine, OrderStatus, OrderSummary, OrderTotals};
pub use payment::PaymentDetails;
