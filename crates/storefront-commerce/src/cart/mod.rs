//! Shopping cart module.
//!
//! Contains the line item types, the in-memory cart store and the pricing
//! engine.

mod line_item;
mod pricing;
mod store;

pub use line_item::{CartLineItem, CartStatus, MAX_QUANTITY_PER_ITEM};
pub use pricing::{
    compute_breakdown, LinePricing, PricingBreakdown, PricingConfig, PricingIssue, TaxRate,
};
pub use store::{CartChange, CartEvent, CartListener, CartStore};
