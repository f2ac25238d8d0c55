//! Cart, pricing and checkout domain types for the storefront client.
//!
//! This crate holds everything about the cart that does not touch the
//! network:
//!
//! - **Catalog**: product snapshots, categories, search filters and the
//!   product index the cart prices against
//! - **Cart**: line items, the [`CartStore`](cart::CartStore) and the pure
//!   pricing engine ([`compute_breakdown`](cart::compute_breakdown))
//! - **Checkout**: shipping/payment details, order confirmations, purchase
//!   history entries and the checkout flow state machine
//!
//! # Example
//!
//! ```rust
//! use storefront_commerce::prelude::*;
//!
//! let mut store = CartStore::new(PricingConfig::default());
//! store.remember_products([Product::new(
//!     ProductId::new("lamp"),
//!     "Desk lamp",
//!     Money::new(10000, Currency::USD),
//!     Category::new("default"),
//! )
//! .with_stock(10)]);
//!
//! store.upsert_quantity(&ProductId::new("lamp"), 2);
//!
//! let breakdown = store.breakdown();
//! assert_eq!(breakdown.total.display(), "$292.00");
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod checkout;

pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{
        Category, Product, ProductFilter, ProductIndex, ProductLookup, SortOption,
    };

    // Cart
    pub use crate::cart::{
        compute_breakdown, CartChange, CartEvent, CartLineItem, CartListener, CartStatus,
        CartStore, LinePricing, PricingBreakdown, PricingConfig, PricingIssue, TaxRate,
    };

    // Checkout
    pub use crate::checkout::{
        CheckoutDetails, CheckoutFlow, CheckoutPhase, OrderConfirmation, OrderLine,
        OrderStatus, OrderSummary, OrderTotals, PaymentDetails, ShippingAddress,
    };
}
