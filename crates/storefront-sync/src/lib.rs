//! Optimistic cart synchronisation and checkout for the storefront client.
//!
//! The local [`CartStore`](storefront_commerce::cart::CartStore) is updated
//! the moment the user changes a quantity; the backend is the authority and
//! its answer replaces the local state once it arrives.
//!
//! - [`SyncController`]: quantity changes, refresh, clearing, rollback
//! - [`CheckoutOrchestrator`]: order submission
//! - [`CatalogLoader`] / [`OrderHistory`]: latest-wins list fetches
//! - [`ShopSession`]: one user's store, session and controllers wired
//!   together
//! - [`CartBackend`]: the backend seam, with [`HttpCartBackend`] for the
//!   REST API
//!
//! # Example
//!
//! ```rust,no_run
//! use storefront_auth::{AuthSession, BearerToken};
//! use storefront_commerce::prelude::*;
//! use storefront_sync::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let shop = ShopSession::from_config(&StorefrontConfig::default());
//! shop.sign_in(AuthSession::new(BearerToken::new("token")?)).await?;
//!
//! shop.sync().add(&ProductId::new("lamp"), 2).await?;
//! println!("total: {}", shop.cart().breakdown().total);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod controller;
pub mod error;
pub mod latest;
pub mod orders;
pub mod session;
pub mod shared;

mod sequence;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BackendError, CartBackend, HttpCartBackend, LineWriteMode, RemoteCart};
pub use catalog::CatalogLoader;
pub use checkout::CheckoutOrchestrator;
pub use config::{BackendConfig, ConfigError, StorefrontConfig};
pub use controller::SyncController;
pub use error::{CheckoutError, SyncError};
pub use latest::{Latest, LatestOnly};
pub use orders::OrderHistory;
pub use session::ShopSession;
pub use shared::SharedCart;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::backend::{BackendError, CartBackend, HttpCartBackend, LineWriteMode, RemoteCart};
    pub use crate::catalog::CatalogLoader;
    pub use crate::checkout::CheckoutOrchestrator;
    pub use crate::config::{BackendConfig, ConfigError, StorefrontConfig};
    pub use crate::controller::SyncController;
    pub use crate::error::{CheckoutError, SyncError};
    pub use crate::latest::{Latest, LatestOnly};
    pub use crate::orders::OrderHistory;
    pub use crate::session::ShopSession;
    pub use crate::shared::SharedCart;
}
