//! Per-user wiring of the cart controllers.

use crate::backend::{CartBackend, HttpCartBackend};
use crate::catalog::CatalogLoader;
use crate::checkout::CheckoutOrchestrator;
use crate::config::StorefrontConfig;
use crate::controller::SyncController;
use crate::error::SyncError;
use crate::orders::OrderHistory;
use crate::shared::SharedCart;
use std::sync::Arc;
use storefront_auth::{AuthSession, SessionHandle};
use storefront_commerce::prelude::*;
use storefront_data::FetchClient;

/// Everything a signed-in storefront needs: one cart store, the session
/// and the controllers that share them.
#[derive(Debug, Clone)]
pub struct ShopSession {
    session: SessionHandle,
    cart: SharedCart,
    sync: SyncController,
    checkout: CheckoutOrchestrator,
    catalog: CatalogLoader,
    orders: OrderHistory,
}

impl ShopSession {
    pub fn new(backend: Arc<dyn CartBackend>, pricing: PricingConfig) -> Self {
        let session = SessionHandle::new();
        let cart = SharedCart::new(CartStore::new(pricing));
        let sync = SyncController::new(backend, session.clone(), cart.clone());
        Self {
            checkout: CheckoutOrchestrator::new(sync.clone()),
            catalog: CatalogLoader::new(sync.clone()),
            orders: OrderHistory::new(sync.clone()),
            session,
            cart,
            sync,
        }
    }

    /// Build a session talking to the configured HTTP backend.
    pub fn from_config(config: &StorefrontConfig) -> Self {
        let client = FetchClient::new()
            .with_base_url(config.backend.base_url.clone())
            .with_timeout(config.backend.timeout());
        let backend = HttpCartBackend::new(client)
            .with_currency(config.pricing.currency)
            .with_line_write_mode(config.backend.line_write_mode);
        Self::new(Arc::new(backend), config.pricing.clone())
    }

    /// Sign in and load the user's cart.
    pub async fn sign_in(&self, session: AuthSession) -> Result<(), SyncError> {
        self.sign_out();
        self.session.sign_in(session);
        tracing::info!(user = ?self.session.user_id(), "signed in");
        self.sync.refresh().await
    }

    /// Sign out, dropping the cart and anything in flight.
    pub fn sign_out(&self) {
        self.catalog.cancel();
        self.orders.cancel();
        self.sync.reset();
        self.checkout.reset();
        self.cart.update(|store| store.clear());
        if self.session.sign_out() {
            tracing::info!("signed out");
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn cart(&self) -> &SharedCart {
        &self.cart
    }

    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    pub fn checkout(&self) -> &CheckoutOrchestrator {
        &self.checkout
    }

    pub fn catalog(&self) -> &CatalogLoader {
        &self.catalog
    }

    pub fn orders(&self) -> &OrderHistory {
        &self.orders
    }
}
