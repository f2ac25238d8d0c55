//! Checkout submission.

use crate::controller::SyncController;
use crate::error::CheckoutError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use storefront_auth::AuthError;
use storefront_commerce::prelude::*;
use tracing::{info, warn};

/// Drives one checkout at a time: `Idle -> Submitting -> Success | Failed`.
///
/// While an order is being submitted the cart is `Submitting` and refuses
/// quantity changes. A failed submit leaves the cart as it was; nothing is
/// retried automatically.
#[derive(Debug, Clone)]
pub struct CheckoutOrchestrator {
    sync: SyncController,
    flow: Arc<Mutex<CheckoutFlow>>,
}

impl CheckoutOrchestrator {
    pub fn new(sync: SyncController) -> Self {
        Self {
            sync,
            flow: Arc::new(Mutex::new(CheckoutFlow::new())),
        }
    }

    /// Snapshot of the flow state.
    pub fn flow(&self) -> CheckoutFlow {
        self.lock_flow().clone()
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.lock_flow().phase()
    }

    pub fn is_submitting(&self) -> bool {
        self.lock_flow().is_submitting()
    }

    /// Place an order for the current cart.
    pub async fn submit(
        &self,
        details: &CheckoutDetails,
    ) -> Result<OrderConfirmation, CheckoutError> {
        let token = match self.sync.session().bearer_token() {
            Ok(token) => token,
            Err(AuthError::SessionExpired) => {
                self.sync.handle_unauthorized();
                return Err(CheckoutError::SessionExpired);
            }
            Err(_) => return Err(CheckoutError::NotAuthenticated),
        };

        {
            let mut flow = self.lock_flow();
            if flow.is_submitting() {
                return Err(CheckoutError::AlreadySubmitting);
            }
            self.sync.store().update(|store| {
                if store.is_empty() {
                    return Err(CheckoutError::EmptyCart);
                }
                details.validate().map_err(|e| match e {
                    CommerceError::CheckoutIncomplete(missing) => {
                        CheckoutError::IncompleteDetails(missing)
                    }
                    other => CheckoutError::IncompleteDetails(other.to_string()),
                })?;
                flow.begin().map_err(|_| CheckoutError::AlreadySubmitting)?;
                store.set_status(CartStatus::Submitting);
                Ok(())
            })?;
        }

        // The order is placed for the server cart; let queued changes land.
        self.sync.wait_for_pending().await;
        let expected = self.sync.store().read(|store| (!store.is_empty()).then(|| store.breakdown()));
        let Some(expected) = expected else {
            // Every pending change was rolled back.
            self.sync
                .store()
                .update(|store| store.set_status(CartStatus::Open));
            let error = CheckoutError::EmptyCart;
            if let Err(e) = self.lock_flow().fail(error.user_message()) {
                warn!(error = %e, "checkout flow out of step");
            }
            return Err(error);
        };

        info!(
            lines = expected.lines.len(),
            total = %expected.total,
            ship_to = %details.shipping_address.one_line(),
            payment = %details.payment,
            "submitting order"
        );

        let result = self
            .sync
            .backend()
            .finalize_order(&token, &details.shipping_address, &details.payment)
            .await;

        match result {
            Ok(confirmation) => {
                if confirmation.totals.total != expected.total {
                    warn!(
                        order_id = %confirmation.order_id,
                        expected = %expected.total,
                        charged = %confirmation.totals.total,
                        "server total differs from the cart total"
                    );
                }
                if let Err(e) = self.lock_flow().succeed(confirmation.order_id.clone()) {
                    warn!(error = %e, "checkout flow out of step");
                }
                self.sync.store().update(|store| {
                    store.set_status(CartStatus::Finalized);
                    store.clear();
                });
                self.sync.reset();
                info!(order_id = %confirmation.order_id, total = %confirmation.totals.total, "order placed");
                Ok(confirmation)
            }
            Err(e) => {
                let error = if e.is_unauthorized() {
                    self.sync.handle_unauthorized();
                    CheckoutError::SessionExpired
                } else {
                    self.sync
                        .store()
                        .update(|store| store.set_status(CartStatus::Open));
                    CheckoutError::from(e)
                };
                warn!(error = %error, "order not placed");
                if let Err(e) = self.lock_flow().fail(error.user_message()) {
                    warn!(error = %e, "checkout flow out of step");
                }
                Err(error)
            }
        }
    }

    /// Forget the last outcome. Used when the user changes.
    pub fn reset(&self) {
        *self.lock_flow() = CheckoutFlow::new();
    }

    fn lock_flow(&self) -> MutexGuard<'_, CheckoutFlow> {
        self.flow.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
