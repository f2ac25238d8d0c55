//! Purchase history.

use crate::controller::SyncController;
use crate::error::SyncError;
use crate::latest::{Latest, LatestOnly};
use std::sync::Arc;
use storefront_auth::AuthError;
use storefront_commerce::prelude::*;

/// Loads the signed-in user's past orders, newest first. A new load
/// cancels the one in flight.
#[derive(Debug, Clone)]
pub struct OrderHistory {
    sync: SyncController,
    gate: LatestOnly,
}

impl OrderHistory {
    pub fn new(sync: SyncController) -> Self {
        Self {
            sync,
            gate: LatestOnly::new(),
        }
    }

    pub async fn load(&self) -> Result<Latest<Vec<OrderSummary>>, SyncError> {
        let token = match self.sync.session().bearer_token() {
            Ok(token) => token,
            Err(AuthError::SessionExpired) => return Err(self.sync.handle_unauthorized()),
            Err(_) => return Err(SyncError::NotAuthenticated),
        };

        let backend = Arc::clone(self.sync.backend());
        let outcome = self
            .gate
            .run(async move { backend.fetch_orders(&token).await })
            .await;

        let mut orders = match outcome {
            Latest::Current(Ok(orders)) => orders,
            Latest::Current(Err(e)) if e.is_unauthorized() => {
                return Err(self.sync.handle_unauthorized())
            }
            Latest::Current(Err(e)) => return Err(SyncError::from(e)),
            Latest::Superseded => return Ok(Latest::Superseded),
        };
        orders.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
        tracing::debug!(orders = orders.len(), "order history loaded");
        Ok(Latest::Current(orders))
    }

    pub fn cancel(&self) {
        self.gate.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, LineWriteMode};
    use crate::shared::SharedCart;
    use crate::testing::*;
    use storefront_auth::SessionHandle;

    fn order(id: &str, placed_at: i64) -> OrderSummary {
        let zero = Money::zero(Currency::USD);
        OrderSummary {
            id: OrderId::new(id),
            placed_at,
            status: OrderStatus::Confirmed,
            totals: OrderTotals {
                subtotal: zero,
                tax: zero,
                shipping: zero,
                total: zero,
            },
            lines: Vec::new(),
        }
    }

    fn history(backend: &ScriptedBackend, session: SessionHandle) -> OrderHistory {
        let sync = SyncController::new(Arc::new(backend.clone()), session, SharedCart::default());
        OrderHistory::new(sync)
    }

    #[tokio::test]
    async fn test_orders_newest_first() {
        let backend = ScriptedBackend::new(LineWriteMode::Additive)
            .with_orders(vec![order("o-1", 100), order("o-3", 300), order("o-2", 200)]);
        let orders = history(&backend, signed_in_session())
            .load()
            .await
            .unwrap()
            .into_current()
            .unwrap();

        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["o-3", "o-2", "o-1"]);
    }

    #[tokio::test]
    async fn test_requires_sign_in() {
        let backend = ScriptedBackend::new(LineWriteMode::Additive);
        let err = history(&backend, SessionHandle::new()).load().await.unwrap_err();
        assert_eq!(err, SyncError::NotAuthenticated);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_signs_out() {
        let backend = ScriptedBackend::new(LineWriteMode::Additive);
        backend.fail_next(CallKind::FetchOrders, BackendError::Unauthorized);
        let session = signed_in_session();

        let err = history(&backend, session.clone()).load().await.unwrap_err();
        assert_eq!(err, SyncError::SessionExpired);
        assert!(!session.is_authenticated());
    }
}
