//! Optimistic cart synchronisation.
//!
//! Every quantity change is applied to the local store first, then queued
//! for the backend; changes are sent one at a time, in order. The backend
//! answers with the whole cart, which replaces the local state except for
//! products with other changes pending. A failed request puts the line back
//! the way the server last reported it.

use crate::backend::{BackendError, CartBackend, LineWriteMode, RemoteCart};
use crate::error::SyncError;
use crate::latest::{Latest, LatestOnly};
use crate::sequence::{MutationTracker, QueuePlace, Settlement, Ticket};
use futures::future::join_all;
use crate::shared::SharedCart;
use std::sync::{Arc, Mutex, PoisonError};
use storefront_auth::{AuthError, BearerToken, SessionHandle};
use storefront_commerce::prelude::*;
use tracing::{debug, info, warn};

/// Backend calls one quantity change turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineCall {
    /// `add_or_set_line` with this quantity (a delta in additive mode).
    Upsert(u32),
    Remove,
    /// Lowering a quantity on an additive backend: remove the line, then
    /// add the target back. One intent, one sequence number.
    RemoveThenAdd(u32),
}

impl LineCall {
    /// Calls that take the server's line from `server` to `target` units.
    fn plan(mode: LineWriteMode, server: u32, target: u32) -> Option<Self> {
        match mode {
            _ if target == server => None,
            _ if target == 0 => Some(LineCall::Remove),
            LineWriteMode::Absolute => Some(LineCall::Upsert(target)),
            LineWriteMode::Additive if target > server => Some(LineCall::Upsert(target - server)),
            LineWriteMode::Additive => Some(LineCall::RemoveThenAdd(target)),
        }
    }
}

/// A failed line call. `partial` is set when the remove of a
/// [`LineCall::RemoveThenAdd`] went through but the add did not.
#[derive(Debug)]
struct LineFailure {
    error: BackendError,
    partial: bool,
}

impl From<BackendError> for LineFailure {
    fn from(error: BackendError) -> Self {
        Self {
            error,
            partial: false,
        }
    }
}

/// Keeps the session's cart store in step with the backend.
///
/// Cloning is cheap; clones share the store and the request bookkeeping.
#[derive(Clone)]
pub struct SyncController {
    backend: Arc<dyn CartBackend>,
    session: SessionHandle,
    cart: SharedCart,
    tracker: Arc<Mutex<MutationTracker>>,
    refresh_gate: LatestOnly,
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("mode", &self.mode())
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}

impl SyncController {
    pub fn new(backend: Arc<dyn CartBackend>, session: SessionHandle, cart: SharedCart) -> Self {
        Self {
            backend,
            session,
            cart,
            tracker: Arc::new(Mutex::new(MutationTracker::new())),
            refresh_gate: LatestOnly::new(),
        }
    }

    /// The store this controller writes to.
    pub fn store(&self) -> &SharedCart {
        &self.cart
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn mode(&self) -> LineWriteMode {
        self.backend.line_write_mode()
    }

    pub(crate) fn backend(&self) -> &Arc<dyn CartBackend> {
        &self.backend
    }

    /// Add `quantity` units of a product.
    pub async fn add(&self, product_id: &ProductId, quantity: u32) -> Result<u32, SyncError> {
        let current = self.cart.read(|store| store.quantity_of(product_id));
        let target = i64::from(current) + i64::from(quantity);
        self.set_quantity(product_id, target).await
    }

    /// Add one unit.
    pub async fn increase(&self, product_id: &ProductId) -> Result<u32, SyncError> {
        self.add(product_id, 1).await
    }

    /// Remove one unit. Going from 1 to 0 removes the line.
    pub async fn decrease(&self, product_id: &ProductId) -> Result<u32, SyncError> {
        let current = self.cart.read(|store| store.quantity_of(product_id));
        if current == 0 {
            self.token()?;
            return Ok(0);
        }
        self.set_quantity(product_id, i64::from(current) - 1).await
    }

    pub async fn remove(&self, product_id: &ProductId) -> Result<u32, SyncError> {
        self.set_quantity(product_id, 0).await
    }

    /// Set a product's quantity. Zero or less removes the line; otherwise
    /// the quantity is clamped to the known stock.
    ///
    /// The store changes at once. The backend call waits for earlier
    /// changes to be answered and is skipped if a newer change to the same
    /// product is made meanwhile. Returns the quantity held locally once the
    /// change settled.
    pub async fn set_quantity(&self, product_id: &ProductId, quantity: i64) -> Result<u32, SyncError> {
        let token = self.token()?;
        let mode = self.mode();
        if quantity > 0 && self.cart.status().accepts_mutations() {
            self.ensure_product(product_id).await;
        }

        let issued = self.with_state(|tracker, store| {
            if !store.status().accepts_mutations() {
                return Err(SyncError::CheckoutInProgress);
            }
            let current = store.quantity_of(product_id);
            let target = if quantity <= 0 {
                0
            } else {
                store.clamp_quantity(product_id, u32::try_from(quantity).unwrap_or(u32::MAX))
            };
            if target == current {
                return Ok(Err(current));
            }

            let (ticket, place) = tracker.begin_line(store, product_id);
            store.upsert_quantity(product_id, i64::from(target));
            debug!(
                product_id = %product_id,
                seq = ticket.seq,
                quantity = target,
                pending = tracker.in_flight(product_id),
                "cart line change queued"
            );
            Ok(Ok((ticket, place, target)))
        })?;

        let (ticket, place, target) = match issued {
            Ok(issued) => issued,
            Err(unchanged) => return Ok(unchanged),
        };

        place.ready().await;

        let call = self.with_state(|tracker, store| {
            let call = if tracker.is_current(&ticket, store) && tracker.is_latest(&ticket) {
                LineCall::plan(mode, tracker.server_quantity(product_id), target)
            } else {
                None
            };
            if call.is_none() {
                tracker.finish_line(&ticket, true);
            }
            call
        });
        let Some(call) = call else {
            debug!(product_id = %product_id, seq = ticket.seq, "cart line change needs no request");
            return Ok(self.cart.read(|store| store.quantity_of(product_id)));
        };

        debug!(product_id = %product_id, seq = ticket.seq, call = ?call, "cart line request sent");
        let result = self.send_line(&token, product_id, call).await;
        self.settle_line(&ticket, product_id, result, place).await
    }

    async fn send_line(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
        call: LineCall,
    ) -> Result<RemoteCart, LineFailure> {
        match call {
            LineCall::Upsert(quantity) => Ok(self
                .backend
                .add_or_set_line(token, product_id, quantity)
                .await?),
            LineCall::Remove => Ok(self.backend.remove_line(token, product_id).await?),
            LineCall::RemoveThenAdd(quantity) => {
                self.backend.remove_line(token, product_id).await?;
                self.backend
                    .add_or_set_line(token, product_id, quantity)
                    .await
                    .map_err(|error| LineFailure {
                        partial: !error.is_unauthorized(),
                        error,
                    })
            }
        }
    }

    /// Apply the answer to a line request, then let the next queued change
    /// go.
    async fn settle_line(
        &self,
        ticket: &Ticket,
        product_id: &ProductId,
        result: Result<RemoteCart, LineFailure>,
        place: QueuePlace,
    ) -> Result<u32, SyncError> {
        let failure = match result {
            Ok(remote) => {
                self.with_state(|tracker, store| {
                    if tracker.is_current(ticket, store) {
                        tracker.reconcile(store, ticket, remote);
                    } else {
                        debug!(seq = ticket.seq, "response for a discarded cart dropped");
                    }
                    tracker.finish_line(ticket, true);
                });
                drop(place);
                return Ok(self.cart.read(|store| store.quantity_of(product_id)));
            }
            Err(failure) => failure,
        };

        if failure.error.is_unauthorized() {
            drop(place);
            return Err(self.handle_unauthorized());
        }

        let refetch = self.with_state(|tracker, store| {
            if failure.partial {
                tracker.record_removed(ticket);
            }
            let current = tracker.is_current(ticket, store);
            let settlement = tracker.finish_line(ticket, false);
            if !current {
                return false;
            }
            match settlement {
                Settlement::Restore(saved) => {
                    warn!(product_id = %product_id, error = %failure.error, "cart change rolled back");
                    store.restore_line(product_id, saved);
                }
                Settlement::Superseded => {
                    debug!(product_id = %product_id, error = %failure.error, "failed change already superseded");
                }
                Settlement::Settled => {}
            }
            if failure.partial {
                warn!(product_id = %product_id, "line removed but not re-added; refetching cart");
            }
            failure.partial
        });
        drop(place);
        if refetch {
            self.refetch().await;
        }

        Err(SyncError::from(failure.error))
    }

    /// Empty the cart. Queued behind pending line changes like any other
    /// mutation.
    pub async fn clear_cart(&self) -> Result<(), SyncError> {
        let token = self.token()?;
        let (ticket, place) = self.with_state(|tracker, store| {
            if !store.status().accepts_mutations() {
                return Err(SyncError::CheckoutInProgress);
            }
            let issued = tracker.begin_cart_wide(store);
            store.set_items(Vec::new());
            Ok(issued)
        })?;

        debug!(seq = ticket.seq, "cart clear queued");
        place.ready().await;

        let current = self.with_state(|tracker, store| {
            let current = tracker.is_current(&ticket, store);
            if !current {
                tracker.finish_cart_wide(&ticket, true);
            }
            current
        });
        if !current {
            return Ok(());
        }

        let result = self.backend.clear_cart(&token).await;
        let outcome = match result {
            Ok(remote) => {
                self.with_state(|tracker, store| {
                    if tracker.is_current(&ticket, store) {
                        tracker.reconcile(store, &ticket, remote);
                    }
                    tracker.finish_cart_wide(&ticket, true);
                });
                Ok(())
            }
            Err(e) if e.is_unauthorized() => Err(self.handle_unauthorized()),
            Err(e) => {
                warn!(error = %e, "cart clear rolled back");
                self.with_state(|tracker, store| {
                    let current = tracker.is_current(&ticket, store);
                    for (product_id, saved) in tracker.finish_cart_wide(&ticket, false) {
                        if current {
                            store.restore_line(&product_id, saved);
                        }
                    }
                });
                Err(SyncError::from(e))
            }
        };
        drop(place);
        outcome
    }

    /// Wait until every queued cart change has been answered.
    pub(crate) async fn wait_for_pending(&self) {
        let place = self.with_state(|tracker, _| tracker.join_queue());
        place.ready().await;
    }

    /// Fetch the authoritative cart. A newer refresh aborts this one, in
    /// which case this returns `Ok` without touching the store.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        let token = self.token()?;
        let ticket = self.with_state(|tracker, store| tracker.begin_snapshot(store));

        let backend = Arc::clone(&self.backend);
        let outcome = self
            .refresh_gate
            .run(async move { backend.fetch_cart(&token).await })
            .await;
        let result = match outcome {
            Latest::Current(result) => result,
            Latest::Superseded => {
                debug!(seq = ticket.seq, "cart refresh superseded");
                return Ok(());
            }
        };

        match result {
            Ok(remote) => {
                let applied = self.with_state(|tracker, store| {
                    if !tracker.is_current(&ticket, store) {
                        return false;
                    }
                    tracker.reconcile(store, &ticket, remote);
                    true
                });
                if applied {
                    self.fill_products().await;
                    info!(lines = self.cart.read(|store| store.len()), "cart refreshed");
                }
                Ok(())
            }
            Err(e) if e.is_unauthorized() => Err(self.handle_unauthorized()),
            Err(e) => {
                warn!(error = %e, "cart refresh failed");
                Err(SyncError::from(e))
            }
        }
    }

    /// Fetch the product snapshot if the store has none, so the quantity
    /// can be clamped to stock.
    async fn ensure_product(&self, product_id: &ProductId) {
        if self.cart.read(|store| store.products().get(product_id).is_some()) {
            return;
        }
        match self.backend.fetch_product(product_id).await {
            Ok(product) => self.cart.update(|store| store.remember_products([product])),
            Err(e) => warn!(
                product_id = %product_id,
                error = %e,
                "product details unavailable; quantity not checked against stock"
            ),
        }
    }

    /// Fetch snapshots for cart lines whose product the store doesn't know,
    /// so they are priced.
    async fn fill_products(&self) {
        let missing: Vec<ProductId> = self.cart.read(|store| {
            store
                .items()
                .iter()
                .filter(|item| store.products().get(&item.product_id).is_none())
                .map(|item| item.product_id.clone())
                .collect()
        });
        if missing.is_empty() {
            return;
        }

        let results = join_all(missing.iter().map(|id| self.backend.fetch_product(id))).await;
        let mut found = Vec::with_capacity(missing.len());
        for (product_id, result) in missing.iter().zip(results) {
            match result {
                Ok(product) => found.push(product),
                Err(e) => warn!(product_id = %product_id, error = %e, "product details unavailable"),
            }
        }
        debug!(missing = missing.len(), fetched = found.len(), "cart products filled in");
        self.cart.update(|store| store.remember_products(found));
    }

    async fn refetch(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "cart refetch failed; local cart may be out of date");
        }
    }

    /// Forget pending requests. Responses to them are dropped.
    pub fn reset(&self) {
        self.refresh_gate.cancel();
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }

    /// The backend rejected the session: invalidate it, drop the cart and
    /// everything pending.
    pub(crate) fn handle_unauthorized(&self) -> SyncError {
        warn!("backend rejected the session; signing out");
        self.session.invalidate();
        self.refresh_gate.cancel();
        self.with_state(|tracker, store| {
            tracker.reset();
            store.clear();
        });
        SyncError::SessionExpired
    }

    fn token(&self) -> Result<BearerToken, SyncError> {
        match self.session.bearer_token() {
            Ok(token) => Ok(token),
            Err(AuthError::SessionExpired) => Err(self.handle_unauthorized()),
            Err(_) => Err(SyncError::NotAuthenticated),
        }
    }

    /// Run `f` with the tracker and the store locked, in that order.
    fn with_state<R>(&self, f: impl FnOnce(&mut MutationTracker, &mut CartStore) -> R) -> R {
        let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
        let mut store = self.cart.lock();
        f(&mut tracker, &mut store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn setup(mode: LineWriteMode, stock: u32) -> (ScriptedBackend, SyncController) {
        let backend = ScriptedBackend::new(mode);
        let cart = SharedCart::default();
        cart.update(|store| {
            store.remember_products([
                product("a", 1_000, "default", stock),
                product("b", 2_000, "default", stock),
                product("c", 3_000, "default", stock),
            ])
        });
        let controller =
            SyncController::new(Arc::new(backend.clone()), signed_in_session(), cart);
        (backend, controller)
    }

    fn pid(id: &str) -> ProductId {
        ProductId::new(id)
    }

    fn transport() -> BackendError {
        BackendError::Transport("connection reset".to_string())
    }

    #[tokio::test]
    async fn test_add_commits_server_state() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);

        assert_eq!(controller.add(&pid("a"), 2).await.unwrap(), 2);
        assert_eq!(controller.increase(&pid("a")).await.unwrap(), 3);

        assert_eq!(quantities(&backend.server_items()), vec![("a".to_string(), 3)]);
        assert_eq!(
            backend.calls().last().map(|c| c.quantity),
            Some(Some(1)),
            "additive backend receives the delta"
        );
    }

    #[tokio::test]
    async fn test_absolute_backend_receives_target() {
        let (backend, controller) = setup(LineWriteMode::Absolute, 10);
        controller.set_quantity(&pid("a"), 4).await.unwrap();
        controller.set_quantity(&pid("a"), 2).await.unwrap();

        assert_eq!(backend.count(CallKind::AddOrSet), 2);
        assert_eq!(backend.count(CallKind::Remove), 0);
        assert_eq!(quantities(&controller.store().items()), vec![("a".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_quantity_clamped_to_stock() {
        let (backend, controller) = setup(LineWriteMode::Absolute, 3);
        assert_eq!(controller.set_quantity(&pid("a"), 8).await.unwrap(), 3);
        assert_eq!(backend.calls()[0].quantity, Some(3));
    }

    #[tokio::test]
    async fn test_unchanged_quantity_makes_no_call() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        controller.set_quantity(&pid("a"), 2).await.unwrap();
        controller.set_quantity(&pid("a"), 2).await.unwrap();
        controller.remove(&pid("b")).await.unwrap();
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_set_zero_equals_remove() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        controller.set_quantity(&pid("a"), 2).await.unwrap();
        controller.set_quantity(&pid("b"), 1).await.unwrap();

        assert_eq!(controller.set_quantity(&pid("a"), 0).await.unwrap(), 0);
        assert_eq!(controller.remove(&pid("b")).await.unwrap(), 0);

        assert!(controller.store().is_empty());
        assert_eq!(backend.count(CallKind::Remove), 2);
    }

    #[tokio::test]
    async fn test_decrease_to_zero_is_single_remove() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        controller.add(&pid("a"), 1).await.unwrap();

        assert_eq!(controller.decrease(&pid("a")).await.unwrap(), 0);
        assert_eq!(backend.count(CallKind::Remove), 1);
        assert_eq!(backend.count(CallKind::AddOrSet), 1);
    }

    #[tokio::test]
    async fn test_decrease_is_remove_then_add() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        controller.add(&pid("a"), 3).await.unwrap();

        assert_eq!(controller.decrease(&pid("a")).await.unwrap(), 2);

        let calls = backend.calls();
        assert_eq!(calls[1].kind, CallKind::Remove);
        assert_eq!(calls[2].kind, CallKind::AddOrSet);
        assert_eq!(calls[2].quantity, Some(2));
        assert_eq!(quantities(&backend.server_items()), vec![("a".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_failed_readd_forces_refetch() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        controller.add(&pid("a"), 3).await.unwrap();
        backend.fail_next(CallKind::AddOrSet, transport());

        let err = controller.decrease(&pid("a")).await.unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));

        // The remove went through, so the server no longer has the line.
        assert_eq!(backend.count(CallKind::FetchCart), 1);
        assert!(controller.store().is_empty());
    }

    #[tokio::test]
    async fn test_failure_rolls_back_in_place() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        controller.add(&pid("a"), 1).await.unwrap();
        controller.add(&pid("b"), 2).await.unwrap();
        controller.add(&pid("c"), 1).await.unwrap();

        backend.fail_next(CallKind::Remove, transport());
        let err = controller.remove(&pid("b")).await.unwrap_err();

        assert!(matches!(err, SyncError::Network(_)));
        assert_eq!(
            quantities(&controller.store().items()),
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 2),
                ("c".to_string(), 1)
            ]
        );
    }

    #[tokio::test]
    async fn test_rejection_message_surfaced() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        backend.fail_next(
            CallKind::AddOrSet,
            BackendError::Rejected {
                status: 409,
                message: "Only 2 left".to_string(),
            },
        );

        let err = controller.add(&pid("a"), 1).await.unwrap_err();
        assert_eq!(err.user_message(), "Only 2 left");
        assert!(controller.store().is_empty());
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_same_product_changes_reach_server_in_order() {
        let (backend, controller) = setup(LineWriteMode::Absolute, 10);
        backend.hold_requests();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.set_quantity(&pid("a"), 3).await })
        };
        backend.wait_for_held(1).await;
        let second = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.set_quantity(&pid("a"), 5).await })
        };
        settle().await;

        // The second change waits for the first to be answered.
        assert_eq!(backend.count(CallKind::AddOrSet), 1);
        assert_eq!(controller.store().read(|s| s.quantity_of(&pid("a"))), 5);

        backend.release(0);
        assert_eq!(first.await.unwrap().unwrap(), 5);
        backend.wait_for_held(2).await;
        backend.release(1);
        assert_eq!(second.await.unwrap().unwrap(), 5);

        let sent: Vec<_> = backend.calls().iter().map(|c| c.quantity).collect();
        assert_eq!(sent, vec![Some(3), Some(5)]);
        assert_eq!(quantities(&backend.server_items()), vec![("a".to_string(), 5)]);
        assert_eq!(quantities(&controller.store().items()), vec![("a".to_string(), 5)]);
    }

    #[tokio::test]
    async fn test_quick_additions_coalesce_into_one_request() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        backend.hold_requests();

        let mut tasks = Vec::new();
        for _ in 0..3 {
            let controller = controller.clone();
            tasks.push(tokio::spawn(async move { controller.add(&pid("a"), 1).await }));
            settle().await;
        }
        assert_eq!(controller.store().read(|s| s.quantity_of(&pid("a"))), 3);

        backend.release(0);
        backend.wait_for_held(2).await;
        backend.release(1);
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 3);
        }

        // The middle change was overtaken before its turn; the last one
        // adds what the server was missing.
        let sent: Vec<_> = backend.calls().iter().map(|c| c.quantity).collect();
        assert_eq!(sent, vec![Some(1), Some(2)]);
        assert_eq!(quantities(&backend.server_items()), vec![("a".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_failed_change_with_newer_change_queued_is_not_rolled_back() {
        let (backend, controller) = setup(LineWriteMode::Absolute, 10);
        backend.hold_requests();
        backend.fail_next(CallKind::AddOrSet, transport());

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.set_quantity(&pid("a"), 3).await })
        };
        backend.wait_for_held(1).await;
        let second = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.set_quantity(&pid("a"), 5).await })
        };
        settle().await;

        backend.release(0);
        assert!(first.await.unwrap().is_err());
        assert_eq!(controller.store().read(|s| s.quantity_of(&pid("a"))), 5);

        backend.wait_for_held(2).await;
        backend.release(1);
        assert_eq!(second.await.unwrap().unwrap(), 5);
        assert_eq!(backend.calls()[1].quantity, Some(5));
        assert_eq!(quantities(&backend.server_items()), vec![("a".to_string(), 5)]);
        assert_eq!(backend.count(CallKind::FetchCart), 0);
    }

    #[tokio::test]
    async fn test_change_to_other_product_waits_for_earlier_change() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        backend.hold_requests();

        let add_a = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.add(&pid("a"), 1).await })
        };
        backend.wait_for_held(1).await;
        let add_b = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.add(&pid("b"), 2).await })
        };
        settle().await;

        assert_eq!(backend.count(CallKind::AddOrSet), 1);
        assert_eq!(
            quantities(&controller.store().items()),
            vec![("a".to_string(), 1), ("b".to_string(), 2)]
        );

        backend.release(0);
        backend.wait_for_held(2).await;
        assert_eq!(backend.calls()[1].product_id, Some(pid("b")));
        backend.release(1);

        assert_eq!(add_a.await.unwrap().unwrap(), 1);
        assert_eq!(add_b.await.unwrap().unwrap(), 2);
        let expected = vec![("a".to_string(), 1), ("b".to_string(), 2)];
        assert_eq!(quantities(&controller.store().items()), expected);
        assert_eq!(quantities(&backend.server_items()), expected);
    }

    #[tokio::test]
    async fn test_refresh_answered_before_add_landed_keeps_line() {
        let (backend, controller) = setup(LineWriteMode::Absolute, 10);
        backend.hold_requests();

        let add = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.set_quantity(&pid("a"), 2).await })
        };
        backend.wait_for_held(1).await;
        let refresh = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh().await })
        };
        backend.wait_for_held(2).await;

        // The server reads the cart before the add is applied.
        backend.release(1);
        refresh.await.unwrap().unwrap();
        assert_eq!(controller.store().read(|s| s.quantity_of(&pid("a"))), 2);

        backend.release(0);
        assert_eq!(add.await.unwrap().unwrap(), 2);
        assert_eq!(quantities(&controller.store().items()), vec![("a".to_string(), 2)]);
        assert_eq!(quantities(&backend.server_items()), vec![("a".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_stale_refresh_delivered_after_add_keeps_line() {
        let (backend, controller) = setup(LineWriteMode::Absolute, 10);
        backend.hold_requests();

        let add = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.set_quantity(&pid("a"), 2).await })
        };
        backend.wait_for_held(1).await;

        // Read the cart now, answer it later.
        backend.hold_responses();
        let refresh = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh().await })
        };
        backend.wait_for_held(2).await;

        backend.release(0);
        assert_eq!(add.await.unwrap().unwrap(), 2);
        backend.release(1);
        refresh.await.unwrap().unwrap();

        assert_eq!(quantities(&controller.store().items()), vec![("a".to_string(), 2)]);
        assert_eq!(quantities(&backend.server_items()), vec![("a".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_clear_waits_for_pending_line_change() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        backend.hold_requests();

        let add = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.add(&pid("a"), 1).await })
        };
        backend.wait_for_held(1).await;
        let clear = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.clear_cart().await })
        };
        settle().await;
        assert!(controller.store().is_empty());
        assert_eq!(backend.count(CallKind::Clear), 0);

        backend.release(0);
        assert_eq!(add.await.unwrap().unwrap(), 0);
        backend.wait_for_held(2).await;
        backend.release(1);
        clear.await.unwrap().unwrap();

        assert!(controller.store().is_empty());
        assert!(backend.server_items().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_fills_in_unknown_products() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        let backend = backend
            .with_catalog(vec![product("d", 500, "default", 10)])
            .with_server_items(vec![line("a", 1), line("d", 2)]);

        controller.refresh().await.unwrap();

        let breakdown = controller.store().breakdown();
        assert!(!breakdown.has_issues());
        assert_eq!(breakdown.subtotal.amount_cents, 1_000 + 2 * 500);
        assert_eq!(backend.count(CallKind::FetchProduct), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_fetched_before_stock_clamp() {
        let (backend, controller) = setup(LineWriteMode::Absolute, 10);
        let backend = backend.with_catalog(vec![product("e", 700, "default", 2)]);

        assert_eq!(controller.set_quantity(&pid("e"), 5).await.unwrap(), 2);

        let calls = backend.calls();
        assert_eq!(calls[0].kind, CallKind::FetchProduct);
        assert_eq!(calls[1].quantity, Some(2));
        assert_eq!(controller.store().breakdown().subtotal.amount_cents, 1_400);

        // Unknown to the backend too: the change still goes through.
        assert_eq!(controller.set_quantity(&pid("zzz"), 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_signs_out_and_clears() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        controller.add(&pid("a"), 1).await.unwrap();
        backend.fail_next(CallKind::AddOrSet, BackendError::Unauthorized);

        let err = controller.add(&pid("b"), 1).await.unwrap_err();
        assert_eq!(err, SyncError::SessionExpired);
        assert!(controller.store().is_empty());
        assert!(!controller.session().is_authenticated());

        let err = controller.add(&pid("a"), 1).await.unwrap_err();
        assert_eq!(err, SyncError::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_signed_out_makes_no_call() {
        let backend = ScriptedBackend::new(LineWriteMode::Additive);
        let controller = SyncController::new(
            Arc::new(backend.clone()),
            SessionHandle::new(),
            SharedCart::default(),
        );

        assert_eq!(
            controller.add(&pid("a"), 1).await.unwrap_err(),
            SyncError::NotAuthenticated
        );
        assert_eq!(controller.refresh().await.unwrap_err(), SyncError::NotAuthenticated);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_refused_while_submitting() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        controller.store().update(|s| s.set_status(CartStatus::Submitting));

        assert_eq!(
            controller.add(&pid("a"), 1).await.unwrap_err(),
            SyncError::CheckoutInProgress
        );
        assert_eq!(
            controller.clear_cart().await.unwrap_err(),
            SyncError::CheckoutInProgress
        );
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_local_state() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        let backend = backend.with_server_items(vec![line("b", 2), line("a", 1)]);

        controller.refresh().await.unwrap();
        assert_eq!(
            quantities(&controller.store().items()),
            vec![("b".to_string(), 2), ("a".to_string(), 1)]
        );
        assert_eq!(backend.count(CallKind::FetchCart), 1);
    }

    #[tokio::test]
    async fn test_newer_refresh_supersedes_older() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        let backend = backend.with_server_items(vec![line("a", 1)]);
        backend.hold_responses();

        let older = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh().await })
        };
        backend.wait_for_held(1).await;
        let newer = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh().await })
        };
        backend.wait_for_held(2).await;

        assert!(older.await.unwrap().is_ok());
        backend.release_all();
        newer.await.unwrap().unwrap();

        assert_eq!(quantities(&controller.store().items()), vec![("a".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_refresh_keeps_line_with_pending_request() {
        let (backend, controller) = setup(LineWriteMode::Absolute, 10);
        backend.hold_responses();

        let refresh = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.refresh().await })
        };
        backend.wait_for_held(1).await;
        let add = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.set_quantity(&pid("a"), 2).await })
        };
        backend.wait_for_held(2).await;

        // The refresh was answered before the add reached the server.
        backend.release(0);
        refresh.await.unwrap().unwrap();
        assert_eq!(controller.store().read(|s| s.quantity_of(&pid("a"))), 2);

        backend.release(1);
        assert_eq!(add.await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        controller.add(&pid("a"), 1).await.unwrap();
        controller.add(&pid("b"), 1).await.unwrap();

        controller.clear_cart().await.unwrap();
        assert!(controller.store().is_empty());
        assert!(backend.server_items().is_empty());
    }

    #[tokio::test]
    async fn test_failed_clear_restores_lines() {
        let (backend, controller) = setup(LineWriteMode::Additive, 10);
        controller.add(&pid("a"), 1).await.unwrap();
        controller.add(&pid("b"), 2).await.unwrap();
        backend.fail_next(CallKind::Clear, transport());

        assert!(controller.clear_cart().await.is_err());
        assert_eq!(
            quantities(&controller.store().items()),
            vec![("a".to_string(), 1), ("b".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_reset_drops_pending_responses() {
        let (backend, controller) = setup(LineWriteMode::Absolute, 10);
        backend.hold_responses();

        let add = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.set_quantity(&pid("a"), 2).await })
        };
        backend.wait_for_held(1).await;

        controller.reset();
        controller.store().update(|s| s.clear());
        backend.release_all();

        add.await.unwrap().unwrap();
        assert!(controller.store().is_empty());
    }
}
