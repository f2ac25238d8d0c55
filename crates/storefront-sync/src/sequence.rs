//! Ordering of optimistic cart mutations.
//!
//! Mutations reach the backend one at a time, in the order the user made
//! them: each takes a [`QueuePlace`] and waits for the one before it. Cart
//! reads (refreshes) are not queued and may be answered at any point
//! between two mutations.
//!
//! Every request gets a number from one monotonic counter, and so does the
//! moment a line request finishes. An answer may write a product's line
//! only when no other change to that product is pending, and either the
//! answer is for a change to that product or it was requested after the
//! product's last change landed and after every answer already applied.

use crate::backend::RemoteCart;
use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use std::collections::HashMap;
use storefront_commerce::prelude::*;

/// What a request is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Scope {
    Line(ProductId),
    /// Every line the cart had when the request was made (clearing it).
    Cart(Vec<ProductId>),
    /// A read of the whole cart.
    Snapshot,
}

/// Handed out when a request is issued and returned when it completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub seq: u64,
    pub scope: Scope,
    epoch: u64,
    generation: u64,
}

impl Ticket {
    fn covers(&self, product_id: &ProductId) -> bool {
        match &self.scope {
            Scope::Line(id) => id == product_id,
            Scope::Cart(ids) => ids.contains(product_id),
            Scope::Snapshot => false,
        }
    }

    fn is_mutation(&self) -> bool {
        !matches!(self.scope, Scope::Snapshot)
    }
}

/// What to do after a line request completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Settlement {
    Settled,
    /// Put the line back the way the server last reported it.
    Restore(Option<(usize, u32)>),
    /// A newer change to the product is queued and will settle it.
    Superseded,
}

/// A mutation's place in the send queue. Dropping it lets the next one go.
pub(crate) struct QueuePlace {
    previous: Option<Shared<oneshot::Receiver<()>>>,
    _done: oneshot::Sender<()>,
}

impl QueuePlace {
    /// Wait until every mutation queued before this one has finished.
    pub async fn ready(&self) {
        if let Some(previous) = &self.previous {
            // Cancelled is the only outcome: the sender is dropped, never used.
            let _ = previous.clone().await;
        }
    }
}

/// Per-product bookkeeping while changes are pending or recently landed.
#[derive(Debug, Default)]
struct Slot {
    latest_issued: u64,
    in_flight: u32,
    /// Line (position, quantity) as the server last reported it.
    confirmed: Option<(usize, u32)>,
    /// When the last request for the product finished.
    touched: u64,
}

#[derive(Default)]
pub(crate) struct MutationTracker {
    next_seq: u64,
    applied_floor: u64,
    slots: HashMap<ProductId, Slot>,
    epoch: u64,
    tail: Option<Shared<oneshot::Receiver<()>>>,
}

impl MutationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn ticket(&self, seq: u64, scope: Scope, store: &CartStore) -> Ticket {
        Ticket {
            seq,
            scope,
            epoch: self.epoch,
            generation: store.generation(),
        }
    }

    /// Take a place behind every mutation queued so far.
    pub fn join_queue(&mut self) -> QueuePlace {
        let (done, finished) = oneshot::channel();
        QueuePlace {
            previous: self.tail.replace(finished.shared()),
            _done: done,
        }
    }

    fn open_slot(&mut self, store: &CartStore, product_id: &ProductId, seq: u64) {
        let before = store
            .position(product_id)
            .map(|pos| (pos, store.quantity_of(product_id)));
        let slot = self.slots.entry(product_id.clone()).or_insert_with(|| Slot {
            confirmed: before,
            ..Slot::default()
        });
        slot.in_flight += 1;
        slot.latest_issued = seq;
    }

    /// Issue a change to one product's line. Call before applying the
    /// optimistic change so the line the server knows is captured.
    pub fn begin_line(&mut self, store: &CartStore, product_id: &ProductId) -> (Ticket, QueuePlace) {
        let seq = self.next_seq();
        self.open_slot(store, product_id, seq);
        let ticket = self.ticket(seq, Scope::Line(product_id.clone()), store);
        (ticket, self.join_queue())
    }

    /// Issue a read of the whole cart.
    pub fn begin_snapshot(&mut self, store: &CartStore) -> Ticket {
        let seq = self.next_seq();
        self.ticket(seq, Scope::Snapshot, store)
    }

    /// Issue a request that rewrites every line (clearing the cart). It
    /// covers the current lines and every product with changes pending.
    pub fn begin_cart_wide(&mut self, store: &CartStore) -> (Ticket, QueuePlace) {
        let seq = self.next_seq();
        let mut covered: Vec<ProductId> =
            store.items().iter().map(|i| i.product_id.clone()).collect();
        for product_id in self.slots.keys() {
            if !covered.contains(product_id) {
                covered.push(product_id.clone());
            }
        }
        for product_id in &covered {
            self.open_slot(store, product_id, seq);
        }
        let ticket = self.ticket(seq, Scope::Cart(covered), store);
        (ticket, self.join_queue())
    }

    /// Check that the ticket still belongs to the current cart.
    pub fn is_current(&self, ticket: &Ticket, store: &CartStore) -> bool {
        ticket.epoch == self.epoch && ticket.generation == store.generation()
    }

    /// Check that no newer change to the ticket's product has been issued.
    pub fn is_latest(&self, ticket: &Ticket) -> bool {
        match &ticket.scope {
            Scope::Line(product_id) => self
                .slots
                .get(product_id)
                .map(|slot| slot.latest_issued == ticket.seq)
                .unwrap_or(false),
            _ => true,
        }
    }

    /// Quantity the server last reported for a product with changes pending.
    pub fn server_quantity(&self, product_id: &ProductId) -> u32 {
        self.slots
            .get(product_id)
            .and_then(|slot| slot.confirmed)
            .map(|(_, quantity)| quantity)
            .unwrap_or(0)
    }

    /// The server dropped the ticket's line even though the request failed
    /// (the remove of a remove-then-add went through).
    pub fn record_removed(&mut self, ticket: &Ticket) {
        if ticket.epoch != self.epoch {
            return;
        }
        if let Scope::Line(product_id) = &ticket.scope {
            if let Some(slot) = self.slots.get_mut(product_id) {
                slot.confirmed = None;
            }
        }
    }

    /// Changes pending for a product other than the ticket's own.
    fn pending_besides(&self, product_id: &ProductId, ticket: &Ticket) -> u32 {
        let in_flight = self.in_flight(product_id);
        if ticket.covers(product_id) {
            in_flight.saturating_sub(1)
        } else {
            in_flight
        }
    }

    fn writable(&self, product_id: &ProductId, ticket: &Ticket) -> bool {
        if self.pending_besides(product_id, ticket) > 0 {
            return false;
        }
        if ticket.covers(product_id) {
            return true;
        }
        let touched = self.slots.get(product_id).map(|s| s.touched).unwrap_or(0);
        ticket.seq > self.applied_floor.max(touched)
    }

    /// Apply an authoritative cart answered for `ticket`. Call before
    /// finishing the ticket.
    ///
    /// Lines the answer can't speak for keep their local state and
    /// position. Returns how many were kept.
    pub fn reconcile(&mut self, store: &mut CartStore, ticket: &Ticket, remote: RemoteCart) -> usize {
        store.remember_products(remote.products);

        // Mutations are sent one at a time, so their answer is the server
        // cart as the next one will find it.
        if ticket.is_mutation() {
            for (product_id, slot) in self.slots.iter_mut() {
                slot.confirmed = remote
                    .items
                    .iter()
                    .position(|l| &l.product_id == product_id)
                    .map(|pos| (pos, remote.items[pos].quantity));
            }
        }

        let kept = self.merge(store, ticket, remote.items);
        self.applied_floor = self.applied_floor.max(ticket.seq);
        let floor = self.applied_floor;
        self.slots
            .retain(|_, slot| slot.in_flight > 0 || slot.touched > floor);

        tracing::debug!(seq = ticket.seq, kept, lines = store.len(), "cart response applied");
        kept
    }

    fn merge(&self, store: &mut CartStore, ticket: &Ticket, lines: Vec<CartLineItem>) -> usize {
        let local = store.items().to_vec();
        let mut merged: Vec<CartLineItem> = Vec::with_capacity(lines.len().max(local.len()));
        let mut kept = 0usize;

        for line in lines {
            if self.writable(&line.product_id, ticket) {
                merged.push(line);
            } else if let Some(mine) = local.iter().find(|l| l.product_id == line.product_id) {
                merged.push(mine.clone());
                kept += 1;
            }
        }
        for (pos, line) in local.iter().enumerate() {
            if !self.writable(&line.product_id, ticket)
                && !merged.iter().any(|m| m.product_id == line.product_id)
            {
                merged.insert(pos.min(merged.len()), line.clone());
                kept += 1;
            }
        }

        store.set_items(merged);
        kept
    }

    /// Record the completion of a line request. Tickets from before a
    /// [`reset`](Self::reset) are ignored.
    pub fn finish_line(&mut self, ticket: &Ticket, succeeded: bool) -> Settlement {
        let Scope::Line(product_id) = &ticket.scope else {
            return Settlement::Settled;
        };
        if ticket.epoch != self.epoch {
            return Settlement::Settled;
        }
        let touched = self.next_seq();
        let Some(slot) = self.slots.get_mut(product_id) else {
            return Settlement::Settled;
        };

        slot.in_flight = slot.in_flight.saturating_sub(1);
        slot.touched = touched;

        if succeeded {
            Settlement::Settled
        } else if slot.latest_issued != ticket.seq {
            Settlement::Superseded
        } else {
            Settlement::Restore(slot.confirmed)
        }
    }

    /// Record the completion of a cart-wide request. After a failure,
    /// returns the lines to put back in ascending position order; products
    /// changed again since are left alone.
    pub fn finish_cart_wide(
        &mut self,
        ticket: &Ticket,
        succeeded: bool,
    ) -> Vec<(ProductId, Option<(usize, u32)>)> {
        let Scope::Cart(covered) = &ticket.scope else {
            return Vec::new();
        };
        if ticket.epoch != self.epoch {
            return Vec::new();
        }
        let touched = self.next_seq();

        let mut restore = Vec::new();
        for product_id in covered {
            let Some(slot) = self.slots.get_mut(product_id) else {
                continue;
            };
            slot.in_flight = slot.in_flight.saturating_sub(1);
            slot.touched = touched;
            if !succeeded && slot.latest_issued == ticket.seq {
                restore.push((product_id.clone(), slot.confirmed));
            }
        }
        restore.sort_by_key(|(_, saved)| saved.map(|(pos, _)| pos).unwrap_or(usize::MAX));
        restore
    }

    /// Requests in flight or queued for a product.
    pub fn in_flight(&self, product_id: &ProductId) -> u32 {
        self.slots.get(product_id).map(|s| s.in_flight).unwrap_or(0)
    }

    /// Forget all bookkeeping and start a fresh queue. Tickets issued before
    /// are no longer current.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.tail = None;
        self.epoch += 1;
    }
}
