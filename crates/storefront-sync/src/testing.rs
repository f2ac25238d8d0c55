//! In-memory [`CartBackend`] for tests.
//!
//! Calls are recorded in arrival order. Holding lets a test decide when a
//! call takes effect: [`ScriptedBackend::hold_requests`] keeps a call from
//! touching the server cart until released, [`ScriptedBackend::hold_responses`]
//! applies it on arrival and keeps only the answer back.

use crate::backend::{BackendError, CartBackend, LineWriteMode, RemoteCart};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use storefront_auth::{AuthSession, BearerToken, SessionHandle};
use storefront_commerce::prelude::*;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    FetchCart,
    AddOrSet,
    Remove,
    Clear,
    Finalize,
    FetchOrders,
    FetchProduct,
    FetchProducts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub kind: CallKind,
    pub product_id: Option<ProductId>,
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Hold {
    #[default]
    Off,
    Requests,
    Responses,
}

#[derive(Debug, Default)]
struct Server {
    items: Vec<CartLineItem>,
    catalog: Vec<Product>,
    orders: Vec<OrderSummary>,
    calls: Vec<Call>,
    failures: VecDeque<(CallKind, BackendError)>,
    hold: Hold,
    held: Vec<Option<oneshot::Sender<()>>>,
    next_order: u32,
}

impl Server {
    fn snapshot(&self) -> RemoteCart {
        RemoteCart {
            items: self.items.clone(),
            products: Vec::new(),
        }
    }

    fn take_failure(&mut self, kind: CallKind) -> Option<BackendError> {
        let pos = self.failures.iter().position(|(k, _)| *k == kind)?;
        self.failures.remove(pos).map(|(_, e)| e)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ScriptedBackend {
    server: Arc<Mutex<Server>>,
    mode: LineWriteMode,
}

impl ScriptedBackend {
    pub fn new(mode: LineWriteMode) -> Self {
        Self {
            server: Arc::new(Mutex::new(Server::default())),
            mode,
        }
    }

    fn server(&self) -> std::sync::MutexGuard<'_, Server> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Products the catalog endpoints serve.
    pub fn with_catalog(self, products: Vec<Product>) -> Self {
        self.server().catalog = products;
        self
    }

    pub fn with_server_items(self, items: Vec<CartLineItem>) -> Self {
        self.server().items = items;
        self
    }

    pub fn with_orders(self, orders: Vec<OrderSummary>) -> Self {
        self.server().orders = orders;
        self
    }

    /// Fail the next call of `kind` with `error`. The server cart is left
    /// unchanged by the failed call.
    pub fn fail_next(&self, kind: CallKind, error: BackendError) {
        self.server().failures.push_back((kind, error));
    }

    /// Apply calls on arrival but hold their answers until released.
    pub fn hold_responses(&self) {
        self.server().hold = Hold::Responses;
    }

    /// Hold calls before they touch the server cart until released.
    pub fn hold_requests(&self) {
        self.server().hold = Hold::Requests;
    }

    /// Let new calls through. Calls already held stay held.
    pub fn stop_holding(&self) {
        self.server().hold = Hold::Off;
    }

    /// Deliver the `index`-th held response (in arrival order).
    pub fn release(&self, index: usize) {
        if let Some(sender) = self.server().held.get_mut(index).and_then(Option::take) {
            let _ = sender.send(());
        }
    }

    /// Stop holding and deliver everything still held.
    pub fn release_all(&self) {
        let mut server = self.server();
        server.hold = Hold::Off;
        for sender in server.held.iter_mut().filter_map(Option::take) {
            let _ = sender.send(());
        }
    }

    pub fn held_count(&self) -> usize {
        self.server().held.len()
    }

    /// Yield until `count` calls have been held (released ones included).
    pub async fn wait_for_held(&self, count: usize) {
        for _ in 0..1000 {
            if self.held_count() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {} held responses, got {}", count, self.held_count());
    }

    pub fn server_items(&self) -> Vec<CartLineItem> {
        self.server().items.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.server().calls.clone()
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.server().calls.iter().filter(|c| c.kind == kind).count()
    }

    /// Record the call and run `apply` unless a failure is scripted. With
    /// holding on, wait for release before applying or before answering.
    async fn handle<T>(
        &self,
        call: Call,
        apply: impl FnOnce(&mut Server) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let (failure, hold, gate) = {
            let mut server = self.server();
            let kind = call.kind;
            server.calls.push(call);
            let failure = server.take_failure(kind);
            let hold = server.hold;
            let gate = if hold == Hold::Off {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                server.held.push(Some(tx));
                Some(rx)
            };
            (failure, hold, gate)
        };

        if hold == Hold::Requests {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            return match failure {
                Some(error) => Err(error),
                None => apply(&mut self.server()),
            };
        }

        let result = match failure {
            Some(error) => Err(error),
            None => apply(&mut self.server()),
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        result
    }

    fn line_call(kind: CallKind, product_id: &ProductId, quantity: Option<u32>) -> Call {
        Call {
            kind,
            product_id: Some(product_id.clone()),
            quantity,
        }
    }

    fn call(kind: CallKind) -> Call {
        Call {
            kind,
            product_id: None,
            quantity: None,
        }
    }
}

#[async_trait]
impl CartBackend for ScriptedBackend {
    fn line_write_mode(&self) -> LineWriteMode {
        self.mode
    }

    async fn fetch_cart(&self, _token: &BearerToken) -> Result<RemoteCart, BackendError> {
        self.handle(Self::call(CallKind::FetchCart), |server| Ok(server.snapshot()))
            .await
    }

    async fn add_or_set_line(
        &self,
        _token: &BearerToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<RemoteCart, BackendError> {
        let mode = self.mode;
        let call = Self::line_call(CallKind::AddOrSet, product_id, Some(quantity));
        self.handle(call, |server| {
            match server.items.iter_mut().find(|i| &i.product_id == product_id) {
                Some(line) if mode == LineWriteMode::Additive => line.quantity += quantity,
                Some(line) => line.quantity = quantity,
                None => server.items.push(CartLineItem {
                    product_id: product_id.clone(),
                    quantity,
                }),
            }
            Ok(server.snapshot())
        })
        .await
    }

    async fn remove_line(
        &self,
        _token: &BearerToken,
        product_id: &ProductId,
    ) -> Result<RemoteCart, BackendError> {
        let call = Self::line_call(CallKind::Remove, product_id, None);
        self.handle(call, |server| {
            server.items.retain(|i| &i.product_id != product_id);
            Ok(server.snapshot())
        })
        .await
    }

    async fn clear_cart(&self, _token: &BearerToken) -> Result<RemoteCart, BackendError> {
        self.handle(Self::call(CallKind::Clear), |server| {
            server.items.clear();
            Ok(server.snapshot())
        })
        .await
    }

    async fn finalize_order(
        &self,
        _token: &BearerToken,
        _shipping_address: &ShippingAddress,
        _payment: &PaymentDetails,
    ) -> Result<OrderConfirmation, BackendError> {
        self.handle(Self::call(CallKind::Finalize), |server| {
            let breakdown = compute_breakdown(
                &server.items,
                &server.catalog,
                &PricingConfig::default(),
            );
            server.next_order += 1;
            server.items.clear();
            Ok(OrderConfirmation {
                order_id: OrderId::new(format!("order-{}", server.next_order)),
                totals: OrderTotals::from_breakdown(&breakdown),
            })
        })
        .await
    }

    async fn fetch_orders(&self, _token: &BearerToken) -> Result<Vec<OrderSummary>, BackendError> {
        self.handle(Self::call(CallKind::FetchOrders), |server| {
            Ok(server.orders.clone())
        })
        .await
    }

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Product, BackendError> {
        let call = Self::line_call(CallKind::FetchProduct, product_id, None);
        self.handle(call, |server| {
            server
                .catalog
                .iter()
                .find(|p| &p.id == product_id)
                .cloned()
                .ok_or_else(|| BackendError::Rejected {
                    status: 404,
                    message: "Product not found".to_string(),
                })
        })
        .await
    }

    async fn fetch_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, BackendError> {
        self.handle(Self::call(CallKind::FetchProducts), |server| {
            let mut products: Vec<Product> = server
                .catalog
                .iter()
                .filter(|p| filter.matches(p))
                .cloned()
                .collect();
            filter.sort_products(&mut products);
            Ok(products)
        })
        .await
    }
}

pub(crate) fn product(id: &str, price_cents: i64, category: &str, stock: u32) -> Product {
    Product::new(
        ProductId::new(id),
        id.to_uppercase(),
        Money::new(price_cents, Currency::USD),
        Category::new(category),
    )
    .with_stock(stock)
}

pub(crate) fn line(id: &str, quantity: u32) -> CartLineItem {
    CartLineItem {
        product_id: ProductId::new(id),
        quantity,
    }
}

pub(crate) fn signed_in_session() -> SessionHandle {
    let token = BearerToken::new("test-token").unwrap_or_else(|e| panic!("{}", e));
    SessionHandle::signed_in(AuthSession::new(token))
}

pub(crate) fn quantities(items: &[CartLineItem]) -> Vec<(String, u32)> {
    items
        .iter()
        .map(|l| (l.product_id.to_string(), l.quantity))
        .collect()
}
