//! [`CartBackend`] over JSON/REST.

use super::wire::{
    CartDto, ConfirmationDto, FinalizeRequest, LineRequest, OrdersDto, ProductDto, ProductsDto,
};
use super::{BackendError, CartBackend, LineWriteMode, RemoteCart};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use storefront_auth::BearerToken;
use storefront_commerce::prelude::*;
use storefront_data::{ClientRequestBuilder, FetchClient, Response};

/// Talks to the storefront REST API.
///
/// Paths are relative to the client's base URL: `/cart`, `/cart/items`,
/// `/orders` and `/products`.
#[derive(Debug, Clone)]
pub struct HttpCartBackend {
    client: FetchClient,
    currency: Currency,
    mode: LineWriteMode,
}

impl HttpCartBackend {
    pub fn new(client: FetchClient) -> Self {
        Self {
            client: client.with_default_header("Accept", "application/json"),
            currency: Currency::USD,
            mode: LineWriteMode::default(),
        }
    }

    /// Currency assumed for amounts that don't name one.
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_line_write_mode(mut self, mode: LineWriteMode) -> Self {
        self.mode = mode;
        self
    }

    async fn send(&self, request: ClientRequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await?.error_for_status()?;
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: ClientRequestBuilder,
    ) -> Result<T, BackendError> {
        let response = self.send(request).await?;
        Ok(response.json()?)
    }

    async fn send_cart(&self, request: ClientRequestBuilder) -> Result<RemoteCart, BackendError> {
        let response = self.send(request).await?;
        decode_cart(&response, self.currency)
    }
}

/// Decode a cart response. An empty body (204) is an empty cart.
fn decode_cart(response: &Response, currency: Currency) -> Result<RemoteCart, BackendError> {
    if response.bytes().iter().all(u8::is_ascii_whitespace) {
        return Ok(RemoteCart::default());
    }
    let dto: CartDto = response.json()?;
    dto.into_remote(currency)
}

#[async_trait]
impl CartBackend for HttpCartBackend {
    fn line_write_mode(&self) -> LineWriteMode {
        self.mode
    }

    async fn fetch_cart(&self, token: &BearerToken) -> Result<RemoteCart, BackendError> {
        self.send_cart(self.client.get("/cart").bearer_auth(token))
            .await
    }

    async fn add_or_set_line(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<RemoteCart, BackendError> {
        let request = self
            .client
            .post("/cart/items")
            .bearer_auth(token)
            .json(&LineRequest {
                product_id,
                quantity,
            })?;
        self.send_cart(request).await
    }

    async fn remove_line(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
    ) -> Result<RemoteCart, BackendError> {
        let request = self
            .client
            .delete("/cart/items")
            .segment(product_id.as_str())
            .bearer_auth(token);
        self.send_cart(request).await
    }

    async fn clear_cart(&self, token: &BearerToken) -> Result<RemoteCart, BackendError> {
        self.send_cart(self.client.delete("/cart").bearer_auth(token))
            .await
    }

    async fn finalize_order(
        &self,
        token: &BearerToken,
        shipping_address: &ShippingAddress,
        payment: &PaymentDetails,
    ) -> Result<OrderConfirmation, BackendError> {
        let request = self
            .client
            .post("/orders")
            .bearer_auth(token)
            .json(&FinalizeRequest {
                shipping_address,
                payment_token: &payment.token,
                card_last4: payment.card_last4.as_deref(),
            })?;
        let dto: ConfirmationDto = self.send_json(request).await?;
        dto.into_confirmation(self.currency)
    }

    async fn fetch_orders(&self, token: &BearerToken) -> Result<Vec<OrderSummary>, BackendError> {
        let dto: OrdersDto = self
            .send_json(self.client.get("/orders").bearer_auth(token))
            .await?;
        dto.into_summaries(self.currency)
    }

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Product, BackendError> {
        let dto: ProductDto = self
            .send_json(self.client.get("/products").segment(product_id.as_str()))
            .await?;
        dto.into_product(self.currency)
    }

    async fn fetch_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, BackendError> {
        let dto: ProductsDto = self
            .send_json(self.client.get("/products").query(filter.to_query_pairs()))
            .await?;
        dto.into_products(self.currency)
    }
}
