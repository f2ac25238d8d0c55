//! The remote cart backend.

mod http;
mod wire;

pub use http::HttpCartBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_auth::BearerToken;
use storefront_commerce::prelude::*;
use storefront_data::FetchError;
use thiserror::Error;

/// Errors from a [`CartBackend`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The server answered 401.
    #[error("unauthorized")]
    Unauthorized,

    /// No answer (connection, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// Any other non-2xx answer. `message` is the server's own text.
    #[error("HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// A 2xx answer that could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Unauthorized)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Transport(_))
    }
}

impl From<FetchError> for BackendError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::HttpError { status: 401, .. } => BackendError::Unauthorized,
            FetchError::HttpError { status, message } => BackendError::Rejected { status, message },
            FetchError::RequestError(message) => BackendError::Transport(message),
            FetchError::Timeout => BackendError::Transport("request timed out".to_string()),
            FetchError::InvalidUrl(message) => BackendError::Transport(message),
            FetchError::ParseError(message) | FetchError::JsonError(message) => {
                BackendError::Decode(message)
            }
        }
    }
}

/// How the backend's "add line" endpoint treats the quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineWriteMode {
    /// The quantity is added to the existing line. Lowering a quantity
    /// takes a remove followed by a re-add.
    #[default]
    Additive,
    /// The quantity replaces the existing line's quantity.
    Absolute,
}

impl LineWriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineWriteMode::Additive => "additive",
            LineWriteMode::Absolute => "absolute",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "additive" => Some(LineWriteMode::Additive),
            "absolute" => Some(LineWriteMode::Absolute),
            _ => None,
        }
    }
}

/// The authoritative cart as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteCart {
    /// Line items in server order.
    pub items: Vec<CartLineItem>,
    /// Product snapshots the backend embedded in the response.
    pub products: Vec<Product>,
}

/// Operations the storefront backend exposes.
///
/// Every cart operation answers with the whole authoritative cart.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// How `add_or_set_line` treats the quantity.
    fn line_write_mode(&self) -> LineWriteMode {
        LineWriteMode::Additive
    }

    async fn fetch_cart(&self, token: &BearerToken) -> Result<RemoteCart, BackendError>;

    async fn add_or_set_line(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<RemoteCart, BackendError>;

    async fn remove_line(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
    ) -> Result<RemoteCart, BackendError>;

    async fn clear_cart(&self, token: &BearerToken) -> Result<RemoteCart, BackendError>;

    /// Place an order for the backend's current cart.
    async fn finalize_order(
        &self,
        token: &BearerToken,
        shipping_address: &ShippingAddress,
        payment: &PaymentDetails,
    ) -> Result<OrderConfirmation, BackendError>;

    /// Purchase history, newest first.
    async fn fetch_orders(&self, token: &BearerToken) -> Result<Vec<OrderSummary>, BackendError>;

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Product, BackendError>;

    async fn fetch_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, BackendError>;
}

#[async_trait]
impl<B: CartBackend + ?Sized> CartBackend for Arc<B> {
    fn line_write_mode(&self) -> LineWriteMode {
        (**self).line_write_mode()
    }

    async fn fetch_cart(&self, token: &BearerToken) -> Result<RemoteCart, BackendError> {
        (**self).fetch_cart(token).await
    }

    async fn add_or_set_line(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<RemoteCart, BackendError> {
        (**self).add_or_set_line(token, product_id, quantity).await
    }

    async fn remove_line(
        &self,
        token: &BearerToken,
        product_id: &ProductId,
    ) -> Result<RemoteCart, BackendError> {
        (**self).remove_line(token, product_id).await
    }

    async fn clear_cart(&self, token: &BearerToken) -> Result<RemoteCart, BackendError> {
        (**self).clear_cart(token).await
    }

    async fn finalize_order(
        &self,
        token: &BearerToken,
        shipping_address: &ShippingAddress,
        payment: &PaymentDetails,
    ) -> Result<OrderConfirmation, BackendError> {
        (**self).finalize_order(token, shipping_address, payment).await
    }

    async fn fetch_orders(&self, token: &BearerToken) -> Result<Vec<OrderSummary>, BackendError> {
        (**self).fetch_orders(token).await
    }

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Product, BackendError> {
        (**self).fetch_product(product_id).await
    }

    async fn fetch_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, BackendError> {
        (**self).fetch_products(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_mapping() {
        let unauthorized = FetchError::HttpError {
            status: 401,
            message: "expired".to_string(),
        };
        assert_eq!(BackendError::from(unauthorized), BackendError::Unauthorized);

        let conflict = FetchError::HttpError {
            status: 409,
            message: "Out of stock".to_string(),
        };
        assert_eq!(
            BackendError::from(conflict),
            BackendError::Rejected {
                status: 409,
                message: "Out of stock".to_string()
            }
        );

        assert!(BackendError::from(FetchError::Timeout).is_transport());
    }

    #[test]
    fn test_line_write_mode_parse() {
        assert_eq!(LineWriteMode::parse("Absolute"), Some(LineWriteMode::Absolute));
        assert_eq!(LineWriteMode::parse("sideways"), None);
        assert_eq!(LineWriteMode::default(), LineWriteMode::Additive);
    }
}
