//! JSON shapes exchanged with the storefront backend.
//!
//! Amounts travel as decimal numbers in major units and are converted to
//! [`Money`] once, here.

use super::{BackendError, RemoteCart};
use chrono::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use storefront_commerce::prelude::*;

/// An identifier sent either as a JSON string or as a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(text) => text,
            RawId::Number(n) => n.to_string(),
        }
    }
}

fn product_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProductId, D::Error> {
    RawId::deserialize(deserializer).map(|raw| ProductId::new(raw.into_string()))
}

fn order_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OrderId, D::Error> {
    RawId::deserialize(deserializer).map(|raw| OrderId::new(raw.into_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LineRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FinalizeRequest<'a> {
    pub shipping_address: &'a ShippingAddress,
    pub payment_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last4: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductDto {
    #[serde(alias = "productId", deserialize_with = "product_id")]
    pub id: ProductId,
    #[serde(alias = "name")]
    pub title: String,
    pub price: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "availableStock", alias = "stockQuantity")]
    pub stock: Option<i64>,
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
}

impl ProductDto {
    pub fn into_product(self, currency: Currency) -> Result<Product, BackendError> {
        let currency = match self.currency.as_deref() {
            Some(code) => Currency::from_code(code)
                .ok_or_else(|| BackendError::Decode(format!("unknown currency {}", code)))?,
            None => currency,
        };
        if self.price.is_sign_negative() {
            return Err(BackendError::Decode(format!(
                "negative price for product {}",
                self.id
            )));
        }
        let price = Money::from_decimal(self.price, currency)
            .map_err(|e| BackendError::Decode(format!("price of {}: {}", self.id, e)))?;
        let stock = self
            .stock
            .map(|s| u32::try_from(s.max(0)).unwrap_or(u32::MAX))
            .unwrap_or(0);
        let category = self
            .category
            .map(Category::new)
            .unwrap_or_else(|| Category::new("default"));

        let mut product = Product::new(self.id, self.title, price, category).with_stock(stock);
        product.image = self.image;
        Ok(product)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartItemDto {
    #[serde(deserialize_with = "product_id")]
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub product: Option<ProductDto>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CartDto {
    Wrapped {
        #[serde(default)]
        items: Vec<CartItemDto>,
    },
    Bare(Vec<CartItemDto>),
}

impl CartDto {
    pub fn into_remote(self, currency: Currency) -> Result<RemoteCart, BackendError> {
        let items = match self {
            CartDto::Wrapped { items } => items,
            CartDto::Bare(items) => items,
        };

        let mut cart = RemoteCart::default();
        for item in items {
            if let Some(product) = item.product {
                cart.products.push(product.into_product(currency)?);
            }
            if item.quantity <= 0 {
                continue;
            }
            let quantity = u32::try_from(item.quantity).unwrap_or(u32::MAX);
            cart.items.push(CartLineItem {
                product_id: item.product_id,
                quantity,
            });
        }
        Ok(cart)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TotalsDto {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl TotalsDto {
    pub fn into_totals(self, currency: Currency) -> Result<OrderTotals, BackendError> {
        let money = |amount: Decimal| {
            Money::from_decimal(amount, currency).map_err(|e| BackendError::Decode(e.to_string()))
        };
        Ok(OrderTotals {
            subtotal: money(self.subtotal)?,
            tax: money(self.tax)?,
            shipping: money(self.shipping)?,
            total: money(self.total)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfirmationDto {
    #[serde(deserialize_with = "order_id")]
    pub order_id: OrderId,
    pub breakdown: TotalsDto,
}

impl ConfirmationDto {
    pub fn into_confirmation(self, currency: Currency) -> Result<OrderConfirmation, BackendError> {
        Ok(OrderConfirmation {
            order_id: self.order_id,
            totals: self.breakdown.into_totals(currency)?,
        })
    }
}

/// Either unix seconds or an RFC 3339 string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TimestampDto {
    Unix(i64),
    Text(String),
}

impl TimestampDto {
    fn into_unix(self) -> Result<i64, BackendError> {
        match self {
            TimestampDto::Unix(secs) => Ok(secs),
            TimestampDto::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.timestamp())
                .map_err(|e| BackendError::Decode(format!("timestamp {:?}: {}", text, e))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderLineDto {
    #[serde(deserialize_with = "product_id")]
    pub product_id: ProductId,
    #[serde(default)]
    pub title: Option<String>,
    pub quantity: u32,
    #[serde(alias = "price")]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderDto {
    #[serde(alias = "orderId", deserialize_with = "order_id")]
    pub id: OrderId,
    #[serde(alias = "createdAt")]
    pub placed_at: TimestampDto,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(alias = "totals")]
    pub breakdown: TotalsDto,
    #[serde(default, alias = "lines")]
    pub items: Vec<OrderLineDto>,
}

impl OrderDto {
    pub fn into_summary(self, currency: Currency) -> Result<OrderSummary, BackendError> {
        let lines = self
            .items
            .into_iter()
            .map(|line| {
                Ok(OrderLine {
                    product_id: line.product_id,
                    title: line.title,
                    quantity: line.quantity,
                    unit_price: Money::from_decimal(line.unit_price, currency)
                        .map_err(|e| BackendError::Decode(e.to_string()))?,
                })
            })
            .collect::<Result<Vec<_>, BackendError>>()?;

        Ok(OrderSummary {
            id: self.id,
            placed_at: self.placed_at.into_unix()?,
            status: self
                .status
                .as_deref()
                .map(OrderStatus::parse_lenient)
                .unwrap_or_default(),
            totals: self.breakdown.into_totals(currency)?,
            lines,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OrdersDto {
    Wrapped { orders: Vec<OrderDto> },
    Bare(Vec<OrderDto>),
}

impl OrdersDto {
    pub fn into_summaries(self, currency: Currency) -> Result<Vec<OrderSummary>, BackendError> {
        let orders = match self {
            OrdersDto::Wrapped { orders } => orders,
            OrdersDto::Bare(orders) => orders,
        };
        orders
            .into_iter()
            .map(|o| o.into_summary(currency))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductsDto {
    Wrapped { products: Vec<ProductDto> },
    Bare(Vec<ProductDto>),
}

impl ProductsDto {
    pub fn into_products(self, currency: Currency) -> Result<Vec<Product>, BackendError> {
        let products = match self {
            ProductsDto::Wrapped { products } => products,
            ProductsDto::Bare(products) => products,
        };
        products
            .into_iter()
            .map(|p| p.into_product(currency))
            .collect()
    }
}
