//! Order types returned by the backend.

use crate::cart::PricingBreakdown;
use crate::ids::{OrderId, ProductId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, awaiting processing.
    #[default]
    Pending,
    /// Order confirmed and processing.
    Confirmed,
    /// Order shipped.
    Shipped,
    /// Order delivered.
    Delivered,
    /// Order cancelled.
    Cancelled,
    /// Order refunded.
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Refunded => "Refunded",
        }
    }

    /// Parse a backend status string. Unknown values read as `Pending`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "confirmed" | "paid" | "processing" => OrderStatus::Confirmed,
            "shipped" => OrderStatus::Shipped,
            "delivered" | "completed" => OrderStatus::Delivered,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            "refunded" => OrderStatus::Refunded,
            _ => OrderStatus::Pending,
        }
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }
}

/// Order totals as computed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Totals of a locally computed breakdown.
    pub fn from_breakdown(breakdown: &PricingBreakdown) -> Self {
        Self {
            subtotal: breakdown.subtotal,
            tax: breakdown.tax,
            shipping: breakdown.shipping,
            total: breakdown.total,
        }
    }

    /// Check that the parts add up to the total.
    pub fn is_consistent(&self) -> bool {
        self.subtotal
            .amount_cents
            .checked_add(self.tax.amount_cents)
            .and_then(|v| v.checked_add(self.shipping.amount_cents))
            == Some(self.total.amount_cents)
    }
}

/// Result of a successful finalize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    /// Order placed.
    pub order_id: OrderId,
    /// Totals the server charged.
    pub totals: OrderTotals,
}

/// A line of a past order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    /// Title at the time of purchase, if the backend sent one.
    pub title: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// unit_price * quantity, saturating.
    pub fn line_total(&self) -> Money {
        Money::new(
            self.unit_price
                .amount_cents
                .saturating_mul(i64::from(self.quantity)),
            self.unit_price.currency,
        )
    }
}

/// Purchase history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    /// Unix timestamp (seconds) the order was placed.
    pub placed_at: i64,
    pub status: OrderStatus,
    pub totals: OrderTotals,
    pub lines: Vec<OrderLine>,
}

impl OrderSummary {
    /// Total number of units ordered.
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}
