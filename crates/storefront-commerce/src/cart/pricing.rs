//! Cart pricing calculations.
//!
//! [`compute_breakdown`] is a pure function of the line items, a product
//! lookup and a [`PricingConfig`]. Subtotal and shipping are integer minor
//! units; tax is accumulated as an exact decimal and rounded once, so the
//! displayed parts always add up to the displayed total.

use crate::cart::CartLineItem;
use crate::catalog::{Category, ProductLookup};
use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::{Currency, Money};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A tax rate expressed as a fraction in `[0, 1]` (e.g. `0.21`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// A zero rate.
    pub const ZERO: TaxRate = TaxRate(Decimal::ZERO);

    /// Create a rate, rejecting values outside `[0, 1]`.
    pub fn new(rate: Decimal) -> Result<Self, CommerceError> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(CommerceError::InvalidTaxRate(rate.to_string()));
        }
        Ok(Self(rate.normalize()))
    }

    /// Create a rate from whole basis points (2100 = 21%).
    pub fn from_basis_points(bp: u32) -> Result<Self, CommerceError> {
        Self::new(Decimal::new(i64::from(bp), 4))
    }

    /// Get the rate as a decimal fraction.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for TaxRate {
    type Error = CommerceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaxRate> for Decimal {
    fn from(rate: TaxRate) -> Self {
        rate.0
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", (self.0 * Decimal::ONE_HUNDRED).normalize())
    }
}

/// Pricing constants. Must match the backend's so both sides agree on
/// totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Currency all amounts are expressed in.
    #[serde(default)]
    pub currency: Currency,
    /// Per-category tax rates.
    #[serde(default)]
    pub tax_rate_by_category: BTreeMap<Category, TaxRate>,
    /// Rate for categories without an entry.
    pub default_tax_rate: TaxRate,
    /// Subtotal (minor units) from which shipping is free, inclusive.
    pub free_shipping_threshold_cents: i64,
    /// Shipping fee (minor units) below the threshold.
    pub flat_shipping_fee_cents: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let mut tax_rate_by_category = BTreeMap::new();
        tax_rate_by_category.insert(Category::electronics(), TaxRate(Decimal::new(10, 2)));
        Self {
            currency: Currency::USD,
            tax_rate_by_category,
            default_tax_rate: TaxRate(Decimal::new(21, 2)),
            free_shipping_threshold_cents: 100_000,
            flat_shipping_fee_cents: 5_000,
        }
    }
}

impl PricingConfig {
    /// Set or replace the rate for a category.
    pub fn with_category_rate(mut self, category: impl Into<Category>, rate: TaxRate) -> Self {
        self.tax_rate_by_category.insert(category.into(), rate);
        self
    }

    /// Rate applied to a category.
    pub fn rate_for(&self, category: &Category) -> TaxRate {
        self.tax_rate_by_category
            .get(category)
            .copied()
            .unwrap_or(self.default_tax_rate)
    }

    /// Free-shipping threshold as money.
    pub fn free_shipping_threshold(&self) -> Money {
        Money::new(self.free_shipping_threshold_cents, self.currency)
    }

    /// Flat shipping fee as money.
    pub fn flat_shipping_fee(&self) -> Money {
        Money::new(self.flat_shipping_fee_cents, self.currency)
    }

    /// Validate amounts.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.free_shipping_threshold_cents < 0 {
            return Err(CommerceError::ValidationError(
                "free shipping threshold must not be negative".to_string(),
            ));
        }
        if self.flat_shipping_fee_cents < 0 {
            return Err(CommerceError::ValidationError(
                "flat shipping fee must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// A line that could not be priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingIssue {
    /// The product is not in the lookup.
    UnknownProduct(ProductId),
    /// The product is priced in another currency than the config.
    CurrencyMismatch {
        product_id: ProductId,
        expected: Currency,
        found: Currency,
    },
}

impl PricingIssue {
    /// Product the issue is about.
    pub fn product_id(&self) -> &ProductId {
        match self {
            PricingIssue::UnknownProduct(id) => id,
            PricingIssue::CurrencyMismatch { product_id, .. } => product_id,
        }
    }
}

impl fmt::Display for PricingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingIssue::UnknownProduct(id) => write!(f, "unknown product {}", id),
            PricingIssue::CurrencyMismatch {
                product_id,
                expected,
                found,
            } => write!(
                f,
                "product {} priced in {}, expected {}",
                product_id, found, expected
            ),
        }
    }
}

/// Pricing for a single line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePricing {
    /// Product priced.
    pub product_id: ProductId,
    /// Unit price.
    pub unit_price: Money,
    /// Quantity.
    pub quantity: u32,
    /// unit_price * quantity.
    pub subtotal: Money,
    /// Rate applied.
    pub tax_rate: TaxRate,
    /// Line tax, rounded for display. The cart tax is rounded from the exact
    /// sum, not from these.
    pub tax: Money,
}

/// Complete pricing breakdown for a cart at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    /// Sum of line subtotals.
    pub subtotal: Money,
    /// Tax on all lines.
    pub tax: Money,
    /// Shipping fee.
    pub shipping: Money,
    /// subtotal + tax + shipping.
    pub total: Money,
    /// Per-line pricing, in cart order, for priced lines only.
    pub lines: Vec<LinePricing>,
    /// Lines that contributed nothing.
    pub issues: Vec<PricingIssue>,
}

impl PricingBreakdown {
    /// Check if shipping is free.
    pub fn is_free_shipping(&self) -> bool {
        self.shipping.is_zero()
    }

    /// How much more subtotal is needed to reach free shipping.
    pub fn amount_to_free_shipping(&self, config: &PricingConfig) -> Money {
        let missing = (config.free_shipping_threshold_cents - self.subtotal.amount_cents).max(0);
        Money::new(missing, self.subtotal.currency)
    }

    /// Check if some lines could not be priced.
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Compute the pricing breakdown of a set of line items.
///
/// Unknown products contribute nothing and are listed in
/// [`PricingBreakdown::issues`]; logging them is the caller's job. A cart
/// with no line items ships for free.
pub fn compute_breakdown<L>(
    items: &[CartLineItem],
    lookup: &L,
    config: &PricingConfig,
) -> PricingBreakdown
where
    L: ProductLookup + ?Sized,
{
    let currency = config.currency;
    let mut subtotal_cents: i64 = 0;
    let mut tax_exact = Decimal::ZERO;
    let mut lines = Vec::with_capacity(items.len());
    let mut issues = Vec::new();

    for item in items {
        let Some(product) = lookup.product(&item.product_id) else {
            issues.push(PricingIssue::UnknownProduct(item.product_id.clone()));
            continue;
        };
        if product.price.currency != currency {
            issues.push(PricingIssue::CurrencyMismatch {
                product_id: item.product_id.clone(),
                expected: currency,
                found: product.price.currency,
            });
            continue;
        }

        let line_cents = product
            .price
            .amount_cents
            .saturating_mul(i64::from(item.quantity));
        let rate = config.rate_for(&product.category);
        let line_tax = Decimal::from(line_cents).saturating_mul(rate.as_decimal());

        subtotal_cents = subtotal_cents.saturating_add(line_cents);
        tax_exact = tax_exact.saturating_add(line_tax);

        lines.push(LinePricing {
            product_id: item.product_id.clone(),
            unit_price: product.price,
            quantity: item.quantity,
            subtotal: Money::new(line_cents, currency),
            tax_rate: rate,
            tax: Money::new(round_minor(line_tax), currency),
        });
    }

    let tax_cents = round_minor(tax_exact);
    let shipping_cents =
        if items.is_empty() || subtotal_cents >= config.free_shipping_threshold_cents {
            0
        } else {
            config.flat_shipping_fee_cents
        };
    let total_cents = subtotal_cents
        .saturating_add(tax_cents)
        .saturating_add(shipping_cents);

    PricingBreakdown {
        subtotal: Money::new(subtotal_cents, currency),
        tax: Money::new(tax_cents, currency),
        shipping: Money::new(shipping_cents, currency),
        total: Money::new(total_cents, currency),
        lines,
        issues,
    }
}

/// Round an exact amount of minor units to a whole minor unit.
fn round_minor(amount: Decimal) -> i64 {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(if amount.is_sign_negative() { i64::MIN } else { i64::MAX })
}
