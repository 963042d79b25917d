//! # Line Aggregation & Tax
//!
//! Pure functions that turn line items and a tax configuration into the
//! totals printed on every quote, invoice, receipt and order.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  quantity × unit_price ──► line total   (per item, exact minor units)  │
//! │                                │                                        │
//! │                         Σ line totals ──► subtotal                      │
//! │                                │                                        │
//! │               ┌────────────────┴─────────────────┐                      │
//! │               ▼                                  ▼                      │
//! │        EXCLUSIVE                           INCLUSIVE                    │
//! │  tax   = subtotal × r                tax   = subtotal − subtotal/(1+r)  │
//! │  base  = subtotal                    base  = subtotal − tax             │
//! │  total = subtotal + tax              total = subtotal                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Totals are recomputed synchronously on every mutation; nothing here caches.
//! Every sum is checked: an amount that would overflow is an `InvalidInput`
//! error, never a wrapped value.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, TaxRate};
use crate::types::LineItem;

// =============================================================================
// Tax Configuration
// =============================================================================

/// How tax applies to a document (the `settings/vat` document).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TaxConfiguration {
    /// Rate applied uniformly to the document subtotal.
    pub rate: TaxRate,

    /// Entered prices already contain tax.
    #[serde(default)]
    pub inclusive: bool,

    /// Tax switched off in settings; behaves like a zero rate.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for TaxConfiguration {
    fn default() -> Self {
        TaxConfiguration {
            rate: TaxRate::zero(),
            inclusive: false,
            enabled: true,
        }
    }
}

impl TaxConfiguration {
    /// Tax added on top of entered prices.
    pub fn exclusive(rate: TaxRate) -> Self {
        TaxConfiguration {
            rate,
            inclusive: false,
            enabled: true,
        }
    }

    /// Entered prices already contain tax.
    pub fn inclusive(rate: TaxRate) -> Self {
        TaxConfiguration {
            rate,
            inclusive: true,
            enabled: true,
        }
    }

    /// No tax at all (quotes, tax-exempt tenants).
    pub fn none() -> Self {
        TaxConfiguration {
            rate: TaxRate::zero(),
            inclusive: false,
            enabled: false,
        }
    }

    /// The rate that actually applies, zero when tax is disabled.
    pub fn effective_rate(&self) -> TaxRate {
        if self.enabled {
            self.rate
        } else {
            TaxRate::zero()
        }
    }
}

// =============================================================================
// Calculations
// =============================================================================

/// Line total = quantity × unit price.
///
/// ## Errors
/// `InvalidInput` when `quantity < 1` or `unit_price < 0`.
///
/// ```rust
/// use tillbook_core::money::Money;
/// use tillbook_core::totals::compute_line_total;
///
/// let total = compute_line_total(3, Money::from_cents(1999)).unwrap();
/// assert_eq!(total.cents(), 5997);
/// assert!(compute_line_total(0, Money::from_cents(100)).is_err());
/// ```
pub fn compute_line_total(quantity: i64, unit_price: Money) -> CoreResult<Money> {
    if quantity < 1 {
        return Err(CoreError::invalid_input(
            "quantity",
            format!("must be at least 1, got {}", quantity),
        ));
    }
    if unit_price.is_negative() {
        return Err(CoreError::invalid_input(
            "unit price",
            format!("must not be negative, got {}", unit_price),
        ));
    }

    unit_price
        .cents()
        .checked_mul(quantity)
        .map(Money::from_cents)
        .ok_or_else(|| CoreError::invalid_input("quantity", "line total overflows"))
}

/// Σ line totals; an empty list yields zero.
pub fn compute_subtotal(items: &[LineItem]) -> CoreResult<Money> {
    items
        .iter()
        .try_fold(Money::zero(), |acc, item| acc.checked_add(item.total()))
        .ok_or_else(|| CoreError::invalid_input("subtotal", "amount overflows"))
}

/// Tax amount for a subtotal.
///
/// ```rust
/// use tillbook_core::money::{Money, TaxRate};
/// use tillbook_core::totals::{compute_tax, TaxConfiguration};
///
/// let subtotal = Money::from_cents(10000);
/// let rate = TaxRate::from_bps(1500);
/// assert_eq!(compute_tax(subtotal, &TaxConfiguration::exclusive(rate)).unwrap().cents(), 1500);
/// assert_eq!(compute_tax(subtotal, &TaxConfiguration::inclusive(rate)).unwrap().cents(), 1304);
/// assert_eq!(compute_tax(subtotal, &TaxConfiguration::none()).unwrap().cents(), 0);
/// ```
pub fn compute_tax(subtotal: Money, config: &TaxConfiguration) -> CoreResult<Money> {
    let rate = config.effective_rate();
    if rate.is_zero() {
        return Ok(Money::zero());
    }

    if config.inclusive {
        Ok(subtotal.extract_inclusive_tax(rate))
    } else {
        subtotal.calculate_tax(rate)
    }
}

/// Grand total: exclusive adds tax on top, inclusive already contains it.
pub fn compute_total(subtotal: Money, tax_amount: Money, inclusive: bool) -> CoreResult<Money> {
    if inclusive {
        return Ok(subtotal);
    }
    subtotal
        .checked_add(tax_amount)
        .ok_or_else(|| CoreError::invalid_input("total", "amount overflows"))
}

// =============================================================================
// Document Totals
// =============================================================================

/// All derived amounts of a document, computed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DocumentTotals {
    /// Σ line totals as entered.
    pub subtotal: Money,
    /// Tax portion.
    pub tax_amount: Money,
    /// Amount before tax (equals subtotal in exclusive mode).
    pub base_amount: Money,
    /// What the customer owes.
    pub total: Money,
}

impl DocumentTotals {
    /// Recomputes every amount from the items and tax configuration.
    pub fn compute(items: &[LineItem], config: &TaxConfiguration) -> CoreResult<Self> {
        let subtotal = compute_subtotal(items)?;
        let tax_amount = compute_tax(subtotal, config)?;
        let inclusive = config.inclusive && !config.effective_rate().is_zero();
        let base_amount = if inclusive {
            subtotal - tax_amount
        } else {
            subtotal
        };

        Ok(DocumentTotals {
            subtotal,
            tax_amount,
            base_amount,
            total: compute_total(subtotal, tax_amount, inclusive)?,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
