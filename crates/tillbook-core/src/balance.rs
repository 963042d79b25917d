//! # Payment & Balance Tracker
//!
//! Derived reads over the payments recorded against one document. Nothing
//! here writes; the balance is recomputed whenever it is displayed.
//!
//! ```text
//!   document total ─────────┐
//!                           ├──► difference = total − Σ paid   (raw, may be < 0)
//!   Σ payment.amount ───────┘          │
//!                           ┌──────────┴───────────┐
//!                           ▼                      ▼
//!                 remaining = max(0, diff)   overpaid = max(0, −diff)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::Payment;

/// Σ payment amounts; an empty list is zero.
pub fn total_paid(payments: &[Payment]) -> Money {
    payments.iter().map(|p| p.amount).sum()
}

/// `max(0, document_total − Σ paid)`.
///
/// ```rust
/// use chrono::Utc;
/// use tillbook_core::balance::remaining_balance;
/// use tillbook_core::money::Money;
/// use tillbook_core::types::{Payment, PaymentMethod};
///
/// let paid = Payment::new("inv-1", Money::from_cents(15000), PaymentMethod::Cash, Utc::now()).unwrap();
/// assert_eq!(remaining_balance(Money::from_cents(10000), &[paid]), Money::zero());
/// ```
pub fn remaining_balance(document_total: Money, payments: &[Payment]) -> Money {
    (document_total - total_paid(payments)).clamp_zero()
}

/// Full balance picture, including any overpayment.
pub fn balance(document_total: Money, payments: &[Payment]) -> Balance {
    Balance::new(document_total, total_paid(payments))
}

/// Where a document stands against its payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
    Overpaid,
}

/// Clamped balance plus the raw difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Balance {
    pub total: Money,
    pub paid: Money,
    /// Never negative.
    pub remaining: Money,
    /// `total − paid`, negative when overpaid.
    pub difference: Money,
    /// Never negative.
    pub overpaid: Money,
}

impl Balance {
    pub fn new(total: Money, paid: Money) -> Self {
        let difference = total - paid;
        Balance {
            total,
            paid,
            remaining: difference.clamp_zero(),
            difference,
            overpaid: (-difference).clamp_zero(),
        }
    }

    pub fn is_overpaid(&self) -> bool {
        self.overpaid.is_positive()
    }

    pub fn status(&self) -> PaymentStatus {
        if self.is_overpaid() {
            PaymentStatus::Overpaid
        } else if self.remaining.is_zero() {
            PaymentStatus::Paid
        } else if self.paid.is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unpaid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;
    use chrono::Utc;

    fn pay(cents: i64) -> Payment {
        Payment::new("inv-1", Money::from_cents(cents), PaymentMethod::Cash, Utc::now()).unwrap()
    }

    #[test]
    fn test_total_paid() {
        assert_eq!(total_paid(&[]), Money::zero());
        assert_eq!(total_paid(&[pay(2500), pay(1250)]).cents(), 3750);
    }

    #[test]
    fn test_remaining_balance_clamps() {
        assert_eq!(remaining_balance(Money::from_cents(10000), &[]).cents(), 10000);
        assert_eq!(remaining_balance(Money::from_cents(10000), &[pay(4000)]).cents(), 6000);
        assert_eq!(remaining_balance(Money::from_cents(10000), &[pay(15000)]), Money::zero());
    }

    #[test]
    fn test_overpayment_is_surfaced() {
        let b = balance(Money::from_cents(10000), &[pay(15000)]);
        assert_eq!(b.remaining, Money::zero());
        assert_eq!(b.difference.cents(), -5000);
        assert_eq!(b.overpaid.cents(), 5000);
        assert_eq!(b.status(), PaymentStatus::Overpaid);
    }

    #[test]
    fn test_status() {
        let total = Money::from_cents(1000);
        assert_eq!(balance(total, &[]).status(), PaymentStatus::Unpaid);
        assert_eq!(balance(total, &[pay(400)]).status(), PaymentStatus::Partial);
        assert_eq!(balance(total, &[pay(400), pay(600)]).status(), PaymentStatus::Paid);
        assert_eq!(balance(Money::zero(), &[]).status(), PaymentStatus::Paid);
    }
}
