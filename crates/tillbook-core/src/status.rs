//! # Document Status State Machines
//!
//! Every sales document and every table carries a status. Allowed moves:
//!
//! ```text
//! Quote:    draft ──► sent ──► accepted | rejected
//!           draft | sent | accepted ──► converted (terminal, spawns an Invoice)
//!
//! Invoice:  draft ──► sent ──► paid | overdue | cancelled
//!           draft ──► cancelled        overdue ──► paid | cancelled
//!
//! Order:    open ──► completed | cancelled | saved
//!           saved ──► open | cancelled
//!
//! Table:    available ⇄ occupied ⇄ reserved ⇄ available
//!           any ──► maintenance ──► available
//! ```
//!
//! Terminal states never move again. Transitions are not queued or retried:
//! a rejected transition is returned to the caller as `InvalidTransition`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Behaviour shared by every status enum.
pub trait DocumentStatus: Copy + Eq + std::fmt::Debug + 'static {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// Stable lowercase name, identical to the serialized form.
    fn as_str(&self) -> &'static str;

    /// Whether `next` is reachable in one step from `self`.
    fn can_transition_to(&self, next: Self) -> bool;

    /// Whether no further transition is possible.
    fn is_terminal(&self) -> bool;

    /// Whether line items may still be changed.
    fn is_editable(&self) -> bool;
}

/// Validates a single status move.
///
/// ```rust
/// use tillbook_core::status::{transition, QuoteStatus};
///
/// assert!(transition(QuoteStatus::Draft, QuoteStatus::Sent).is_ok());
/// assert!(transition(QuoteStatus::Converted, QuoteStatus::Draft).is_err());
/// ```
pub fn transition<S: DocumentStatus>(from: S, to: S) -> CoreResult<S> {
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(CoreError::InvalidTransition {
            entity: S::ENTITY,
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

// =============================================================================
// Quote
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum QuoteStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    Rejected,
    /// An invoice was created from this quote.
    Converted,
}

impl DocumentStatus for QuoteStatus {
    const ENTITY: &'static str = "Quote";

    fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Converted => "converted",
        }
    }

    fn can_transition_to(&self, next: Self) -> bool {
        use QuoteStatus::*;
        matches!(
            (self, next),
            (Draft, Sent)
                | (Sent, Accepted)
                | (Sent, Rejected)
                | (Draft, Converted)
                | (Sent, Converted)
                | (Accepted, Converted)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, QuoteStatus::Rejected | QuoteStatus::Converted)
    }

    fn is_editable(&self) -> bool {
        matches!(self, QuoteStatus::Draft)
    }
}

// =============================================================================
// Invoice
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Returns `Overdue` for a sent invoice whose due date has passed.
    ///
    /// Any other status, or an invoice without a due date, is returned as is.
    pub fn overdue_at(self, due_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match (self, due_date) {
            (InvoiceStatus::Sent, Some(due)) if due < now => InvoiceStatus::Overdue,
            _ => self,
        }
    }
}

impl DocumentStatus for InvoiceStatus {
    const ENTITY: &'static str = "Invoice";

    fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    fn can_transition_to(&self, next: Self) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, next),
            (Draft, Sent)
                | (Draft, Cancelled)
                | (Sent, Paid)
                | (Sent, Overdue)
                | (Sent, Cancelled)
                | (Overdue, Paid)
                | (Overdue, Cancelled)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    fn is_editable(&self) -> bool {
        matches!(self, InvoiceStatus::Draft)
    }
}

// =============================================================================
// Order
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum OrderStatus {
    #[default]
    Open,
    /// Parked so it can be resumed later.
    Saved,
    Completed,
    Cancelled,
}

impl DocumentStatus for OrderStatus {
    const ENTITY: &'static str = "Order";

    fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Saved => "saved",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    fn can_transition_to(&self, next: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Open, Completed) | (Open, Cancelled) | (Open, Saved) | (Saved, Open) | (Saved, Cancelled)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    fn is_editable(&self) -> bool {
        matches!(self, OrderStatus::Open)
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// Receipts are issued once and only ever voided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ReceiptStatus {
    #[default]
    Issued,
    Voided,
}

impl DocumentStatus for ReceiptStatus {
    const ENTITY: &'static str = "Receipt";

    fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Issued => "issued",
            ReceiptStatus::Voided => "voided",
        }
    }

    fn can_transition_to(&self, next: Self) -> bool {
        matches!((self, next), (ReceiptStatus::Issued, ReceiptStatus::Voided))
    }

    fn is_terminal(&self) -> bool {
        matches!(self, ReceiptStatus::Voided)
    }

    fn is_editable(&self) -> bool {
        false
    }
}

// =============================================================================
// Table
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    Reserved,
    /// Taken out of service manually.
    Maintenance,
}

impl DocumentStatus for TableStatus {
    const ENTITY: &'static str = "Table";

    fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Available => "available",
            TableStatus::Occupied => "occupied",
            TableStatus::Reserved => "reserved",
            TableStatus::Maintenance => "maintenance",
        }
    }

    fn can_transition_to(&self, next: Self) -> bool {
        use TableStatus::*;
        match (self, next) {
            (Maintenance, Available) => true,
            (Maintenance, _) => false,
            (_, Maintenance) => true,
            (from, to) => *from != to,
        }
    }

    fn is_terminal(&self) -> bool {
        false
    }

    fn is_editable(&self) -> bool {
        !matches!(self, TableStatus::Maintenance)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_quote_lifecycle() {
        assert!(transition(QuoteStatus::Draft, QuoteStatus::Sent).is_ok());
        assert!(transition(QuoteStatus::Sent, QuoteStatus::Accepted).is_ok());
        assert!(transition(QuoteStatus::Accepted, QuoteStatus::Converted).is_ok());
        assert!(transition(QuoteStatus::Draft, QuoteStatus::Converted).is_ok());

        assert!(transition(QuoteStatus::Draft, QuoteStatus::Accepted).is_err());
        assert!(transition(QuoteStatus::Rejected, QuoteStatus::Converted).is_err());
        assert!(transition(QuoteStatus::Converted, QuoteStatus::Converted).is_err());
        assert!(QuoteStatus::Converted.is_terminal());
    }

    #[test]
    fn test_paid_invoice_is_not_reversed() {
        assert!(transition(InvoiceStatus::Sent, InvoiceStatus::Paid).is_ok());
        assert!(transition(InvoiceStatus::Overdue, InvoiceStatus::Paid).is_ok());
        for next in [
            InvoiceStatus::Draft,
            InvoiceStatus::Sent,
            InvoiceStatus::Overdue,
            InvoiceStatus::Cancelled,
        ] {
            assert!(transition(InvoiceStatus::Paid, next).is_err());
        }
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = transition(InvoiceStatus::Paid, InvoiceStatus::Draft).unwrap_err();
        assert_eq!(err.to_string(), "Invoice cannot move from paid to draft");
    }

    #[test]
    fn test_order_can_be_saved_and_resumed() {
        assert!(transition(OrderStatus::Open, OrderStatus::Saved).is_ok());
        assert!(transition(OrderStatus::Saved, OrderStatus::Open).is_ok());
        assert!(transition(OrderStatus::Saved, OrderStatus::Completed).is_err());
        assert!(!OrderStatus::Saved.is_editable());
    }

    #[test]
    fn test_table_transitions() {
        use TableStatus::*;
        assert!(transition(Available, Occupied).is_ok());
        assert!(transition(Occupied, Reserved).is_ok());
        assert!(transition(Reserved, Available).is_ok());
        assert!(transition(Occupied, Maintenance).is_ok());
        assert!(transition(Maintenance, Available).is_ok());

        assert!(transition(Maintenance, Occupied).is_err());
        assert!(transition(Occupied, Occupied).is_err());
    }

    #[test]
    fn test_overdue_detection() {
        let now = Utc::now();
        let past = Some(now - Duration::days(1));
        let future = Some(now + Duration::days(1));

        assert_eq!(InvoiceStatus::Sent.overdue_at(past, now), InvoiceStatus::Overdue);
        assert_eq!(InvoiceStatus::Sent.overdue_at(future, now), InvoiceStatus::Sent);
        assert_eq!(InvoiceStatus::Paid.overdue_at(past, now), InvoiceStatus::Paid);
        assert_eq!(InvoiceStatus::Sent.overdue_at(None, now), InvoiceStatus::Sent);
    }

    #[test]
    fn test_as_str_matches_serde() {
        let json = serde_json::to_string(&QuoteStatus::Converted).unwrap();
        assert_eq!(json, format!("\"{}\"", QuoteStatus::Converted.as_str()));
        let json = serde_json::to_string(&TableStatus::Maintenance).unwrap();
        assert_eq!(json, format!("\"{}\"", TableStatus::Maintenance.as_str()));
    }
}
