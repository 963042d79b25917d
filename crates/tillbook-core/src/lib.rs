//! # tillbook-core: Pure Business Logic for Tillbook
//!
//! Everything that decides an amount, a status or a printed line lives here,
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  apps/cli  (tillbook binary)                    │   │
//! │  │   render, totals, balance, convert-quote, move-order, send      │   │
//! │  └───────────────┬─────────────────────────────┬───────────────────┘   │
//! │                  │                             │                        │
//! │  ┌───────────────▼──────────────┐  ┌───────────▼───────────────────┐   │
//! │  │  tillbook-db (SQLite)        │  │  tillbook-mail (HTTP)         │   │
//! │  │  documents, subscriptions,   │  │  invoice email endpoint       │   │
//! │  │  atomic table moves          │  │                               │   │
//! │  └───────────────┬──────────────┘  └───────────┬───────────────────┘   │
//! │                  └──────────────┬──────────────┘                        │
//! │  ┌──────────────────────────────▼──────────────────────────────────┐   │
//! │  │               ★ tillbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │  money   totals   types   status   conversion   balance        │   │
//! │  │  template   session   notify   validation                      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money and tax rate types with integer arithmetic
//! - [`totals`] - Line totals, subtotal, tax and grand total
//! - [`types`] - Line items, sales documents, payments, tables, templates
//! - [`status`] - Status state machines for every document type
//! - [`conversion`] - Quote to invoice conversion
//! - [`balance`] - Payment and balance tracker
//! - [`template`] - The `{{ }}` document template renderer
//! - [`session`] - Resumable in-progress order
//! - [`notify`] - Outbound email request and SMTP error codes
//! - [`validation`] - Field-level input checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use tillbook_core::{Invoice, ItemKind, LineItem, Money, TaxConfiguration, TaxRate};
//!
//! let mut invoice = Invoice::new("inv-1", TaxConfiguration::exclusive(TaxRate::from_bps(1500)), Utc::now());
//! invoice
//!     .add_item(LineItem::new("l1", "Consulting", ItemKind::Service, 2, Money::from_cents(5000)).unwrap())
//!     .unwrap();
//!
//! assert_eq!(invoice.totals().subtotal.cents(), 10000);
//! assert_eq!(invoice.totals().tax_amount.cents(), 1500);
//! assert_eq!(invoice.totals().total.cents(), 11500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod balance;
pub mod conversion;
pub mod error;
pub mod money;
pub mod notify;
pub mod session;
pub mod status;
pub mod template;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use balance::{Balance, PaymentStatus};
pub use error::{CoreError, CoreResult, TemplateError, ValidationError};
pub use money::{Money, TaxRate};
pub use status::{DocumentStatus, InvoiceStatus, OrderStatus, QuoteStatus, ReceiptStatus, TableStatus};
pub use totals::{DocumentTotals, TaxConfiguration};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Days between quote conversion and the new invoice's due date.
pub const DEFAULT_PAYMENT_TERM_DAYS: i64 = 30;

/// Largest quantity accepted on a single line.
///
/// Catches accidental over-ordering (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest unit price accepted on a single line (one billion major units).
pub const MAX_UNIT_PRICE: Money = Money::from_cents(100_000_000_000);
