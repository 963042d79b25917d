//! # Repository Module
//!
//! Typed access to the document store, one repository per concern.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.sales().convert_quote(&tenant, "q-1", now)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SalesRepository ──► store::read_typed / write_typed  (one tx)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DocumentStore ──► notify(quotes, invoices) ──► subscribers            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SalesRepository`] - quotes, invoices, orders; status changes; conversion
//! - [`PaymentRepository`] - payments by document, balances
//! - [`TableRepository`] - seating, table moves, release
//! - [`TemplateRepository`] - template bodies and per-category defaults
//! - [`SettingsRepository`] - `settings/vat`, `settings/printer`
//! - [`SessionRepository`] - local key/value session state

pub mod payment;
pub mod sales;
pub mod session;
pub mod settings;
pub mod table;
pub mod template;

pub use payment::PaymentRepository;
pub use sales::{SalesCollection, SalesRepository};
pub use session::SessionRepository;
pub use settings::{PrinterSettings, SettingsRepository};
pub use table::{TableMove, TableRepository};
pub use template::TemplateRepository;
