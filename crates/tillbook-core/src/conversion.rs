//! # Quote → Invoice Conversion
//!
//! Converting a quote marks it `converted` and spawns an independent invoice.
//! Nothing is written here; the database layer persists both documents in a
//! single transaction.
//!
//! ```text
//!   Quote (draft | sent | accepted)          Invoice (new id)
//!   ┌──────────────────────────┐            ┌──────────────────────────────┐
//!   │ items ───────────────────┼── copy ───►│ items (identical)            │
//!   │ customer, notes ─────────┼── copy ───►│ customer, notes              │
//!   │ tax                      │   reset ──►│ tax = none, client_vat = null│
//!   │ status ──► converted     │            │ status = draft               │
//!   └──────────────────────────┘            │ due = now + 30 days          │
//!                                           │ source_quote_id = quote.id   │
//!                                           └──────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::error::CoreResult;
use crate::status::QuoteStatus;
use crate::totals::TaxConfiguration;
use crate::types::{Invoice, Quote, TenantContext};
use crate::DEFAULT_PAYMENT_TERM_DAYS;

/// Result of a conversion: both documents, ready to persist together.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The source quote, now in `converted` status.
    pub quote: Quote,
    pub invoice: Invoice,
}

/// Converts a quote into a fresh draft invoice.
///
/// ## Errors
/// - `MissingTenant` when no organization is active
/// - `InvalidTransition` when the quote cannot move to `converted`
///   (already converted, or rejected)
pub fn convert_quote(
    tenant: &TenantContext,
    quote: &Quote,
    now: DateTime<Utc>,
) -> CoreResult<Conversion> {
    tenant.require()?;
    let mut converted = quote.clone();
    converted.transition_to(QuoteStatus::Converted)?;

    let mut invoice: Invoice =
        quote.with_items_as(uuid::Uuid::new_v4().to_string(), TaxConfiguration::none(), now)?;
    invoice.client_vat = None;
    invoice.due_date = Some(now + Duration::days(DEFAULT_PAYMENT_TERM_DAYS));
    invoice.source_quote_id = Some(quote.id.clone());

    Ok(Conversion {
        quote: converted,
        invoice,
    })
}
