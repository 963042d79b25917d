//! # Sales Repository
//!
//! Quotes, invoices and orders, all stored as `SalesDocument<S>` JSON.
//!
//! ## Quote Conversion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  convert_quote(tenant, quote_id)                                        │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    read quotes/{id}                                                     │
//! │    tillbook_core::conversion::convert_quote  (rules, no I/O)            │
//! │    write quotes/{id}        status = converted                          │
//! │    insert invoices/{new}    status = draft, due = now + 30d             │
//! │  COMMIT                     ← both or neither                           │
//! │  notify(quotes, invoices)                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use tillbook_core::conversion::convert_quote;
use tillbook_core::{
    DocumentStatus, Invoice, InvoiceStatus, OrderStatus, QuoteStatus, SalesDocument,
    TenantContext,
};

use crate::error::DbResult;
use crate::path::{Collection, DocumentPath};
use crate::store::{self, DocumentStore};

/// Maps a document's status type to the collection it lives in.
pub trait SalesCollection: DocumentStatus + Serialize + DeserializeOwned {
    const COLLECTION: Collection;
}

impl SalesCollection for QuoteStatus {
    const COLLECTION: Collection = Collection::Quotes;
}

impl SalesCollection for InvoiceStatus {
    const COLLECTION: Collection = Collection::Invoices;
}

impl SalesCollection for OrderStatus {
    const COLLECTION: Collection = Collection::Orders;
}

/// Repository for quotes, invoices and orders.
#[derive(Debug, Clone)]
pub struct SalesRepository {
    store: DocumentStore,
}

impl SalesRepository {
    pub fn new(store: DocumentStore) -> Self {
        SalesRepository { store }
    }

    /// Stores a new document; fails if the id exists.
    pub async fn create<S: SalesCollection>(
        &self,
        tenant: &TenantContext,
        document: &SalesDocument<S>,
    ) -> DbResult<()> {
        debug!(id = %document.id, entity = S::ENTITY, "Creating sales document");
        self.store
            .create(tenant, S::COLLECTION, &document.id, document)
            .await
    }

    /// Replaces a document (last writer wins).
    pub async fn save<S: SalesCollection>(
        &self,
        tenant: &TenantContext,
        document: &SalesDocument<S>,
    ) -> DbResult<()> {
        self.store
            .set(tenant, S::COLLECTION, &document.id, document)
            .await
    }

    /// Loads a document; totals are recomputed on load.
    pub async fn get<S: SalesCollection>(
        &self,
        tenant: &TenantContext,
        id: &str,
    ) -> DbResult<SalesDocument<S>> {
        self.store
            .get(tenant, S::COLLECTION, id)
            .await?
            .ok_or_else(|| crate::DbError::not_found(S::ENTITY, id))
    }

    /// All documents of a type, ordered by creation.
    pub async fn list<S: SalesCollection>(
        &self,
        tenant: &TenantContext,
    ) -> DbResult<Vec<SalesDocument<S>>> {
        self.store.list(tenant, S::COLLECTION).await
    }

    pub async fn delete<S: SalesCollection>(&self, tenant: &TenantContext, id: &str) -> DbResult<bool> {
        self.store.delete(tenant, S::COLLECTION, id).await
    }

    /// Moves a document to `next`, validated against its state machine.
    ///
    /// Read, check and write happen in one transaction.
    pub async fn update_status<S: SalesCollection>(
        &self,
        tenant: &TenantContext,
        id: &str,
        next: S,
    ) -> DbResult<SalesDocument<S>> {
        let path = DocumentStore::path(tenant, S::COLLECTION, id)?;
        let mut tx = self.store.begin().await?;

        let mut document: SalesDocument<S> = store::read_typed(&mut *tx, &path, S::ENTITY).await?;
        if let Err(e) = document.transition_to(next) {
            warn!(id = %id, error = %e, "Status change rejected");
            return Err(e.into());
        }
        store::write_typed(&mut *tx, &path, &document, Utc::now()).await?;

        self.store.commit(tx).await?;
        info!(id = %id, entity = S::ENTITY, status = next.as_str(), "Status updated");
        self.store.notify([path.parent()]).await;
        Ok(document)
    }

    /// Converts a quote into a new draft invoice, atomically.
    ///
    /// ## Errors
    /// - `MissingTenant` before anything is read or written
    /// - `NotFound` for an unknown quote
    /// - `InvalidTransition` when the quote is rejected or already converted
    pub async fn convert_quote(
        &self,
        tenant: &TenantContext,
        quote_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Invoice> {
        let quote_path = DocumentStore::path(tenant, Collection::Quotes, quote_id)?;
        let mut tx = self.store.begin().await?;

        let quote = store::read_typed(&mut *tx, &quote_path, QuoteStatus::ENTITY).await?;
        let conversion = match convert_quote(tenant, &quote, now) {
            Ok(c) => c,
            Err(e) => {
                warn!(quote_id = %quote_id, error = %e, "Quote conversion rejected");
                return Err(e.into());
            }
        };

        let invoice_path = DocumentPath::new(
            &quote_path.organization_id,
            Collection::Invoices,
            &conversion.invoice.id,
        );
        store::write_typed(&mut *tx, &quote_path, &conversion.quote, now).await?;
        store::insert_doc(
            &mut *tx,
            &invoice_path,
            &serde_json::to_value(&conversion.invoice)?,
            now,
        )
        .await?;

        self.store.commit(tx).await?;
        info!(
            quote_id = %quote_id,
            invoice_id = %conversion.invoice.id,
            "Quote converted to invoice"
        );
        self.store
            .notify([quote_path.parent(), invoice_path.parent()])
            .await;
        Ok(conversion.invoice)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::DbError;
    use chrono::Duration;
    use tillbook_core::{CoreError, ItemKind, LineItem, Money, Quote, TaxConfiguration};

    async fn setup() -> (SalesRepository, TenantContext) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        (db.sales(), TenantContext::new("org-1"))
    }

    fn quote(id: &str) -> Quote {
        let mut q = Quote::new(id, TaxConfiguration::none(), Utc::now());
        q.add_item(LineItem::new("l1", "Logo design", ItemKind::Service, 1, Money::from_cents(10000)).unwrap())
            .unwrap();
        q
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (repo, org) = setup().await;
        repo.create(&org, &quote("q-1")).await.unwrap();

        let loaded: Quote = repo.get(&org, "q-1").await.unwrap();
        assert_eq!(loaded.totals().total.cents(), 10000);
        assert_eq!(loaded.status(), QuoteStatus::Draft);

        let missing = repo.get::<QuoteStatus>(&org, "nope").await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_status_validates_transition() {
        let (repo, org) = setup().await;
        repo.create(&org, &quote("q-1")).await.unwrap();

        let sent = repo.update_status(&org, "q-1", QuoteStatus::Sent).await.unwrap();
        assert_eq!(sent.status(), QuoteStatus::Sent);

        let err = repo.update_status(&org, "q-1", QuoteStatus::Draft).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidTransition { .. })));

        let stored: Quote = repo.get(&org, "q-1").await.unwrap();
        assert_eq!(stored.status(), QuoteStatus::Sent);
    }

    #[tokio::test]
    async fn test_convert_quote_persists_both_documents() {
        let (repo, org) = setup().await;
        repo.create(&org, &quote("q-1")).await.unwrap();
        let now = Utc::now();

        let invoice = repo.convert_quote(&org, "q-1", now).await.unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Draft);
        assert_eq!(invoice.due_date, Some(now + Duration::days(30)));
        assert_eq!(invoice.client_vat, None);
        assert_eq!(invoice.totals().total.cents(), 10000);

        let stored_quote: Quote = repo.get(&org, "q-1").await.unwrap();
        assert_eq!(stored_quote.status(), QuoteStatus::Converted);

        let stored_invoice: Invoice = repo.get(&org, &invoice.id).await.unwrap();
        assert_eq!(stored_invoice.items(), stored_quote.items());
        assert_eq!(stored_invoice.source_quote_id.as_deref(), Some("q-1"));
    }

    #[tokio::test]
    async fn test_second_conversion_writes_nothing() {
        let (repo, org) = setup().await;
        repo.create(&org, &quote("q-1")).await.unwrap();
        repo.convert_quote(&org, "q-1", Utc::now()).await.unwrap();

        let err = repo.convert_quote(&org, "q-1", Utc::now()).await.unwrap_err();
        assert!(err.is_rejected());
        assert_eq!(repo.list::<InvoiceStatus>(&org).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_conversion_requires_tenant() {
        let (repo, org) = setup().await;
        repo.create(&org, &quote("q-1")).await.unwrap();

        let err = repo
            .convert_quote(&TenantContext::default(), "q-1", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::MissingTenant)));

        let stored: Quote = repo.get(&org, "q-1").await.unwrap();
        assert_eq!(stored.status(), QuoteStatus::Draft);
    }
}
