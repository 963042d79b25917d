//! # Payment Repository
//!
//! Payments live in their own collection and point at a document through
//! `documentId`. The document never stores its payment list.
//!
//! ```text
//! invoices/inv-1  { total: 100.00 }
//!        ▲
//!        │ documentId
//! payments/p-1    { amount: 60.00 }
//! payments/p-2    { amount: 50.00 }    ──► balance_for → paid 110.00,
//!                                                        difference -10.00
//! ```

use tracing::{debug, info};

use tillbook_core::balance::{balance, Balance};
use tillbook_core::validation::validate_payment_amount;
use tillbook_core::{CoreError, InvoiceStatus, Payment, TenantContext};

use crate::error::DbResult;
use crate::path::{Collection, CollectionPath};
use crate::repository::sales::SalesRepository;
use crate::store::{self, DocumentStore};
use crate::subscription::Snapshot;

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    store: DocumentStore,
}

impl PaymentRepository {
    pub fn new(store: DocumentStore) -> Self {
        PaymentRepository { store }
    }

    /// Records a payment; the amount must be positive.
    pub async fn record(&self, tenant: &TenantContext, payment: &Payment) -> DbResult<()> {
        validate_payment_amount(payment.amount).map_err(CoreError::from)?;
        self.store
            .create(tenant, Collection::Payments, &payment.id, payment)
            .await?;
        info!(
            payment_id = %payment.id,
            document_id = %payment.document_id,
            amount = %payment.amount,
            "Payment recorded"
        );
        Ok(())
    }

    /// Payments for one document, in the order they were recorded.
    pub async fn for_document(
        &self,
        tenant: &TenantContext,
        document_id: &str,
    ) -> DbResult<Vec<Payment>> {
        let path = CollectionPath::new(tenant.require()?, Collection::Payments);
        let mut conn = self.store.acquire().await?;
        let rows = store::load_where(&mut conn, &path, "documentId", document_id).await?;
        debug!(document_id = %document_id, count = rows.len(), "Loaded payments");

        Snapshot {
            path,
            documents: rows,
        }
        .decode()
    }

    /// Paid, remaining and overpayment for an invoice.
    pub async fn balance_for(&self, tenant: &TenantContext, invoice_id: &str) -> DbResult<Balance> {
        let invoice = SalesRepository::new(self.store.clone())
            .get::<InvoiceStatus>(tenant, invoice_id)
            .await?;
        let payments = self.for_document(tenant, invoice_id).await?;
        Ok(balance(invoice.totals().total, &payments))
    }

    pub async fn delete(&self, tenant: &TenantContext, payment_id: &str) -> DbResult<bool> {
        self.store.delete(tenant, Collection::Payments, payment_id).await
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
    use chrono::Utc;
    use tillbook_core::{
        Invoice, ItemKind, LineItem, Money, PaymentMethod, PaymentStatus, TaxConfiguration,
    };

    async fn setup() -> (Database, TenantContext) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let org = TenantContext::new("org-1");

        let mut invoice = Invoice::new("inv-1", TaxConfiguration::none(), Utc::now());
        invoice
            .add_item(LineItem::new("l1", "Consulting", ItemKind::Service, 1, Money::from_cents(10000)).unwrap())
            .unwrap();
        db.sales().create(&org, &invoice).await.unwrap();
        (db, org)
    }

    fn payment(doc: &str, cents: i64) -> Payment {
        Payment::new(doc, Money::from_cents(cents), PaymentMethod::Cash, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_payments_are_linked_by_document_id() {
        let (db, org) = setup().await;
        let repo = db.payments();
        repo.record(&org, &payment("inv-1", 6000)).await.unwrap();
        repo.record(&org, &payment("inv-2", 999)).await.unwrap();
        repo.record(&org, &payment("inv-1", 1000)).await.unwrap();

        let linked = repo.for_document(&org, "inv-1").await.unwrap();
        let amounts: Vec<i64> = linked.iter().map(|p| p.amount.cents()).collect();
        assert_eq!(amounts, vec![6000, 1000]);
    }

    #[tokio::test]
    async fn test_balance_partial_and_overpaid() {
        let (db, org) = setup().await;
        let repo = db.payments();

        repo.record(&org, &payment("inv-1", 6000)).await.unwrap();
        let partial = repo.balance_for(&org, "inv-1").await.unwrap();
        assert_eq!(partial.remaining.cents(), 4000);
        assert_eq!(partial.status(), PaymentStatus::Partial);

        repo.record(&org, &payment("inv-1", 5000)).await.unwrap();
        let over = repo.balance_for(&org, "inv-1").await.unwrap();
        assert_eq!(over.remaining.cents(), 0);
        assert_eq!(over.difference.cents(), -1000);
        assert!(over.is_overpaid());
    }

    #[tokio::test]
    async fn test_negative_payment_rejected() {
        let (db, org) = setup().await;
        let mut bad = payment("inv-1", 100);
        bad.amount = Money::from_cents(-100);

        let err = db.payments().record(&org, &bad).await.unwrap_err();
        assert!(err.is_rejected());
        assert!(db.payments().for_document(&org, "inv-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_balance_for_unknown_invoice() {
        let (db, org) = setup().await;
        let err = db.payments().balance_for(&org, "nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
