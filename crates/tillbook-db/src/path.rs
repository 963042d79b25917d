//! # Document Paths
//!
//! Every record is addressed hierarchically:
//!
//! ```text
//! organizations/{orgId}/{collection}/{docId}
//!               └──┬──┘ └────┬─────┘ └──┬──┘
//!             tenant   Collection   document id
//! ```
//!
//! Settings are ordinary documents in the `settings` collection
//! (`settings/vat`, `settings/printer`).

use std::fmt;

use tillbook_core::TemplateKind;

/// Every collection of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Customers,
    Suppliers,
    Invoices,
    Quotes,
    Payments,
    Orders,
    Tables,
    OrderTypes,
    PaymentTypes,
    ReceiptTemplates,
    InvoiceTemplates,
    QuoteTemplates,
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 13] = [
        Collection::Customers,
        Collection::Suppliers,
        Collection::Invoices,
        Collection::Quotes,
        Collection::Payments,
        Collection::Orders,
        Collection::Tables,
        Collection::OrderTypes,
        Collection::PaymentTypes,
        Collection::ReceiptTemplates,
        Collection::InvoiceTemplates,
        Collection::QuoteTemplates,
        Collection::Settings,
    ];

    /// Path segment, as stored in the `collection` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Customers => "customers",
            Collection::Suppliers => "suppliers",
            Collection::Invoices => "invoices",
            Collection::Quotes => "quotes",
            Collection::Payments => "payments",
            Collection::Orders => "orders",
            Collection::Tables => "tables",
            Collection::OrderTypes => "orderTypes",
            Collection::PaymentTypes => "paymentTypes",
            Collection::ReceiptTemplates => "receiptTemplates",
            Collection::InvoiceTemplates => "invoiceTemplates",
            Collection::QuoteTemplates => "quoteTemplates",
            Collection::Settings => "settings",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == segment)
    }

    /// Where templates of a kind are stored.
    pub fn for_templates(kind: TemplateKind) -> Self {
        match kind {
            TemplateKind::Receipt => Collection::ReceiptTemplates,
            TemplateKind::Invoice => Collection::InvoiceTemplates,
            TemplateKind::Quote => Collection::QuoteTemplates,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `organizations/{org}/{collection}`: the unit of subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    pub organization_id: String,
    pub collection: Collection,
}

impl CollectionPath {
    pub fn new(organization_id: impl Into<String>, collection: Collection) -> Self {
        CollectionPath {
            organization_id: organization_id.into(),
            collection,
        }
    }

    pub fn doc(&self, doc_id: impl Into<String>) -> DocumentPath {
        DocumentPath {
            organization_id: self.organization_id.clone(),
            collection: self.collection,
            doc_id: doc_id.into(),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "organizations/{}/{}", self.organization_id, self.collection)
    }
}

/// `organizations/{org}/{collection}/{doc}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub organization_id: String,
    pub collection: Collection,
    pub doc_id: String,
}

impl DocumentPath {
    pub fn new(
        organization_id: impl Into<String>,
        collection: Collection,
        doc_id: impl Into<String>,
    ) -> Self {
        DocumentPath {
            organization_id: organization_id.into(),
            collection,
            doc_id: doc_id.into(),
        }
    }

    pub fn parent(&self) -> CollectionPath {
        CollectionPath::new(self.organization_id.clone(), self.collection)
    }

    /// Parses `organizations/{org}/{collection}/{doc}`.
    pub fn parse(path: &str) -> Option<Self> {
        let mut parts = path.trim_matches('/').split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("organizations"), Some(org), Some(coll), Some(doc), None)
                if !org.is_empty() && !doc.is_empty() =>
            {
                Some(DocumentPath::new(org, Collection::from_segment(coll)?, doc))
            }
            _ => None,
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent(), self.doc_id)
    }
}
