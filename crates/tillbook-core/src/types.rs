//! # Domain Types
//!
//! Core domain types shared by quotes, invoices, receipts and orders.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐    ┌─────────────────┐   ┌─────────────────┐ │
//! │  │  SalesDocument<S>    │    │    LineItem     │   │    Payment      │ │
//! │  │  ──────────────────  │ 1:n│  ─────────────  │   │  ─────────────  │ │
//! │  │  items ──────────────┼───►│  quantity       │   │  document_id ───┼─┐
//! │  │  tax                 │    │  unit_price     │   │  amount         │ │
//! │  │  totals (derived)    │    │  total (derived)│   │  method         │ │
//! │  │  status: S           │    └─────────────────┘   └─────────────────┘ │
//! │  └──────────▲───────────┘                                              │
//! │             └──────────────── looked up by foreign key ◄───────────────┘
//! │                                                                         │
//! │  Quote = SalesDocument<QuoteStatus>   Invoice = SalesDocument<...>     │
//! │  Receipt, Order likewise                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Derived amounts (`LineItem::total`, `SalesDocument::totals`) have no
//! setters. They are recomputed by every mutator and again on deserialize,
//! so a stale total can never be displayed or persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::status::{
    transition, DocumentStatus, InvoiceStatus, OrderStatus, QuoteStatus, ReceiptStatus,
    TableStatus,
};
use crate::totals::{compute_line_total, DocumentTotals, TaxConfiguration};
use crate::validation::{validate_name, validate_price, validate_quantity};

// =============================================================================
// Tenant Context
// =============================================================================

/// The organization every read and write is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub organization_id: String,
}

impl TenantContext {
    pub fn new(organization_id: impl Into<String>) -> Self {
        TenantContext {
            organization_id: organization_id.into(),
        }
    }

    /// Returns the organization id, or `MissingTenant` when none is active.
    pub fn require(&self) -> CoreResult<&str> {
        let id = self.organization_id.trim();
        if id.is_empty() {
            Err(CoreError::MissingTenant)
        } else {
            Ok(id)
        }
    }
}

// =============================================================================
// Catalog Items
// =============================================================================

/// Discriminant carried by every line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ItemKind {
    #[default]
    Product,
    Service,
}

/// Something that can be sold, tagged by `kind`.
///
/// ```json
/// { "kind": "product", "id": "p1", "name": "Latte", "price": 450 }
/// { "kind": "service", "id": "s1", "name": "Consulting", "rate": 9000, "unitLabel": "hour" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum CatalogItem {
    #[serde(rename_all = "camelCase")]
    Product {
        id: String,
        name: String,
        price: Money,
        #[serde(default)]
        sku: Option<String>,
        #[serde(default)]
        category: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Service {
        id: String,
        name: String,
        rate: Money,
        #[serde(default)]
        unit_label: Option<String>,
        #[serde(default)]
        category: Option<String>,
    },
}

impl CatalogItem {
    pub fn id(&self) -> &str {
        match self {
            CatalogItem::Product { id, .. } | CatalogItem::Service { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogItem::Product { name, .. } | CatalogItem::Service { name, .. } => name,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            CatalogItem::Product { .. } => ItemKind::Product,
            CatalogItem::Service { .. } => ItemKind::Service,
        }
    }

    /// Price of one unit.
    pub fn unit_price(&self) -> Money {
        match self {
            CatalogItem::Product { price, .. } => *price,
            CatalogItem::Service { rate, .. } => *rate,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            CatalogItem::Product { category, .. } | CatalogItem::Service { category, .. } => {
                category.as_deref()
            }
        }
    }

    /// Creates a fresh line for this item, freezing name and price.
    pub fn to_line_item(&self, quantity: i64) -> CoreResult<LineItem> {
        let mut line = LineItem::new(
            uuid::Uuid::new_v4().to_string(),
            self.name(),
            self.kind(),
            quantity,
            self.unit_price(),
        )?;
        line.catalog_id = Some(self.id().to_string());
        Ok(line)
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A single row of a sales document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineItem {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: ItemKind,
    /// Catalog entry this line was created from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    quantity: i64,
    unit_price: Money,
    total: Money,
}

/// Wire shape of a line item; `total` is accepted but ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineItemRecord {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    kind: ItemKind,
    #[serde(default)]
    catalog_id: Option<String>,
    quantity: i64,
    unit_price: Money,
}

impl<'de> Deserialize<'de> for LineItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = LineItemRecord::deserialize(deserializer)?;
        let mut item = LineItem::new(
            record.id,
            record.name,
            record.kind,
            record.quantity,
            record.unit_price,
        )
        .map_err(serde::de::Error::custom)?;
        item.description = record.description;
        item.catalog_id = record.catalog_id;
        Ok(item)
    }
}

/// Line total after the range checks applied to every quantity and price.
fn checked_line_total(quantity: i64, unit_price: Money) -> CoreResult<Money> {
    let total = compute_line_total(quantity, unit_price)?;
    validate_quantity(quantity)?;
    validate_price(unit_price)?;
    Ok(total)
}

impl LineItem {
    /// Creates a line item, validating name, quantity and price.
    ///
    /// ## Errors
    /// - `InvalidInput` when `quantity < 1` or `unit_price < 0`
    /// - `Validation` for an empty name, more than `MAX_ITEM_QUANTITY`, or a
    ///   price above `MAX_UNIT_PRICE`
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ItemKind,
        quantity: i64,
        unit_price: Money,
    ) -> CoreResult<Self> {
        let name = name.into();
        let total = checked_line_total(quantity, unit_price)?;
        validate_name(&name)?;
        Ok(LineItem {
            id: id.into(),
            name,
            description: None,
            kind,
            catalog_id: None,
            quantity,
            unit_price,
            total,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[inline]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// quantity × unit price, always current.
    #[inline]
    pub fn total(&self) -> Money {
        self.total
    }

    /// Changes the quantity; the line is left untouched on error.
    pub fn set_quantity(&mut self, quantity: i64) -> CoreResult<()> {
        self.total = checked_line_total(quantity, self.unit_price)?;
        self.quantity = quantity;
        Ok(())
    }

    /// Changes the unit price; the line is left untouched on error.
    pub fn set_unit_price(&mut self, unit_price: Money) -> CoreResult<()> {
        self.total = checked_line_total(self.quantity, unit_price)?;
        self.unit_price = unit_price;
        Ok(())
    }
}

// =============================================================================
// Sales Document
// =============================================================================

/// Table reference stored on dine-in orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TableRef {
    pub table_id: String,
    pub table_name: String,
}

/// Shared shape of quotes, invoices, receipts and orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesDocument<S> {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    items: Vec<LineItem>,
    tax: TaxConfiguration,
    totals: DocumentTotals,
    status: S,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Customer VAT registration number printed on invoices.
    pub client_vat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Quote an invoice was converted from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_quote_id: Option<String>,
    /// Dine-in orders only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_type_id: Option<String>,
}

pub type Quote = SalesDocument<QuoteStatus>;
pub type Invoice = SalesDocument<InvoiceStatus>;
pub type Receipt = SalesDocument<ReceiptStatus>;
pub type Order = SalesDocument<OrderStatus>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SalesDocumentRecord<S> {
    id: String,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    items: Vec<LineItem>,
    #[serde(default)]
    tax: TaxConfiguration,
    status: S,
    created_at: DateTime<Utc>,
    #[serde(default)]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    client_vat: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    source_quote_id: Option<String>,
    #[serde(default)]
    table: Option<TableRef>,
    #[serde(default)]
    order_type_id: Option<String>,
}

impl<'de, S: Deserialize<'de>> Deserialize<'de> for SalesDocument<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let r = SalesDocumentRecord::<S>::deserialize(deserializer)?;
        let totals =
            DocumentTotals::compute(&r.items, &r.tax).map_err(serde::de::Error::custom)?;
        Ok(SalesDocument {
            id: r.id,
            number: r.number,
            customer_id: r.customer_id,
            customer_name: r.customer_name,
            items: r.items,
            tax: r.tax,
            totals,
            status: r.status,
            created_at: r.created_at,
            due_date: r.due_date,
            client_vat: r.client_vat,
            notes: r.notes,
            source_quote_id: r.source_quote_id,
            table: r.table,
            order_type_id: r.order_type_id,
        })
    }
}

fn find_item<'a>(items: &'a mut [LineItem], item_id: &str) -> CoreResult<&'a mut LineItem> {
    items
        .iter_mut()
        .find(|i| i.id == item_id)
        .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))
}

impl<S: DocumentStatus + Default> SalesDocument<S> {
    /// Creates an empty document in the initial status.
    pub fn new(id: impl Into<String>, tax: TaxConfiguration, created_at: DateTime<Utc>) -> Self {
        SalesDocument {
            id: id.into(),
            number: None,
            customer_id: None,
            customer_name: None,
            items: Vec::new(),
            tax,
            totals: DocumentTotals::default(),
            status: S::default(),
            created_at,
            due_date: None,
            client_vat: None,
            notes: None,
            source_quote_id: None,
            table: None,
            order_type_id: None,
        }
    }
}

impl<S: DocumentStatus> SalesDocument<S> {
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn tax(&self) -> &TaxConfiguration {
        &self.tax
    }

    pub fn totals(&self) -> &DocumentTotals {
        &self.totals
    }

    pub fn status(&self) -> S {
        self.status
    }

    fn ensure_editable(&self) -> CoreResult<()> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(CoreError::NotEditable {
                entity: S::ENTITY,
                status: self.status.as_str(),
            })
        }
    }

    /// Applies `edit` to copies of the lines and tax, and commits them only
    /// when the edit and the new totals both succeed.
    fn edit<T>(
        &mut self,
        edit: impl FnOnce(&mut Vec<LineItem>, &mut TaxConfiguration) -> CoreResult<T>,
    ) -> CoreResult<T> {
        self.ensure_editable()?;
        let mut items = self.items.clone();
        let mut tax = self.tax;
        let out = edit(&mut items, &mut tax)?;
        self.totals = DocumentTotals::compute(&items, &tax)?;
        self.items = items;
        self.tax = tax;
        Ok(out)
    }

    /// Appends a line.
    pub fn add_item(&mut self, item: LineItem) -> CoreResult<()> {
        self.edit(|items, _| {
            items.push(item);
            Ok(())
        })
    }

    /// Removes a line and returns it.
    pub fn remove_item(&mut self, item_id: &str) -> CoreResult<LineItem> {
        self.edit(|items, _| {
            let index = items
                .iter()
                .position(|i| i.id == item_id)
                .ok_or_else(|| CoreError::ItemNotFound(item_id.to_string()))?;
            Ok(items.remove(index))
        })
    }

    pub fn update_item_quantity(&mut self, item_id: &str, quantity: i64) -> CoreResult<()> {
        self.edit(|items, _| find_item(items, item_id)?.set_quantity(quantity))
    }

    pub fn update_item_price(&mut self, item_id: &str, unit_price: Money) -> CoreResult<()> {
        self.edit(|items, _| find_item(items, item_id)?.set_unit_price(unit_price))
    }

    /// Replaces the tax configuration (rate change in the form).
    pub fn set_tax(&mut self, tax: TaxConfiguration) -> CoreResult<()> {
        self.edit(|_, current| {
            *current = tax;
            Ok(())
        })
    }

    /// Moves to `next` if the state machine allows it.
    pub fn transition_to(&mut self, next: S) -> CoreResult<()> {
        self.status = transition(self.status, next)?;
        Ok(())
    }

    /// Builds a document of another type carrying the same lines.
    pub(crate) fn with_items_as<T: DocumentStatus + Default>(
        &self,
        id: impl Into<String>,
        tax: TaxConfiguration,
        created_at: DateTime<Utc>,
    ) -> CoreResult<SalesDocument<T>> {
        let mut doc = SalesDocument::<T>::new(id, tax, created_at);
        doc.customer_id = self.customer_id.clone();
        doc.customer_name = self.customer_name.clone();
        doc.notes = self.notes.clone();
        doc.totals = DocumentTotals::compute(&self.items, &tax)?;
        doc.items = self.items.clone();
        Ok(doc)
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    /// Tenant-defined payment type, by name.
    Other(String),
}

/// A payment against a document, linked by `document_id`.
///
/// The document does not own its payments; they are looked up by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub document_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Payment {
    /// Creates a payment; the amount must not be negative.
    pub fn new(
        document_id: impl Into<String>,
        amount: Money,
        method: PaymentMethod,
        date: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if amount.is_negative() {
            return Err(CoreError::invalid_input(
                "payment amount",
                format!("must not be negative, got {}", amount),
            ));
        }
        Ok(Payment {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.into(),
            amount,
            method,
            date,
            reference: None,
        })
    }
}

// =============================================================================
// Table
// =============================================================================

/// A dining table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Table {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
    pub status: TableStatus,
    #[serde(default)]
    pub current_order_id: Option<String>,
}

impl Table {
    pub fn new(id: impl Into<String>, name: impl Into<String>, capacity: u32) -> Self {
        Table {
            id: id.into(),
            name: name.into(),
            capacity,
            status: TableStatus::Available,
            current_order_id: None,
        }
    }

    /// Seats an order; only an available table accepts one.
    pub fn occupy(&mut self, order_id: impl Into<String>) -> CoreResult<()> {
        if self.status != TableStatus::Available {
            return Err(CoreError::InvalidTransition {
                entity: TableStatus::ENTITY,
                from: self.status.as_str(),
                to: TableStatus::Occupied.as_str(),
            });
        }
        self.status = transition(self.status, TableStatus::Occupied)?;
        self.current_order_id = Some(order_id.into());
        Ok(())
    }

    /// Frees an occupied table.
    pub fn release(&mut self) -> CoreResult<()> {
        if self.status != TableStatus::Occupied {
            return Err(CoreError::InvalidTransition {
                entity: TableStatus::ENTITY,
                from: self.status.as_str(),
                to: TableStatus::Available.as_str(),
            });
        }
        self.status = TableStatus::Available;
        self.current_order_id = None;
        Ok(())
    }

    pub fn to_ref(&self) -> TableRef {
        TableRef {
            table_id: self.id.clone(),
            table_name: self.name.clone(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Which document a template prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TemplateKind {
    Receipt,
    Invoice,
    Quote,
}

/// Paper format of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TemplateCategory {
    /// 58/80mm receipt roll.
    Thermal,
    #[default]
    A4,
}

/// A stored, user-editable template body.
///
/// At most one template per (kind, category) is the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DocumentTemplate {
    pub id: String,
    pub name: String,
    pub kind: TemplateKind,
    #[serde(default)]
    pub category: TemplateCategory,
    /// Locale tag used only to pick a variant, e.g. "en" or "ar".
    #[serde(default = "default_locale")]
    pub locale: String,
    pub content: String,
    #[serde(default)]
    pub is_default: bool,
}

fn default_locale() -> String {
    "en".to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
