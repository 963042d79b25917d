//! Data bags for document templates.
//!
//! Templates never format numbers themselves. Every amount is turned into a
//! display string here, with the tenant's currency settings, before rendering.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::Template;
use crate::balance::balance;
use crate::money::{Money, TaxRate};
use crate::status::DocumentStatus;
use crate::types::{LineItem, Payment, PaymentMethod, SalesDocument};

const DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Currency Format
// =============================================================================

/// Where the currency symbol goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolPosition {
    /// `$12.34`
    #[default]
    Before,
    /// `12.34 SAR`
    After,
}

/// Tenant currency display settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyFormat {
    pub symbol: String,
    #[serde(default)]
    pub position: SymbolPosition,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        CurrencyFormat {
            symbol: "$".to_string(),
            position: SymbolPosition::Before,
        }
    }
}

impl CurrencyFormat {
    pub fn new(symbol: impl Into<String>, position: SymbolPosition) -> Self {
        CurrencyFormat {
            symbol: symbol.into(),
            position,
        }
    }

    /// Formats an amount, sign first: `-$12.34`, `-12.34 SAR`.
    pub fn format(&self, amount: Money) -> String {
        let sign = if amount.is_negative() { "-" } else { "" };
        let digits = amount.abs().to_string();
        match self.position {
            SymbolPosition::Before => format!("{}{}{}", sign, self.symbol, digits),
            SymbolPosition::After => format!("{}{} {}", sign, digits, self.symbol),
        }
    }
}

/// `1500` → `"15"`, `825` → `"8.25"`, `850` → `"8.5"`.
fn format_rate(rate: TaxRate) -> String {
    let bps = rate.bps();
    let (whole, frac) = (bps / 100, bps % 100);
    if frac == 0 {
        whole.to_string()
    } else if frac % 10 == 0 {
        format!("{}.{}", whole, frac / 10)
    } else {
        format!("{}.{:02}", whole, frac)
    }
}

fn method_label(method: &PaymentMethod) -> &str {
    match method {
        PaymentMethod::Cash => "Cash",
        PaymentMethod::Card => "Card",
        PaymentMethod::BankTransfer => "Bank transfer",
        PaymentMethod::Other(name) => name,
    }
}

// =============================================================================
// Document Context
// =============================================================================

/// Builder for the flat key/value bag a document template renders against.
///
/// ## Keys set by [`DocumentContext::from_document`]
/// ```text
/// id number customerName status date dueDate clientVat notes tableName
/// items[] { name description kind quantity unitPrice total }  itemCount
/// subtotal taxRate taxAmount baseAmount total hasTax taxInclusive hasNotes
/// ```
/// [`DocumentContext::with_payments`] adds
/// `payments[] { amount method date reference }`, `paid`, `remaining`,
/// `overpaid`, `hasOverpayment` and `isPaid`.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    currency: CurrencyFormat,
    data: Map<String, Value>,
}

impl DocumentContext {
    pub fn new(currency: CurrencyFormat) -> Self {
        DocumentContext {
            currency,
            data: Map::new(),
        }
    }

    /// Context for one sales document.
    pub fn from_document<S: DocumentStatus>(
        document: &SalesDocument<S>,
        currency: CurrencyFormat,
    ) -> Self {
        let totals = *document.totals();
        let tax = *document.tax();
        let ctx = DocumentContext::new(currency);

        let items: Vec<Value> = document
            .items()
            .iter()
            .map(|item| ctx.item_row(item))
            .collect();

        ctx.with("id", document.id.as_str())
            .with("number", document.number.clone())
            .with("customerName", document.customer_name.clone())
            .with("status", document.status().as_str())
            .with("date", document.created_at.format(DATE_FORMAT).to_string())
            .with(
                "dueDate",
                document
                    .due_date
                    .map(|d| d.format(DATE_FORMAT).to_string()),
            )
            .with("clientVat", document.client_vat.clone())
            .with("notes", document.notes.clone())
            .with("hasNotes", document.notes.as_deref().is_some_and(|n| !n.trim().is_empty()))
            .with("tableName", document.table.as_ref().map(|t| t.table_name.clone()))
            .with("itemCount", items.len())
            .with("items", items)
            .with_money("subtotal", totals.subtotal)
            .with("taxRate", format_rate(tax.effective_rate()))
            .with_money("taxAmount", totals.tax_amount)
            .with_money("baseAmount", totals.base_amount)
            .with_money("total", totals.total)
            .with("hasTax", !totals.tax_amount.is_zero())
            .with("taxInclusive", tax.inclusive)
    }

    fn item_row(&self, item: &LineItem) -> Value {
        json!({
            "name": item.name,
            "description": item.description,
            "kind": item.kind,
            "quantity": item.quantity(),
            "unitPrice": self.currency.format(item.unit_price()),
            "total": self.currency.format(item.total()),
        })
    }

    /// Sets a raw value. `None` becomes null and renders as empty.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Sets a pre-formatted amount.
    pub fn with_money(self, key: impl Into<String>, amount: Money) -> Self {
        let formatted = self.currency.format(amount);
        self.with(key, formatted)
    }

    /// Adds the payment rows and balance keys for a document total.
    pub fn with_payments(self, document_total: Money, payments: &[Payment]) -> Self {
        let b = balance(document_total, payments);
        let rows: Vec<Value> = payments
            .iter()
            .map(|p| {
                json!({
                    "amount": self.currency.format(p.amount),
                    "method": method_label(&p.method),
                    "date": p.date.format(DATE_FORMAT).to_string(),
                    "reference": p.reference,
                })
            })
            .collect();

        self.with("payments", rows)
            .with_money("paid", b.paid)
            .with_money("remaining", b.remaining)
            .with_money("overpaid", b.overpaid)
            .with("hasOverpayment", b.is_overpaid())
            .with("isPaid", b.remaining.is_zero())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn render(&self, template: &Template) -> String {
        template.render(&Value::Object(self.data.clone()))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::totals::TaxConfiguration;
    use crate::types::{Invoice, ItemKind};
    use chrono::{TimeZone, Utc};

    fn invoice() -> Invoice {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let mut inv = Invoice::new("inv-1", TaxConfiguration::exclusive(TaxRate::from_bps(1500)), created);
        inv.number = Some("INV-0001".to_string());
        inv.add_item(LineItem::new("l1", "Tea", ItemKind::Product, 2, Money::from_cents(250)).unwrap())
            .unwrap();
        inv.add_item(LineItem::new("l2", "Cake", ItemKind::Product, 1, Money::from_cents(500)).unwrap())
            .unwrap();
        inv
    }

    #[test]
    fn test_currency_format() {
        let usd = CurrencyFormat::default();
        assert_eq!(usd.format(Money::from_cents(1234)), "$12.34");
        assert_eq!(usd.format(Money::from_cents(-550)), "-$5.50");

        let sar = CurrencyFormat::new("SAR", SymbolPosition::After);
        assert_eq!(sar.format(Money::from_cents(1234)), "12.34 SAR");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(TaxRate::from_bps(1500)), "15");
        assert_eq!(format_rate(TaxRate::from_bps(825)), "8.25");
        assert_eq!(format_rate(TaxRate::from_bps(850)), "8.5");
        assert_eq!(format_rate(TaxRate::zero()), "0");
    }

    #[test]
    fn test_from_document_keys() {
        let ctx = DocumentContext::from_document(&invoice(), CurrencyFormat::default());
        assert_eq!(ctx.get("subtotal"), Some(&json!("$10.00")));
        assert_eq!(ctx.get("taxAmount"), Some(&json!("$1.50")));
        assert_eq!(ctx.get("total"), Some(&json!("$11.50")));
        assert_eq!(ctx.get("date"), Some(&json!("2024-03-01")));
        assert_eq!(ctx.get("hasTax"), Some(&json!(true)));
        assert_eq!(ctx.get("hasNotes"), Some(&json!(false)));
        assert_eq!(ctx.get("dueDate"), Some(&Value::Null));
    }

    #[test]
    fn test_renders_full_receipt() {
        let template = Template::parse(
            "#{{number}}\n{{#each items}}{{quantity}}x {{name}} {{total}}\n{{/each}}\
             {{#hasTax}}VAT {{taxRate}}%: {{taxAmount}}\n{{/hasTax}}TOTAL {{total}}\
             {{#hasOverpayment}} change {{overpaid}}{{/hasOverpayment}}",
        )
        .unwrap();

        let inv = invoice();
        let paid = Payment::new("inv-1", Money::from_cents(2000), PaymentMethod::Cash, Utc::now()).unwrap();
        let ctx = DocumentContext::from_document(&inv, CurrencyFormat::default())
            .with_payments(inv.totals().total, &[paid]);

        assert_eq!(
            ctx.render(&template),
            "#INV-0001\n2x Tea $5.00\n1x Cake $5.00\nVAT 15%: $1.50\nTOTAL $11.50 change $8.50"
        );
    }

    #[test]
    fn test_document_keys_stay_out_of_item_rows() {
        let mut inv = invoice();
        inv.notes = Some("Thank you".to_string());
        let template = Template::parse(
            "{{#each items}}{{name}}{{#hasNotes}} [{{notes}}]{{/hasNotes}};{{/each}}{{#hasNotes}}{{notes}}{{/hasNotes}}",
        )
        .unwrap();

        let out = DocumentContext::from_document(&inv, CurrencyFormat::default()).render(&template);
        assert_eq!(out, "Tea;Cake;Thank you");
    }
}
