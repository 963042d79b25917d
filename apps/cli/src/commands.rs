//! # Commands
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  command          needs            does                                 │
//! │  ───────────────  ───────────────  ──────────────────────────────────── │
//! │  render           files            document JSON + template → output   │
//! │  totals           file             recompute subtotal / tax / total    │
//! │  balance          database         paid / remaining / overpaid         │
//! │  convert-quote    database         quote → new draft invoice (1 tx)    │
//! │  move-order       database         order to another table (1 tx)       │
//! │  send-invoice     database + mail  POST to the email endpoint          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command returns its output as a string; `main` prints it.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use tillbook_core::notify::EmailRequest;
use tillbook_core::template::{CurrencyFormat, DocumentContext, Template};
use tillbook_core::{
    DocumentStatus, DocumentTotals, InvoiceStatus, LineItem, OrderStatus, Payment, QuoteStatus,
    ReceiptStatus, SalesDocument, TaxConfiguration, TemplateCategory, TemplateKind,
};
use tillbook_db::{Database, DbConfig};
use tillbook_mail::{MailClient, MailConfig};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentKind {
    Quote,
    Invoice,
    Receipt,
    Order,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a document JSON file through a template
    Render {
        document: PathBuf,
        #[arg(long)]
        template: PathBuf,
        #[arg(long, value_enum, default_value_t = DocumentKind::Invoice)]
        kind: DocumentKind,
        /// JSON array of payments to include (invoice balance keys)
        #[arg(long)]
        payments: Option<PathBuf>,
    },
    /// Recompute totals for a document JSON file
    Totals { document: PathBuf },
    /// Show the payment balance of an invoice
    Balance { invoice_id: String },
    /// Convert a quote into a new draft invoice
    ConvertQuote { quote_id: String },
    /// Move a seated order to another table
    MoveOrder { order_id: String, table_id: String },
    /// Email an invoice through the configured endpoint
    SendInvoice {
        invoice_id: String,
        email: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, default_value = "")]
        message: String,
        /// Template id; defaults to the organization's A4 invoice template
        #[arg(long)]
        template: Option<String>,
    },
}

pub async fn run(command: Command, config: &AppConfig) -> AppResult<String> {
    match command {
        Command::Render {
            document,
            template,
            kind,
            payments,
        } => {
            let document = std::fs::read_to_string(document)?;
            let template = std::fs::read_to_string(template)?;
            let payments = payments.map(std::fs::read_to_string).transpose()?;
            render(kind, &document, &template, payments.as_deref(), config.currency())
        }
        Command::Totals { document } => {
            totals(&std::fs::read_to_string(document)?, &config.currency())
        }
        Command::Balance { invoice_id } => {
            let db = open(config).await?;
            let b = db.payments().balance_for(&config.tenant(), &invoice_id).await?;
            let currency = config.currency();
            let mut out = format!(
                "total      {}\npaid       {}\nremaining  {}",
                currency.format(b.total),
                currency.format(b.paid),
                currency.format(b.remaining)
            );
            if b.is_overpaid() {
                out.push_str(&format!("\noverpaid   {}", currency.format(b.overpaid)));
            }
            Ok(out)
        }
        Command::ConvertQuote { quote_id } => {
            let db = open(config).await?;
            let invoice = db
                .sales()
                .convert_quote(&config.tenant(), &quote_id, Utc::now())
                .await?;
            Ok(format!(
                "Quote {} converted to invoice {} (due {})",
                quote_id,
                invoice.id,
                invoice
                    .due_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default()
            ))
        }
        Command::MoveOrder { order_id, table_id } => {
            let db = open(config).await?;
            let moved = db.tables().move_order(&config.tenant(), &order_id, &table_id).await?;
            Ok(format!(
                "Order {} moved from table {} to table {}",
                moved.order_id, moved.from_table_id, moved.to_table_id
            ))
        }
        Command::SendInvoice {
            invoice_id,
            email,
            subject,
            message,
            template,
        } => send_invoice(config, invoice_id, email, subject, message, template).await,
    }
}

async fn open(config: &AppConfig) -> AppResult<Database> {
    let db_config = DbConfig::new(config.database_path()?)
        .max_connections(config.database.max_connections);
    Ok(Database::new(db_config).await?)
}

// =============================================================================
// File commands
// =============================================================================

/// Renders a document of `kind` through a template.
pub fn render(
    kind: DocumentKind,
    document: &str,
    template: &str,
    payments: Option<&str>,
    currency: CurrencyFormat,
) -> AppResult<String> {
    let template = Template::parse(template)?;
    let payments: Vec<Payment> = match payments {
        Some(raw) => serde_json::from_str(raw)?,
        None => Vec::new(),
    };
    match kind {
        DocumentKind::Quote => render_as::<QuoteStatus>(document, &template, &payments, currency),
        DocumentKind::Invoice => render_as::<InvoiceStatus>(document, &template, &payments, currency),
        DocumentKind::Receipt => render_as::<ReceiptStatus>(document, &template, &payments, currency),
        DocumentKind::Order => render_as::<OrderStatus>(document, &template, &payments, currency),
    }
}

fn render_as<S: DocumentStatus + DeserializeOwned>(
    document: &str,
    template: &Template,
    payments: &[Payment],
    currency: CurrencyFormat,
) -> AppResult<String> {
    let document: SalesDocument<S> = serde_json::from_str(document)?;
    let mut context = DocumentContext::from_document(&document, currency);
    if !payments.is_empty() {
        context = context.with_payments(document.totals().total, payments);
    }
    Ok(context.render(template))
}

/// The parts of a document that totals depend on.
#[derive(Deserialize)]
struct TotalsInput {
    #[serde(default)]
    items: Vec<LineItem>,
    #[serde(default)]
    tax: TaxConfiguration,
}

pub fn totals(document: &str, currency: &CurrencyFormat) -> AppResult<String> {
    let input: TotalsInput = serde_json::from_str(document)?;
    let t = DocumentTotals::compute(&input.items, &input.tax)?;
    Ok(format!(
        "items      {}\nsubtotal   {}\ntax        {}\nbase       {}\ntotal      {}",
        input.items.len(),
        currency.format(t.subtotal),
        currency.format(t.tax_amount),
        currency.format(t.base_amount),
        currency.format(t.total)
    ))
}

// =============================================================================
// Email
// =============================================================================

async fn send_invoice(
    config: &AppConfig,
    invoice_id: String,
    email: String,
    subject: Option<String>,
    message: String,
    template: Option<String>,
) -> AppResult<String> {
    let endpoint = config.mail_endpoint().ok_or_else(|| {
        AppError::new(
            ErrorCode::MailError,
            tillbook_core::notify::SmtpErrorCode::SmtpNotConfigured.user_message(),
        )
    })?;
    let tenant = config.tenant();
    let organization_id = tenant.require()?.to_string();

    let db = open(config).await?;
    let invoice = db.sales().get::<InvoiceStatus>(&tenant, &invoice_id).await?;
    let template_id = match template {
        Some(id) => id,
        None => db
            .templates()
            .default_for(&tenant, TemplateKind::Invoice, TemplateCategory::A4)
            .await?
            .map(|t| t.id)
            .ok_or_else(|| AppError::validation("No default invoice template. Pass --template."))?,
    };

    let request = EmailRequest {
        subject: subject.unwrap_or_else(|| {
            format!("Invoice {}", invoice.number.as_deref().unwrap_or(&invoice.id))
        }),
        invoice_id,
        recipient_email: email,
        message,
        organization_id,
        template_id,
    };

    let client = MailClient::new(MailConfig::new(endpoint).timeout(config.mail_timeout()))?;
    client.send_invoice(&request).await?;
    info!(invoice_id = %request.invoice_id, "Invoice emailed");
    Ok(format!("Invoice sent to {}", request.recipient_email))
}
