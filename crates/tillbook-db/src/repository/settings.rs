//! # Settings Repository
//!
//! Per-organization settings documents:
//!
//! ```text
//! organizations/{org}/settings/vat       → TaxConfiguration
//! organizations/{org}/settings/printer   → PrinterSettings
//! ```
//!
//! A missing document reads as its default, so a fresh organization works
//! without seeding.

use serde::{Deserialize, Serialize};
use tracing::info;

use tillbook_core::validation::validate_tax_rate_bps;
use tillbook_core::{CoreError, TaxConfiguration, TemplateCategory, TenantContext};

use crate::error::DbResult;
use crate::path::Collection;
use crate::store::DocumentStore;

const VAT: &str = "vat";
const PRINTER: &str = "printer";

/// Receipt printing preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrinterSettings {
    pub paper: TemplateCategory,
    pub receipt_template_id: Option<String>,
    pub copies: u32,
    pub auto_print: bool,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        PrinterSettings {
            paper: TemplateCategory::Thermal,
            receipt_template_id: None,
            copies: 1,
            auto_print: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    store: DocumentStore,
}

impl SettingsRepository {
    pub fn new(store: DocumentStore) -> Self {
        SettingsRepository { store }
    }

    /// The organization's tax configuration (`settings/vat`).
    pub async fn tax(&self, tenant: &TenantContext) -> DbResult<TaxConfiguration> {
        Ok(self
            .store
            .get(tenant, Collection::Settings, VAT)
            .await?
            .unwrap_or_default())
    }

    pub async fn set_tax(&self, tenant: &TenantContext, tax: &TaxConfiguration) -> DbResult<()> {
        validate_tax_rate_bps(tax.rate.bps()).map_err(CoreError::from)?;
        self.store.set(tenant, Collection::Settings, VAT, tax).await?;
        info!(rate_bps = tax.rate.bps(), inclusive = tax.inclusive, enabled = tax.enabled, "Tax settings updated");
        Ok(())
    }

    pub async fn printer(&self, tenant: &TenantContext) -> DbResult<PrinterSettings> {
        Ok(self
            .store
            .get(tenant, Collection::Settings, PRINTER)
            .await?
            .unwrap_or_default())
    }

    pub async fn set_printer(&self, tenant: &TenantContext, printer: &PrinterSettings) -> DbResult<()> {
        if printer.copies == 0 {
            return Err(CoreError::invalid_input("copies", "must be at least 1").into());
        }
        self.store
            .set(tenant, Collection::Settings, PRINTER, printer)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tillbook_core::TaxRate;

    async fn setup() -> (SettingsRepository, TenantContext) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        (db.settings(), TenantContext::new("org-1"))
    }

    #[tokio::test]
    async fn test_missing_settings_read_as_defaults() {
        let (repo, org) = setup().await;
        assert_eq!(repo.tax(&org).await.unwrap(), TaxConfiguration::default());
        assert_eq!(repo.printer(&org).await.unwrap().copies, 1);
    }

    #[tokio::test]
    async fn test_tax_round_trip() {
        let (repo, org) = setup().await;
        let vat = TaxConfiguration::inclusive(TaxRate::from_bps(1500));
        repo.set_tax(&org, &vat).await.unwrap();
        assert_eq!(repo.tax(&org).await.unwrap(), vat);
    }

    #[tokio::test]
    async fn test_invalid_printer_settings_rejected() {
        let (repo, org) = setup().await;
        let printer = PrinterSettings {
            copies: 0,
            ..PrinterSettings::default()
        };
        assert!(repo.set_printer(&org, &printer).await.unwrap_err().is_rejected());
    }
}
