//! # Application Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILLBOOK_DB_PATH, TILLBOOK_ORG_ID,                                 │
//! │     TILLBOOK_MAIL_ENDPOINT, TILLBOOK_CURRENCY                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or the platform config dir:                       │
//! │     ~/.config/tillbook/tillbook.toml (Linux)                           │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/tillbook/tillbook.db"
//! max_connections = 5
//!
//! [organization]
//! id = "org-1"
//!
//! [mail]
//! endpoint = "https://api.example.com/send-invoice-email"
//! timeout_secs = 30
//!
//! [display]
//! currency_symbol = "SAR"
//! symbol_position = "after"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use tillbook_core::template::{CurrencyFormat, SymbolPosition};
use tillbook_core::TenantContext;

const CONFIG_FILE: &str = "tillbook.toml";
const DB_FILE: &str = "tillbook.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationSettings {
    /// Organization every command works in.
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSettings {
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

fn default_mail_timeout() -> u64 {
    30
}

impl Default for MailSettings {
    fn default() -> Self {
        MailSettings {
            endpoint: None,
            timeout_secs: default_mail_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    #[serde(default)]
    pub symbol_position: SymbolPosition,
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            currency_symbol: default_currency_symbol(),
            symbol_position: SymbolPosition::default(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub organization: OrganizationSettings,

    #[serde(default)]
    pub mail: MailSettings,

    #[serde(default)]
    pub display: DisplaySettings,
}

impl AppConfig {
    /// Loads configuration.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                config = toml::from_str(&std::fs::read_to_string(&path)?)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads config, falling back to defaults plus environment on error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            let mut config = Self::default();
            config.apply_overrides(|key| std::env::var(key).ok());
            config
        })
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(endpoint) = &self.mail.endpoint {
            let url = Url::parse(endpoint)
                .map_err(|e| ConfigError::Invalid(format!("mail.endpoint '{}': {}", endpoint, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "mail.endpoint must be http(s), got: {}",
                    endpoint
                )));
            }
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be at least 1".into()));
        }
        if self.mail.timeout_secs == 0 {
            return Err(ConfigError::Invalid("mail.timeout_secs must be greater than 0".into()));
        }
        if self.display.currency_symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("display.currency_symbol is empty".into()));
        }
        Ok(())
    }

    /// Applies `TILLBOOK_*` overrides from `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TILLBOOK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(org) = lookup("TILLBOOK_ORG_ID") {
            debug!(org = %org, "Overriding organization from environment");
            self.organization.id = org;
        }
        if let Some(endpoint) = lookup("TILLBOOK_MAIL_ENDPOINT") {
            self.mail.endpoint = Some(endpoint);
        }
        if let Some(symbol) = lookup("TILLBOOK_CURRENCY") {
            self.display.currency_symbol = symbol;
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "tillbook", "tillbook")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The database file, creating the default data directory if needed.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        let dirs = Self::project_dirs()
            .ok_or_else(|| ConfigError::Invalid("Could not determine app data directory".into()))?;
        std::fs::create_dir_all(dirs.data_dir())?;
        Ok(dirs.data_dir().join(DB_FILE))
    }

    pub fn tenant(&self) -> TenantContext {
        TenantContext::new(self.organization.id.clone())
    }

    pub fn currency(&self) -> CurrencyFormat {
        CurrencyFormat::new(self.display.currency_symbol.clone(), self.display.symbol_position)
    }

    pub fn mail_endpoint(&self) -> Option<Url> {
        self.mail.endpoint.as_deref().and_then(|e| Url::parse(e).ok())
    }

    pub fn mail_timeout(&self) -> Duration {
        Duration::from_secs(self.mail.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.display.currency_symbol, "$");
        assert_eq!(config.mail.timeout_secs, 30);
        assert!(config.tenant().require().is_err());
    }

    #[test]
    fn test_file_then_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
            [organization]
            id = "org-file"

            [display]
            currency_symbol = "SAR"
            symbol_position = "after"
            "#,
        )
        .unwrap();

        let mut config: AppConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.organization.id, "org-file");
        assert_eq!(config.display.symbol_position, SymbolPosition::After);

        let env: HashMap<&str, &str> = [("TILLBOOK_ORG_ID", "org-env"), ("TILLBOOK_DB_PATH", "/tmp/t.db")]
            .into_iter()
            .collect();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.organization.id, "org-env");
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/t.db"));
        assert_eq!(config.display.currency_symbol, "SAR");
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.mail.endpoint = Some("smtp://mail.example.com".to_string());
        assert!(config.validate().is_err());

        config.mail.endpoint = Some("https://api.example.com/send".to_string());
        assert!(config.validate().is_ok());
        assert!(config.mail_endpoint().is_some());

        config.mail.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.organization.id = "org-saved".to_string();
        config.save(&path).unwrap();

        let loaded: AppConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.organization.id, "org-saved");
    }

    #[test]
    fn test_broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[organization\nid = ").unwrap();
        assert!(matches!(AppConfig::load(Some(path)), Err(ConfigError::Parse(_))));
    }
}
