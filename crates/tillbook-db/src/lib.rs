//! # tillbook-db: Document Store for Tillbook
//!
//! Tenant-scoped JSON documents on SQLite (via sqlx), with realtime
//! collection subscriptions and the multi-document transactions of the
//! register: quote conversion, table moves and table release.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tillbook CLI command                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tillbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌────────────────┐    │   │
//! │  │   │  Database    │   │ Repositories  │   │ DocumentStore  │    │   │
//! │  │   │  (pool.rs)   │──►│ sales payment │──►│ + Subscription │    │   │
//! │  │   │  migrations  │   │ table template│   │   Manager      │    │   │
//! │  │   └──────────────┘   └───────────────┘   └────────────────┘    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  documents (org, collection, doc_id, data JSON)      kv (session)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`path`] - `organizations/{org}/{collection}/{doc}` addressing
//! - [`store`] - Document reads, writes and publishing
//! - [`subscription`] - Refcounted collection listeners
//! - [`repository`] - Typed repositories
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tillbook_db::{Collection, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tillbook.db")).await?;
//! let tenant = TenantContext::new("org-1");
//!
//! let mut tables = db.store().subscribe(&tenant, Collection::Tables).await?;
//! db.tables().move_order(&tenant, "order-7", "table-b").await?;
//! let fresh = tables.changed().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod path;
pub mod pool;
pub mod repository;
pub mod store;
pub mod subscription;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use path::{Collection, CollectionPath, DocumentPath};
pub use pool::{Database, DbConfig};
pub use store::DocumentStore;
pub use subscription::{Snapshot, StoredDocument, Subscription, SubscriptionManager};

pub use repository::{
    PaymentRepository, PrinterSettings, SalesCollection, SalesRepository, SessionRepository,
    SettingsRepository, TableMove, TableRepository, TemplateRepository,
};
