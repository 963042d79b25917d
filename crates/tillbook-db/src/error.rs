//! # Database Error Types
//!
//! Error types for document store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error        serde_json::Error        CoreError                  │
//! │       │                    │                     │                      │
//! │       └────────────────────┼─────────────────────┘                      │
//! │                            ▼                                            │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AppError (apps/cli) ← code + user message                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed write leaves the store untouched: single writes are one statement
//! and multi-document writes run in one transaction.

use thiserror::Error;
use tillbook_core::CoreError;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Document not found.
    ///
    /// ## When This Occurs
    /// - Unknown document id
    /// - Document belongs to another organization
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `create` on an id that already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: String, id: String },

    /// A domain rule rejected the operation (status move, missing tenant,
    /// invalid amount). Nothing was written.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Stored JSON does not match the expected shape.
    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A multi-document transaction could not commit; all of it was rolled back.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Subscription channel closed underneath a listener.
    #[error("Subscription closed: {0}")]
    SubscriptionClosed(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an AlreadyExists error.
    pub fn already_exists(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::AlreadyExists {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether the operation failed a domain rule rather than storage.
    pub fn is_rejected(&self) -> bool {
        matches!(self, DbError::Core(_))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → AlreadyExists on a primary key clash,
///                               QueryFailed otherwise
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Document", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // "UNIQUE constraint failed: documents.organization_id, ..."
                if msg.contains("UNIQUE constraint failed") {
                    DbError::already_exists("Document", msg)
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
