//! # Session Repository
//!
//! Device-local key/value storage (the `kv` table). Not tenant-scoped and
//! never published to subscribers.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use tillbook_core::session::{OrderSession, SessionKey};

use crate::error::DbResult;
use crate::store::timestamp;

#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((raw,)) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> DbResult<()> {
        let raw = serde_json::to_string(value)?;
        debug!(key = %key, bytes = raw.len(), "Saving session value");
        sqlx::query(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(raw)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM kv WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The saved in-progress order.
    ///
    /// A value that no longer parses is discarded rather than blocking the
    /// register.
    pub async fn load_order_session(&self) -> DbResult<Option<OrderSession>> {
        match self.get(SessionKey::CURRENT_ORDER).await {
            Ok(session) => Ok(session),
            Err(crate::DbError::Serialization(e)) => {
                warn!(error = %e, "Discarding unreadable order session");
                self.remove(SessionKey::CURRENT_ORDER).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Saves the order, or clears the key when the order is empty.
    pub async fn save_order_session(&self, session: &OrderSession) -> DbResult<()> {
        if session.is_empty() {
            self.remove(SessionKey::CURRENT_ORDER).await?;
            return Ok(());
        }
        self.set(SessionKey::CURRENT_ORDER, session).await
    }
}
