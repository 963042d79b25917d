//! # Document Store
//!
//! Tenant-scoped JSON documents on SQLite, with snapshot reads and
//! replace-on-change publishing to subscribers.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create / set / delete (TenantContext, Collection, id)                  │
//! │       │                                                                 │
//! │       ├── tenant.require()?      ← rejected before anything is written  │
//! │       ▼                                                                 │
//! │  single statement (or one transaction for multi-document writes)       │
//! │       │                                                                 │
//! │       ▼ committed                                                       │
//! │  notify(paths) ── listeners? ── re-read full collection ── publish      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `set` is a last-writer-wins full replace. There is no optimistic
//! concurrency and no retry.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use tillbook_core::TenantContext;

use crate::error::{DbError, DbResult};
use crate::path::{Collection, CollectionPath, DocumentPath};
use crate::subscription::{Snapshot, StoredDocument, Subscription, SubscriptionManager};

/// Stored timestamps sort lexically in creation order.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::Internal(format!("bad timestamp '{}': {}", raw, e)))
}

// =============================================================================
// Connection-level operations
// =============================================================================
// Shared by single writes and by multi-document transactions
// (`&mut *tx` derefs to a `SqliteConnection`).

pub(crate) async fn read_doc(
    conn: &mut SqliteConnection,
    path: &DocumentPath,
) -> DbResult<Option<Value>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT data FROM documents WHERE organization_id = ?1 AND collection = ?2 AND doc_id = ?3",
    )
    .bind(&path.organization_id)
    .bind(path.collection.as_str())
    .bind(&path.doc_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|(data,)| serde_json::from_str(&data).map_err(DbError::from))
        .transpose()
}

pub(crate) async fn read_typed<T: DeserializeOwned>(
    conn: &mut SqliteConnection,
    path: &DocumentPath,
    entity: &str,
) -> DbResult<T> {
    let value = read_doc(conn, path)
        .await?
        .ok_or_else(|| DbError::not_found(entity, &path.doc_id))?;
    Ok(serde_json::from_value(value)?)
}

pub(crate) async fn insert_doc(
    conn: &mut SqliteConnection,
    path: &DocumentPath,
    data: &Value,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(path = %path, "Creating document");
    let at = timestamp(now);
    let result = sqlx::query(
        "INSERT INTO documents (organization_id, collection, doc_id, data, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
         ON CONFLICT (organization_id, collection, doc_id) DO NOTHING",
    )
    .bind(&path.organization_id)
    .bind(path.collection.as_str())
    .bind(&path.doc_id)
    .bind(data.to_string())
    .bind(&at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::already_exists(path.collection.as_str(), &path.doc_id));
    }
    Ok(())
}

pub(crate) async fn write_doc(
    conn: &mut SqliteConnection,
    path: &DocumentPath,
    data: &Value,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(path = %path, "Writing document");
    let at = timestamp(now);
    sqlx::query(
        "INSERT INTO documents (organization_id, collection, doc_id, data, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
         ON CONFLICT (organization_id, collection, doc_id) \
         DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
    )
    .bind(&path.organization_id)
    .bind(path.collection.as_str())
    .bind(&path.doc_id)
    .bind(data.to_string())
    .bind(&at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn write_typed<T: Serialize>(
    conn: &mut SqliteConnection,
    path: &DocumentPath,
    doc: &T,
    now: DateTime<Utc>,
) -> DbResult<()> {
    write_doc(conn, path, &serde_json::to_value(doc)?, now).await
}

pub(crate) async fn delete_doc(conn: &mut SqliteConnection, path: &DocumentPath) -> DbResult<bool> {
    debug!(path = %path, "Deleting document");
    let result = sqlx::query(
        "DELETE FROM documents WHERE organization_id = ?1 AND collection = ?2 AND doc_id = ?3",
    )
    .bind(&path.organization_id)
    .bind(path.collection.as_str())
    .bind(&path.doc_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

fn to_stored(row: (String, String, String, String)) -> DbResult<StoredDocument> {
    let (id, data, created_at, updated_at) = row;
    Ok(StoredDocument {
        id,
        data: serde_json::from_str(&data)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

pub(crate) async fn load_snapshot(
    conn: &mut SqliteConnection,
    path: &CollectionPath,
) -> DbResult<Snapshot> {
    let rows: Vec<(String, String, String, String)> = sqlx::query_as(
        "SELECT doc_id, data, created_at, updated_at FROM documents \
         WHERE organization_id = ?1 AND collection = ?2 \
         ORDER BY created_at, rowid",
    )
    .bind(&path.organization_id)
    .bind(path.collection.as_str())
    .fetch_all(&mut *conn)
    .await?;

    Ok(Snapshot {
        path: path.clone(),
        documents: rows.into_iter().map(to_stored).collect::<DbResult<_>>()?,
    })
}

/// Documents of a collection whose JSON `field` equals `value`.
pub(crate) async fn load_where(
    conn: &mut SqliteConnection,
    path: &CollectionPath,
    field: &str,
    value: &str,
) -> DbResult<Vec<StoredDocument>> {
    let rows: Vec<(String, String, String, String)> = sqlx::query_as(
        "SELECT doc_id, data, created_at, updated_at FROM documents \
         WHERE organization_id = ?1 AND collection = ?2 AND json_extract(data, ?3) = ?4 \
         ORDER BY created_at, rowid",
    )
    .bind(&path.organization_id)
    .bind(path.collection.as_str())
    .bind(format!("$.{}", field))
    .bind(value)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(to_stored).collect()
}

// =============================================================================
// DocumentStore
// =============================================================================

/// Tenant-scoped document store handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    subscriptions: SubscriptionManager,
    /// Orders snapshot loads for subscribe and publish.
    publish_lock: Arc<Mutex<()>>,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        DocumentStore {
            pool,
            subscriptions: SubscriptionManager::new(),
            publish_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    pub(crate) fn path(
        tenant: &TenantContext,
        collection: Collection,
        id: &str,
    ) -> DbResult<DocumentPath> {
        Ok(DocumentPath::new(tenant.require()?, collection, id))
    }

    pub(crate) async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    pub(crate) async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub(crate) async fn commit(&self, tx: Transaction<'static, Sqlite>) -> DbResult<()> {
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    /// Creates a document; fails with `AlreadyExists` if the id is taken.
    pub async fn create<T: Serialize>(
        &self,
        tenant: &TenantContext,
        collection: Collection,
        id: &str,
        doc: &T,
    ) -> DbResult<()> {
        let path = Self::path(tenant, collection, id)?;
        let data = serde_json::to_value(doc)?;
        let mut conn = self.pool.acquire().await?;
        insert_doc(&mut conn, &path, &data, Utc::now()).await?;
        drop(conn);
        self.notify([path.parent()]).await;
        Ok(())
    }

    /// Creates or fully replaces a document.
    pub async fn set<T: Serialize>(
        &self,
        tenant: &TenantContext,
        collection: Collection,
        id: &str,
        doc: &T,
    ) -> DbResult<()> {
        let path = Self::path(tenant, collection, id)?;
        let data = serde_json::to_value(doc)?;
        let mut conn = self.pool.acquire().await?;
        write_doc(&mut conn, &path, &data, Utc::now()).await?;
        drop(conn);
        self.notify([path.parent()]).await;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        tenant: &TenantContext,
        collection: Collection,
        id: &str,
    ) -> DbResult<Option<T>> {
        let path = Self::path(tenant, collection, id)?;
        let mut conn = self.pool.acquire().await?;
        match read_doc(&mut conn, &path).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Deletes a document; returns whether it existed.
    pub async fn delete(
        &self,
        tenant: &TenantContext,
        collection: Collection,
        id: &str,
    ) -> DbResult<bool> {
        let path = Self::path(tenant, collection, id)?;
        let mut conn = self.pool.acquire().await?;
        let existed = delete_doc(&mut conn, &path).await?;
        drop(conn);
        if existed {
            self.notify([path.parent()]).await;
        }
        Ok(existed)
    }

    /// Current contents of a collection, ordered by creation.
    pub async fn snapshot(
        &self,
        tenant: &TenantContext,
        collection: Collection,
    ) -> DbResult<Snapshot> {
        let path = CollectionPath::new(tenant.require()?, collection);
        self.load(&path).await
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        tenant: &TenantContext,
        collection: Collection,
    ) -> DbResult<Vec<T>> {
        self.snapshot(tenant, collection).await?.decode()
    }

    /// Starts listening to a collection. The subscription holds the current
    /// snapshot immediately and receives a fresh one after every write.
    pub async fn subscribe(
        &self,
        tenant: &TenantContext,
        collection: Collection,
    ) -> DbResult<Subscription> {
        let path = CollectionPath::new(tenant.require()?, collection);
        let _guard = self.publish_lock.lock().await;
        let snapshot = self.load(&path).await?;
        Ok(self.subscriptions.subscribe(snapshot))
    }

    async fn load(&self, path: &CollectionPath) -> DbResult<Snapshot> {
        let mut conn = self.acquire().await?;
        load_snapshot(&mut conn, path).await
    }

    /// Publishes fresh snapshots after a committed write.
    ///
    /// The write already succeeded, so a failed re-read is only logged.
    pub(crate) async fn notify(&self, paths: impl IntoIterator<Item = CollectionPath>) {
        let _guard = self.publish_lock.lock().await;
        for path in paths {
            if !self.subscriptions.is_active(&path) {
                continue;
            }
            match self.load(&path).await {
                Ok(snapshot) => {
                    self.subscriptions.publish(snapshot);
                }
                Err(e) => warn!(path = %path, error = %e, "Failed to refresh snapshot"),
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde::Deserialize;
    use tillbook_core::CoreError;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Customer {
        id: String,
        name: String,
    }

    fn customer(id: &str, name: &str) -> Customer {
        Customer {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    async fn store() -> DocumentStore {
        Database::new(DbConfig::in_memory()).await.unwrap().store()
    }

    #[tokio::test]
    async fn test_create_get_set_delete() {
        let store = store().await;
        let org = TenantContext::new("org-1");

        store.create(&org, Collection::Customers, "c1", &customer("c1", "Ada")).await.unwrap();
        let got: Option<Customer> = store.get(&org, Collection::Customers, "c1").await.unwrap();
        assert_eq!(got, Some(customer("c1", "Ada")));

        let dup = store.create(&org, Collection::Customers, "c1", &customer("c1", "Bob")).await;
        assert!(matches!(dup, Err(DbError::AlreadyExists { .. })));

        store.set(&org, Collection::Customers, "c1", &customer("c1", "Bob")).await.unwrap();
        let got: Option<Customer> = store.get(&org, Collection::Customers, "c1").await.unwrap();
        assert_eq!(got.unwrap().name, "Bob");

        assert!(store.delete(&org, Collection::Customers, "c1").await.unwrap());
        assert!(!store.delete(&org, Collection::Customers, "c1").await.unwrap());
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let store = store().await;
        let a = TenantContext::new("org-a");
        let b = TenantContext::new("org-b");

        store.set(&a, Collection::Customers, "c1", &customer("c1", "Ada")).await.unwrap();
        let other: Option<Customer> = store.get(&b, Collection::Customers, "c1").await.unwrap();
        assert!(other.is_none());
        assert!(store.snapshot(&b, Collection::Customers).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_tenant_rejected_before_write() {
        let store = store().await;
        let none = TenantContext::default();

        let err = store
            .set(&none, Collection::Customers, "c1", &customer("c1", "Ada"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::MissingTenant)));

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM documents")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_creation() {
        let store = store().await;
        let org = TenantContext::new("org-1");
        for (id, name) in [("z", "First"), ("a", "Second"), ("m", "Third")] {
            store.create(&org, Collection::Customers, id, &customer(id, name)).await.unwrap();
        }
        // a later replace keeps the original position
        store.set(&org, Collection::Customers, "z", &customer("z", "First!")).await.unwrap();

        let all: Vec<Customer> = store.list(&org, Collection::Customers).await.unwrap();
        let names: Vec<_> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["First!", "Second", "Third"]);
    }

    #[tokio::test]
    async fn test_subscription_sees_every_write() {
        let store = store().await;
        let org = TenantContext::new("org-1");
        store.create(&org, Collection::Customers, "c1", &customer("c1", "Ada")).await.unwrap();

        let mut sub = store.subscribe(&org, Collection::Customers).await.unwrap();
        assert_eq!(sub.current().ids(), vec!["c1"]);

        store.create(&org, Collection::Customers, "c2", &customer("c2", "Bob")).await.unwrap();
        assert_eq!(sub.changed().await.unwrap().ids(), vec!["c1", "c2"]);

        store.delete(&org, Collection::Customers, "c1").await.unwrap();
        assert_eq!(sub.changed().await.unwrap().ids(), vec!["c2"]);

        drop(sub);
        assert_eq!(store.subscriptions().active_count(), 0);
    }
}
