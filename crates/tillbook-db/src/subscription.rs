//! # Realtime Subscriptions
//!
//! Listeners watch a whole collection and always receive the full current
//! list (replace-on-change), never a diff.
//!
//! ## Lifetime
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SubscriptionManager  (explicit object, one per DocumentStore)          │
//! │                                                                         │
//! │  organizations/org-1/tables ──► Channel { watch::Sender, refs: 2 }      │
//! │  organizations/org-1/orders ──► Channel { watch::Sender, refs: 1 }      │
//! │                                                                         │
//! │  subscribe()  ─ first listener creates the channel, later ones share it │
//! │  drop(sub)    ─ refs - 1; the last drop removes the channel             │
//! │  publish()    ─ after each committed write; no-op when nobody listens   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::path::CollectionPath;

// =============================================================================
// Snapshot
// =============================================================================

/// One stored document as delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full contents of a collection, ordered by creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: CollectionPath,
    pub documents: Vec<StoredDocument>,
}

impl Snapshot {
    pub fn empty(path: CollectionPath) -> Self {
        Snapshot {
            path,
            documents: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.id.as_str()).collect()
    }

    /// Decodes every document into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> DbResult<Vec<T>> {
        self.documents
            .iter()
            .map(|d| serde_json::from_value(d.data.clone()).map_err(DbError::from))
            .collect()
    }
}

// =============================================================================
// Manager
// =============================================================================

struct Channel {
    sender: watch::Sender<Arc<Snapshot>>,
    refs: usize,
}

/// Refcounted registry of collection listeners.
#[derive(Clone, Default)]
pub struct SubscriptionManager {
    channels: Arc<Mutex<HashMap<CollectionPath, Channel>>>,
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("active", &self.active_count())
            .finish()
    }
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CollectionPath, Channel>> {
        // entries are plain counters, so a poisoned map is still consistent
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attaches a listener. `initial` seeds a newly created channel and is
    /// ignored when the channel already exists (it is already current).
    pub fn subscribe(&self, initial: Snapshot) -> Subscription {
        let path = initial.path.clone();
        let mut channels = self.lock();
        let channel = channels.entry(path.clone()).or_insert_with(|| {
            debug!(path = %path, "Opening subscription channel");
            Channel {
                sender: watch::channel(Arc::new(initial)).0,
                refs: 0,
            }
        });
        channel.refs += 1;
        let receiver = channel.sender.subscribe();
        debug!(path = %path, refs = channel.refs, "Listener attached");

        Subscription {
            path,
            receiver,
            manager: self.clone(),
        }
    }

    /// Replaces the snapshot seen by every listener of its path.
    ///
    /// Returns `false` when nobody listens.
    pub fn publish(&self, snapshot: Snapshot) -> bool {
        let channels = self.lock();
        match channels.get(&snapshot.path) {
            Some(channel) => {
                debug!(path = %snapshot.path, documents = snapshot.len(), "Publishing snapshot");
                channel.sender.send_replace(Arc::new(snapshot));
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, path: &CollectionPath) -> bool {
        self.lock().contains_key(path)
    }

    pub fn ref_count(&self, path: &CollectionPath) -> usize {
        self.lock().get(path).map_or(0, |c| c.refs)
    }

    /// Number of collections with at least one listener.
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, path: &CollectionPath) {
        let mut channels = self.lock();
        if let Some(channel) = channels.get_mut(path) {
            channel.refs = channel.refs.saturating_sub(1);
            if channel.refs == 0 {
                channels.remove(path);
                debug!(path = %path, "Last listener detached, channel closed");
            }
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// A live listener. Dropping it detaches.
pub struct Subscription {
    path: CollectionPath,
    receiver: watch::Receiver<Arc<Snapshot>>,
    manager: SubscriptionManager,
}

impl Subscription {
    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Latest snapshot, without waiting.
    pub fn current(&self) -> Arc<Snapshot> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next published snapshot.
    pub async fn changed(&mut self) -> DbResult<Arc<Snapshot>> {
        self.receiver
            .changed()
            .await
            .map_err(|_| DbError::SubscriptionClosed(self.path.to_string()))?;
        Ok(self.receiver.borrow_and_update().clone())
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("path", &self.path).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.manager.release(&self.path);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Collection;
    use serde_json::json;

    fn tables() -> CollectionPath {
        CollectionPath::new("org-1", Collection::Tables)
    }

    fn snapshot(ids: &[&str]) -> Snapshot {
        let now = Utc::now();
        Snapshot {
            path: tables(),
            documents: ids
                .iter()
                .map(|id| StoredDocument {
                    id: id.to_string(),
                    data: json!({ "id": id }),
                    created_at: now,
                    updated_at: now,
                })
                .collect(),
        }
    }

    #[test]
    fn test_refcount_and_teardown() {
        let manager = SubscriptionManager::new();
        let first = manager.subscribe(snapshot(&["t1"]));
        let second = manager.subscribe(snapshot(&[]));
        assert_eq!(manager.ref_count(&tables()), 2);

        // the existing channel keeps its contents
        assert_eq!(second.current().ids(), vec!["t1"]);

        drop(first);
        assert!(manager.is_active(&tables()));
        drop(second);
        assert!(!manager.is_active(&tables()));
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn test_publish_without_listeners_is_noop() {
        let manager = SubscriptionManager::new();
        assert!(!manager.publish(snapshot(&["t1"])));
    }

    #[tokio::test]
    async fn test_listeners_receive_full_snapshots() {
        let manager = SubscriptionManager::new();
        let mut sub = manager.subscribe(snapshot(&["t1"]));

        assert!(manager.publish(snapshot(&["t1", "t2"])));
        let next = sub.changed().await.unwrap();
        assert_eq!(next.ids(), vec!["t1", "t2"]);

        assert!(manager.publish(snapshot(&["t2"])));
        assert_eq!(sub.changed().await.unwrap().ids(), vec!["t2"]);
    }

    #[test]
    fn test_managers_are_isolated() {
        let a = SubscriptionManager::new();
        let b = SubscriptionManager::new();
        let _sub = a.subscribe(snapshot(&[]));
        assert!(a.is_active(&tables()));
        assert!(!b.is_active(&tables()));
    }

    #[test]
    fn test_snapshot_decode() {
        #[derive(serde::Deserialize)]
        struct Row {
            id: String,
        }
        let rows: Vec<Row> = snapshot(&["a", "b"]).decode().unwrap();
        assert_eq!(rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
