//! # Table Repository
//!
//! Dining tables and the transactions that seat, move and release orders.
//!
//! ## Moving an Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  move_order(order-7, table-B)                                           │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    orders/order-7   table = A        ──► table = B                      │
//! │    tables/A         occupied (o-7)   ──► available                      │
//! │    tables/B         available        ──► occupied (o-7)                 │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: all three documents    │
//! │  keep their previous state.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use tillbook_core::status::transition;
use tillbook_core::{
    CoreError, DocumentStatus, Order, OrderStatus, Table, TableStatus, TenantContext,
};

use crate::error::{DbError, DbResult};
use crate::path::{Collection, CollectionPath, DocumentPath};
use crate::store::{self, DocumentStore};

/// Outcome of a committed table move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMove {
    pub order_id: String,
    pub from_table_id: String,
    pub to_table_id: String,
}

#[derive(Debug, Clone)]
pub struct TableRepository {
    store: DocumentStore,
}

impl TableRepository {
    pub fn new(store: DocumentStore) -> Self {
        TableRepository { store }
    }

    pub async fn create(&self, tenant: &TenantContext, table: &Table) -> DbResult<()> {
        self.store
            .create(tenant, Collection::Tables, &table.id, table)
            .await
    }

    pub async fn get(&self, tenant: &TenantContext, id: &str) -> DbResult<Table> {
        self.store
            .get(tenant, Collection::Tables, id)
            .await?
            .ok_or_else(|| DbError::not_found(TableStatus::ENTITY, id))
    }

    pub async fn list(&self, tenant: &TenantContext) -> DbResult<Vec<Table>> {
        self.store.list(tenant, Collection::Tables).await
    }

    /// Manual status change (reserve, maintenance, back to available).
    ///
    /// Occupancy is owned by [`seat_order`](Self::seat_order),
    /// [`move_order`](Self::move_order) and [`release`](Self::release), so
    /// moves into or out of `occupied` are rejected here.
    pub async fn set_status(
        &self,
        tenant: &TenantContext,
        table_id: &str,
        next: TableStatus,
    ) -> DbResult<Table> {
        let path = DocumentStore::path(tenant, Collection::Tables, table_id)?;
        let mut tx = self.store.begin().await?;

        let mut table: Table = store::read_typed(&mut *tx, &path, TableStatus::ENTITY).await?;
        if table.status == TableStatus::Occupied || next == TableStatus::Occupied {
            return Err(CoreError::InvalidTransition {
                entity: TableStatus::ENTITY,
                from: table.status.as_str(),
                to: next.as_str(),
            }
            .into());
        }
        table.status = transition(table.status, next)?;
        store::write_typed(&mut *tx, &path, &table, Utc::now()).await?;

        self.store.commit(tx).await?;
        debug!(table_id = %table_id, status = next.as_str(), "Table status set");
        self.store.notify([path.parent()]).await;
        Ok(table)
    }

    /// Seats an open order at an available table.
    pub async fn seat_order(
        &self,
        tenant: &TenantContext,
        table_id: &str,
        order_id: &str,
    ) -> DbResult<()> {
        let table_path = DocumentStore::path(tenant, Collection::Tables, table_id)?;
        let order_path = DocumentStore::path(tenant, Collection::Orders, order_id)?;
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let mut order: Order = store::read_typed(&mut *tx, &order_path, OrderStatus::ENTITY).await?;
        if order.status().is_terminal() {
            return Err(CoreError::NotEditable {
                entity: OrderStatus::ENTITY,
                status: order.status().as_str(),
            }
            .into());
        }
        if let Some(current) = &order.table {
            return Err(CoreError::invalid_input(
                "order",
                format!("already seated at {}", current.table_name),
            )
            .into());
        }

        let mut table: Table = store::read_typed(&mut *tx, &table_path, TableStatus::ENTITY).await?;
        table.occupy(order_id)?;
        order.table = Some(table.to_ref());

        store::write_typed(&mut *tx, &table_path, &table, now).await?;
        store::write_typed(&mut *tx, &order_path, &order, now).await?;
        self.store.commit(tx).await?;

        info!(order_id = %order_id, table_id = %table_id, "Order seated");
        self.store
            .notify([table_path.parent(), order_path.parent()])
            .await;
        Ok(())
    }

    /// Moves a seated order to another table, atomically.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown order or table
    /// - `NotEditable` when the order is completed or cancelled
    /// - `InvalidInput` when the order is not seated or already at the destination
    /// - `InvalidTransition` when the destination is not available
    pub async fn move_order(
        &self,
        tenant: &TenantContext,
        order_id: &str,
        to_table_id: &str,
    ) -> DbResult<TableMove> {
        let organization_id = tenant.require()?;
        let mut tx = self.store.begin().await?;

        let moved = match apply_table_move(&mut *tx, organization_id, order_id, to_table_id, Utc::now()).await {
            Ok(moved) => moved,
            Err(e) => {
                warn!(order_id = %order_id, to_table_id = %to_table_id, error = %e, "Table move aborted");
                return Err(e);
            }
        };
        self.store.commit(tx).await?;

        info!(
            order_id = %order_id,
            from = %moved.from_table_id,
            to = %moved.to_table_id,
            "Order moved between tables"
        );
        self.store
            .notify([
                CollectionPath::new(organization_id, Collection::Tables),
                CollectionPath::new(organization_id, Collection::Orders),
            ])
            .await;
        Ok(moved)
    }

    /// Frees an occupied table and detaches its order, atomically.
    pub async fn release(&self, tenant: &TenantContext, table_id: &str) -> DbResult<Table> {
        let table_path = DocumentStore::path(tenant, Collection::Tables, table_id)?;
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let mut table: Table = store::read_typed(&mut *tx, &table_path, TableStatus::ENTITY).await?;
        let order_id = table.current_order_id.clone();
        table.release()?;
        store::write_typed(&mut *tx, &table_path, &table, now).await?;

        let mut touched = vec![table_path.parent()];
        if let Some(order_id) = order_id {
            let order_path = DocumentPath::new(&table_path.organization_id, Collection::Orders, order_id);
            // the order may have been deleted since it was seated
            if let Some(value) = store::read_doc(&mut *tx, &order_path).await? {
                let mut order: Order = serde_json::from_value(value)?;
                order.table = None;
                store::write_typed(&mut *tx, &order_path, &order, now).await?;
                touched.push(order_path.parent());
            }
        }

        self.store.commit(tx).await?;
        info!(table_id = %table_id, "Table released");
        self.store.notify(touched).await;
        Ok(table)
    }
}

/// The three writes of a table move, inside a caller-owned transaction.
pub(crate) async fn apply_table_move(
    conn: &mut SqliteConnection,
    organization_id: &str,
    order_id: &str,
    to_table_id: &str,
    now: DateTime<Utc>,
) -> DbResult<TableMove> {
    let order_path = DocumentPath::new(organization_id, Collection::Orders, order_id);
    let mut order: Order = store::read_typed(conn, &order_path, OrderStatus::ENTITY).await?;

    if order.status().is_terminal() {
        return Err(CoreError::NotEditable {
            entity: OrderStatus::ENTITY,
            status: order.status().as_str(),
        }
        .into());
    }
    let from_table_id = match &order.table {
        Some(table) => table.table_id.clone(),
        None => return Err(CoreError::invalid_input("order", "is not seated at a table").into()),
    };
    if from_table_id == to_table_id {
        return Err(CoreError::invalid_input("table", "order is already at this table").into());
    }

    let from_path = DocumentPath::new(organization_id, Collection::Tables, &from_table_id);
    let to_path = DocumentPath::new(organization_id, Collection::Tables, to_table_id);
    let mut from: Table = store::read_typed(conn, &from_path, TableStatus::ENTITY).await?;
    let mut to: Table = store::read_typed(conn, &to_path, TableStatus::ENTITY).await?;

    from.release()?;
    to.occupy(order_id)?;
    order.table = Some(to.to_ref());

    store::write_typed(conn, &from_path, &from, now).await?;
    store::write_typed(conn, &to_path, &to, now).await?;
    store::write_typed(conn, &order_path, &order, now).await?;

    Ok(TableMove {
        order_id: order_id.to_string(),
        from_table_id,
        to_table_id: to_table_id.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
