//! # Order Session
//!
//! The in-progress order a cashier is building, saved to the local key/value
//! store after every change so a reload can resume it.
//!
//! Keys are plain strings and values are JSON. The session only holds ids;
//! tables, customers and order types are re-read on resume.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::totals::compute_subtotal;
use crate::types::{CatalogItem, LineItem};

/// Keys used in the local store.
pub struct SessionKey;

impl SessionKey {
    pub const CURRENT_ORDER: &'static str = "pos.currentOrder";
    pub const LAST_VIEW: &'static str = "pos.lastView";
    pub const CATEGORY_PATH: &'static str = "pos.categoryPath";
}

/// Which screen the order was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SessionView {
    #[default]
    Tables,
    Catalog,
    Cart,
    Payment,
}

/// A resumable order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderSession {
    #[serde(default)]
    pub cart: Vec<LineItem>,
    #[serde(default)]
    pub table_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub order_type_id: Option<String>,
    #[serde(default)]
    pub view: SessionView,
    /// Category drill-down, outermost first.
    #[serde(default)]
    pub category_path: Vec<String>,
}

impl OrderSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nothing chosen yet; an empty session is deleted rather than saved.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Adds a catalog item, bumping the quantity if it is already in the cart.
    pub fn add(&mut self, item: &CatalogItem, quantity: i64) -> CoreResult<()> {
        let existing = self
            .cart
            .iter_mut()
            .find(|line| line.catalog_id.as_deref() == Some(item.id()));

        match existing {
            Some(line) => line.set_quantity(line.quantity() + quantity),
            None => {
                self.cart.push(item.to_line_item(quantity)?);
                Ok(())
            }
        }
    }

    /// Removes a cart line; returns whether anything was removed.
    pub fn remove(&mut self, line_id: &str) -> bool {
        let before = self.cart.len();
        self.cart.retain(|line| line.id != line_id);
        self.cart.len() != before
    }

    pub fn enter_category(&mut self, category: impl Into<String>) {
        self.category_path.push(category.into());
    }

    pub fn leave_category(&mut self) -> Option<String> {
        self.category_path.pop()
    }

    pub fn subtotal(&self) -> CoreResult<Money> {
        compute_subtotal(&self.cart)
    }

    /// Empties the session after the order is placed.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latte() -> CatalogItem {
        CatalogItem::Product {
            id: "p-latte".to_string(),
            name: "Latte".to_string(),
            price: Money::from_cents(450),
            sku: None,
            category: Some("Coffee".to_string()),
        }
    }

    #[test]
    fn test_add_merges_same_item() {
        let mut session = OrderSession::new();
        session.add(&latte(), 1).unwrap();
        session.add(&latte(), 2).unwrap();
        assert_eq!(session.cart.len(), 1);
        assert_eq!(session.cart[0].quantity(), 3);
        assert_eq!(session.subtotal().unwrap().cents(), 1350);

        assert!(session.add(&latte(), 997).is_err());
        assert_eq!(session.cart[0].quantity(), 3);
    }

    #[test]
    fn test_navigation_alone_is_not_empty() {
        assert!(OrderSession::new().is_empty());

        let mut session = OrderSession::new();
        session.order_type_id = Some("dine-in".to_string());
        assert!(!session.is_empty());

        let mut session = OrderSession::new();
        session.enter_category("Drinks");
        assert!(!session.is_empty());
        session.leave_category();
        assert!(session.is_empty());

        let session = OrderSession {
            view: SessionView::Catalog,
            ..OrderSession::default()
        };
        assert!(!session.is_empty());
    }

    #[test]
    fn test_json_round_trip_resumes_order() {
        let mut session = OrderSession::new();
        session.add(&latte(), 2).unwrap();
        session.table_id = Some("t-4".to_string());
        session.view = SessionView::Cart;
        session.enter_category("Drinks");
        session.enter_category("Coffee");

        let json = serde_json::to_string(&session).unwrap();
        let resumed: OrderSession = serde_json::from_str(&json).unwrap();
        assert_eq!(resumed, session);
        assert_eq!(resumed.category_path, vec!["Drinks", "Coffee"]);
    }

    #[test]
    fn test_missing_fields_default() {
        let session: OrderSession = serde_json::from_str("{}").unwrap();
        assert!(session.is_empty());
        assert_eq!(session.view, SessionView::Tables);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut session = OrderSession::new();
        session.add(&latte(), 1).unwrap();
        let id = session.cart[0].id.clone();
        assert!(session.remove(&id));
        assert!(!session.remove(&id));

        session.customer_id = Some("c-1".to_string());
        session.clear();
        assert!(session.is_empty());
    }
}
