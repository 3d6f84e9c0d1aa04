//! # Purchase Order Repository
//!
//! Creation, listing and the lifecycle transitions of purchase orders.
//!
//! ## Receive Transaction
//! ```text
//! BEGIN
//!   load PO (id, shop)                       missing        → 404
//!   ensure_receivable(status)                not PENDING    → 400
//!   UPDATE status = 'RECEIVED'
//!     WHERE id = ? AND status = 'PENDING'    0 rows (raced) → 400
//!   for each item with a product:
//!     UPDATE products SET stock = stock + qty WHERE id = ? AND shop_id = ?
//! COMMIT
//! ```
//! The conditional flip runs before any stock change, so a second receive
//! (sequential or concurrent) never adds stock twice.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::repository::product::find_product;
use crate::repository::supplier::{self, find_supplier};
use crate::repository::{allocate_document_number, begin_write, new_id};
use tillbook_core::checkout::DocumentKind;
use tillbook_core::purchase::{ensure_cancellable, ensure_receivable, NewPurchaseOrder};
use tillbook_core::{
    CoreError, PurchaseOrder, PurchaseOrderDetail, PurchaseOrderItem, PurchaseOrderStatus,
};

macro_rules! order_columns {
    () => {
        "id, shop_id, supplier_id, po_number, date, status, total_cents, notes, created_at, updated_at"
    };
}

macro_rules! order_item_columns {
    () => {
        "id, purchase_order_id, product_id, name_snapshot, quantity, unit_cost_cents, total_cost_cents"
    };
}

/// Repository for purchase orders.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Creates a PENDING purchase order in one transaction.
    ///
    /// ## Errors
    /// * `CoreError::SupplierNotFound` - supplier outside the shop
    /// * `CoreError::ProductNotFound` - a line names a product outside the shop
    pub async fn create(
        &self,
        shop_id: &str,
        request: &NewPurchaseOrder,
        now: DateTime<Utc>,
    ) -> DbResult<PurchaseOrderDetail> {
        request.validate()?;

        let mut tx = begin_write(&self.pool).await?;

        let supplier = find_supplier(&mut tx, shop_id, &request.supplier_id)
            .await?
            .ok_or_else(|| CoreError::SupplierNotFound(request.supplier_id.clone()))?;

        let po_number =
            allocate_document_number(&mut tx, shop_id, DocumentKind::PurchaseOrder, now.timestamp_millis())
                .await?;

        let order = PurchaseOrder {
            id: new_id(),
            shop_id: shop_id.to_string(),
            supplier_id: Some(supplier.id.clone()),
            po_number,
            date: now,
            status: PurchaseOrderStatus::Pending,
            total_cents: request.total().cents(),
            notes: request.notes.clone().filter(|notes| !notes.trim().is_empty()),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(concat!(
            "INSERT INTO purchase_orders (",
            order_columns!(),
            ") VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ))
        .bind(&order.id)
        .bind(&order.shop_id)
        .bind(&order.supplier_id)
        .bind(&order.po_number)
        .bind(order.date)
        .bind(order.status.as_str())
        .bind(order.total_cents)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = find_product(&mut tx, shop_id, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            let item = PurchaseOrderItem {
                id: new_id(),
                purchase_order_id: order.id.clone(),
                product_id: Some(product.id),
                name_snapshot: product.name,
                quantity: line.quantity,
                unit_cost_cents: line.unit_cost_cents,
                total_cost_cents: line.total_cost().cents(),
            };

            sqlx::query(concat!(
                "INSERT INTO purchase_order_items (",
                order_item_columns!(),
                ") VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ))
            .bind(&item.id)
            .bind(&item.purchase_order_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_cost_cents)
            .bind(item.total_cost_cents)
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        tx.commit().await?;

        info!(
            shop_id = %shop_id,
            po_number = %order.po_number,
            total_cents = order.total_cents,
            "Purchase order created"
        );

        Ok(PurchaseOrderDetail {
            order,
            supplier: Some(supplier),
            items,
        })
    }

    /// Lists the shop's purchase orders, newest first.
    pub async fn list(&self, shop_id: &str) -> DbResult<Vec<PurchaseOrderDetail>> {
        let mut conn = self.pool.acquire().await?;

        let orders = sqlx::query_as::<_, PurchaseOrder>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM purchase_orders WHERE shop_id = ?1 ORDER BY date DESC, created_at DESC"
        ))
        .bind(shop_id)
        .fetch_all(&mut *conn)
        .await?;

        let items = sqlx::query_as::<_, PurchaseOrderItem>(
            r#"
            SELECT poi.id, poi.purchase_order_id, poi.product_id, poi.name_snapshot,
                   poi.quantity, poi.unit_cost_cents, poi.total_cost_cents
            FROM purchase_order_items poi
            JOIN purchase_orders po ON po.id = poi.purchase_order_id
            WHERE po.shop_id = ?1
            ORDER BY poi.rowid
            "#,
        )
        .bind(shop_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut items_by_order: HashMap<String, Vec<PurchaseOrderItem>> = HashMap::new();
        for item in items {
            items_by_order
                .entry(item.purchase_order_id.clone())
                .or_default()
                .push(item);
        }

        let suppliers: HashMap<_, _> = supplier::list_for_shop(&mut conn, shop_id)
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        let details = orders
            .into_iter()
            .map(|order| PurchaseOrderDetail {
                items: items_by_order.remove(&order.id).unwrap_or_default(),
                supplier: order
                    .supplier_id
                    .as_ref()
                    .and_then(|id| suppliers.get(id).cloned()),
                order,
            })
            .collect::<Vec<_>>();

        debug!(shop_id = %shop_id, count = details.len(), "Listed purchase orders");
        Ok(details)
    }

    /// Gets a purchase order with its supplier and items.
    pub async fn get(&self, shop_id: &str, id: &str) -> DbResult<PurchaseOrderDetail> {
        let mut conn = self.pool.acquire().await?;
        load_detail(&mut conn, shop_id, id).await
    }

    /// Receives a PENDING purchase order and adds its quantities to stock.
    ///
    /// ## Errors
    /// * `CoreError::PurchaseOrderNotFound` - no such order in this shop
    /// * `CoreError::InvalidPurchaseOrderStatus` - already RECEIVED or CANCELLED
    pub async fn receive(&self, shop_id: &str, id: &str, now: DateTime<Utc>) -> DbResult<PurchaseOrderDetail> {
        let mut tx = begin_write(&self.pool).await?;

        let order = fetch_order(&mut tx, shop_id, id).await?;
        ensure_receivable(&order)?;
        transition(&mut tx, &order, PurchaseOrderStatus::Received, now).await?;

        let items = fetch_items(&mut tx, &order.id).await?;
        for item in &items {
            let Some(product_id) = item.product_id.as_deref() else {
                debug!(po_number = %order.po_number, item = %item.name_snapshot, "Product gone, skipping stock");
                continue;
            };
            sqlx::query(
                r#"
                UPDATE products SET stock = stock + ?3, updated_at = ?4
                WHERE id = ?1 AND shop_id = ?2
                "#,
            )
            .bind(product_id)
            .bind(shop_id)
            .bind(item.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let detail = load_detail(&mut tx, shop_id, id).await?;
        tx.commit().await?;

        info!(
            shop_id = %shop_id,
            po_number = %detail.order.po_number,
            lines = items.len(),
            "Purchase order received"
        );
        Ok(detail)
    }

    /// Cancels a PENDING purchase order. Stock is untouched.
    pub async fn cancel(&self, shop_id: &str, id: &str, now: DateTime<Utc>) -> DbResult<PurchaseOrderDetail> {
        let mut tx = begin_write(&self.pool).await?;

        let order = fetch_order(&mut tx, shop_id, id).await?;
        ensure_cancellable(&order)?;
        transition(&mut tx, &order, PurchaseOrderStatus::Cancelled, now).await?;

        let detail = load_detail(&mut tx, shop_id, id).await?;
        tx.commit().await?;

        info!(shop_id = %shop_id, po_number = %detail.order.po_number, "Purchase order cancelled");
        Ok(detail)
    }
}

async fn fetch_order(conn: &mut SqliteConnection, shop_id: &str, id: &str) -> DbResult<PurchaseOrder> {
    let order = sqlx::query_as::<_, PurchaseOrder>(concat!(
        "SELECT ",
        order_columns!(),
        " FROM purchase_orders WHERE id = ?1 AND shop_id = ?2"
    ))
    .bind(id)
    .bind(shop_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::PurchaseOrderNotFound(id.to_string()))?;

    Ok(order)
}

async fn fetch_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<PurchaseOrderItem>> {
    let items = sqlx::query_as::<_, PurchaseOrderItem>(concat!(
        "SELECT ",
        order_item_columns!(),
        " FROM purchase_order_items WHERE purchase_order_id = ?1 ORDER BY rowid"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

async fn load_detail(conn: &mut SqliteConnection, shop_id: &str, id: &str) -> DbResult<PurchaseOrderDetail> {
    let order = fetch_order(conn, shop_id, id).await?;
    let items = fetch_items(conn, &order.id).await?;
    let supplier = match order.supplier_id.as_deref() {
        Some(supplier_id) => find_supplier(conn, shop_id, supplier_id).await?,
        None => None,
    };

    Ok(PurchaseOrderDetail {
        order,
        supplier,
        items,
    })
}

/// Moves a PENDING order to `to`. Fails if another writer got there first.
async fn transition(
    conn: &mut SqliteConnection,
    order: &PurchaseOrder,
    to: PurchaseOrderStatus,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE purchase_orders SET status = ?3, updated_at = ?4
        WHERE id = ?1 AND shop_id = ?2 AND status = ?5
        "#,
    )
    .bind(&order.id)
    .bind(&order.shop_id)
    .bind(to.as_str())
    .bind(now)
    .bind(PurchaseOrderStatus::Pending.as_str())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let current = fetch_order(conn, &order.shop_id, &order.id).await?;
        warn!(po_number = %order.po_number, status = current.status.as_str(), "Purchase order changed underneath");
        return Err(CoreError::InvalidPurchaseOrderStatus {
            po_number: current.po_number,
            current_status: current.status.as_str().to_string(),
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support;
    use crate::Database;
    use tillbook_core::catalog::NewSupplier;
    use tillbook_core::purchase::PurchaseLine;

    async fn supplier_id(db: &Database, shop_id: &str) -> String {
        let new = NewSupplier {
            name: "Acme Wholesale".to_string(),
            ..Default::default()
        };
        db.suppliers().create(shop_id, &new, Utc::now()).await.unwrap().id
    }

    fn order(supplier_id: &str, lines: &[(&str, i64, i64)]) -> NewPurchaseOrder {
        NewPurchaseOrder {
            supplier_id: supplier_id.to_string(),
            items: lines
                .iter()
                .map(|(product_id, quantity, unit_cost_cents)| PurchaseLine {
                    product_id: product_id.to_string(),
                    quantity: *quantity,
                    unit_cost_cents: *unit_cost_cents,
                })
                .collect(),
            notes: Some("Monthly restock".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_pending_order() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let supplier = supplier_id(&db, &shop.id).await;
        let rice = test_support::product(&db, &shop.id, "Rice", 500, 0).await;
        let dal = test_support::product(&db, &shop.id, "Dal", 300, 4).await;

        let detail = db
            .purchases()
            .create(&shop.id, &order(&supplier, &[(&rice.id, 10, 350), (&dal.id, 5, 200)]), Utc::now())
            .await
            .unwrap();

        assert_eq!(detail.order.status, PurchaseOrderStatus::Pending);
        assert!(detail.order.po_number.starts_with("PO-"));
        assert_eq!(detail.order.total_cents, 4500);
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].name_snapshot, "Rice");
        assert_eq!(detail.supplier.map(|s| s.name).as_deref(), Some("Acme Wholesale"));

        // creating does not move stock
        assert_eq!(db.products().get(&shop.id, &rice.id).await.unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_references() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let other = test_support::shop(&db, "other@example.com", false).await;
        let supplier = supplier_id(&db, &shop.id).await;
        let theirs = supplier_id(&db, &other.id).await;
        let rice = test_support::product(&db, &shop.id, "Rice", 500, 0).await;
        let foreign = test_support::product(&db, &other.id, "Rice", 500, 0).await;

        let err = db
            .purchases()
            .create(&shop.id, &order(&theirs, &[(&rice.id, 1, 100)]), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SupplierNotFound(_))));

        let err = db
            .purchases()
            .create(&shop.id, &order(&supplier, &[(&rice.id, 1, 100), (&foreign.id, 1, 100)]), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
        assert!(db.purchases().list(&shop.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_receive_adds_stock_once() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let supplier = supplier_id(&db, &shop.id).await;
        let rice = test_support::product(&db, &shop.id, "Rice", 500, 2).await;

        let created = db
            .purchases()
            .create(&shop.id, &order(&supplier, &[(&rice.id, 10, 350)]), Utc::now())
            .await
            .unwrap();

        let received = db.purchases().receive(&shop.id, &created.order.id, Utc::now()).await.unwrap();
        assert_eq!(received.order.status, PurchaseOrderStatus::Received);
        assert_eq!(db.products().get(&shop.id, &rice.id).await.unwrap().stock, 12);

        let err = db
            .purchases()
            .receive(&shop.id, &created.order.id, Utc::now())
            .await
            .unwrap_err();
        match err {
            DbError::Domain(CoreError::InvalidPurchaseOrderStatus { current_status, .. }) => {
                assert_eq!(current_status, "RECEIVED");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.products().get(&shop.id, &rice.id).await.unwrap().stock, 12);
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_received() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let supplier = supplier_id(&db, &shop.id).await;
        let rice = test_support::product(&db, &shop.id, "Rice", 500, 2).await;

        let created = db
            .purchases()
            .create(&shop.id, &order(&supplier, &[(&rice.id, 10, 350)]), Utc::now())
            .await
            .unwrap();

        let cancelled = db.purchases().cancel(&shop.id, &created.order.id, Utc::now()).await.unwrap();
        assert_eq!(cancelled.order.status, PurchaseOrderStatus::Cancelled);

        let err = db
            .purchases()
            .receive(&shop.id, &created.order.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidPurchaseOrderStatus { .. })));
        let err = db
            .purchases()
            .cancel(&shop.id, &created.order.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidPurchaseOrderStatus { .. })));
        assert_eq!(db.products().get(&shop.id, &rice.id).await.unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_receive_skips_deleted_products() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let supplier = supplier_id(&db, &shop.id).await;
        let rice = test_support::product(&db, &shop.id, "Rice", 500, 2).await;
        let dal = test_support::product(&db, &shop.id, "Dal", 300, 1).await;

        let created = db
            .purchases()
            .create(&shop.id, &order(&supplier, &[(&rice.id, 3, 350), (&dal.id, 4, 200)]), Utc::now())
            .await
            .unwrap();
        db.products().delete(&shop.id, &dal.id).await.unwrap();

        let received = db.purchases().receive(&shop.id, &created.order.id, Utc::now()).await.unwrap();
        assert_eq!(received.items.len(), 2);
        assert_eq!(received.items[1].product_id, None);
        assert_eq!(db.products().get(&shop.id, &rice.id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_other_shop_cannot_receive() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let other = test_support::shop(&db, "other@example.com", false).await;
        let supplier = supplier_id(&db, &shop.id).await;
        let rice = test_support::product(&db, &shop.id, "Rice", 500, 2).await;

        let created = db
            .purchases()
            .create(&shop.id, &order(&supplier, &[(&rice.id, 3, 350)]), Utc::now())
            .await
            .unwrap();

        let err = db
            .purchases()
            .receive(&other.id, &created.order.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::PurchaseOrderNotFound(_))));
        assert_eq!(db.products().get(&shop.id, &rice.id).await.unwrap().stock, 2);
        assert!(db.purchases().list(&other.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let supplier = supplier_id(&db, &shop.id).await;
        let rice = test_support::product(&db, &shop.id, "Rice", 500, 2).await;
        let earlier = Utc::now() - chrono::Duration::days(2);

        let old = db
            .purchases()
            .create(&shop.id, &order(&supplier, &[(&rice.id, 1, 100)]), earlier)
            .await
            .unwrap();
        let new = db
            .purchases()
            .create(&shop.id, &order(&supplier, &[(&rice.id, 2, 100)]), Utc::now())
            .await
            .unwrap();

        let listed = db.purchases().list(&shop.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].order.id, new.order.id);
        assert_eq!(listed[1].order.id, old.order.id);
        assert_eq!(listed[0].items.len(), 1);
        assert!(listed[0].supplier.is_some());
    }
}
