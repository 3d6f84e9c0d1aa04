//! # Invoice Repository
//!
//! The checkout transaction and invoice reads.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    │                                                                    │
//! │    ├─ load shop (tax settings, demo flag)                              │
//! │    ├─ sale path on a demo shop: count today's sales ≥ limit? → abort   │
//! │    ├─ customer name given: find by (shop, phone) or create             │
//! │    ├─ for each line:                                                    │
//! │    │     load product (id, shop)          missing      → abort          │
//! │    │     sale path: UPDATE stock = stock - q                            │
//! │    │                WHERE stock >= q      0 rows       → abort          │
//! │    │     line total = current price × q                                 │
//! │    ├─ summarize: final = Σ lines − discount, status                     │
//! │    ├─ allocate INV-/QTN- number (collision-checked per shop)            │
//! │    ├─ INSERT invoice, INSERT items (name + price snapshots)            │
//! │    └─ sale path and paid > 0: INSERT payment (IN)                      │
//! │  COMMIT ──► re-read invoice with items and customer                    │
//! │                                                                         │
//! │  Any abort drops the transaction: no stock change, no rows.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::customer;
use crate::repository::product::find_product;
use crate::repository::shop::fetch_shop;
use crate::repository::{allocate_document_number, begin_write, new_id};
use tillbook_core::checkout::{summarize, CheckoutRequest, DocumentKind};
use tillbook_core::report::start_of_day;
use tillbook_core::{
    CoreError, Invoice, InvoiceDetail, InvoiceItem, InvoiceStatus, Money, PaymentDirection,
};

macro_rules! invoice_columns {
    () => {
        "id, shop_id, customer_id, invoice_number, date, total_cents, tax_cents, \
         discount_cents, paid_cents, status, payment_mode, created_at"
    };
}

macro_rules! invoice_item_columns {
    () => {
        "id, invoice_id, product_id, name_snapshot, quantity, price_cents, total_cents, created_at"
    };
}

/// One priced cart line, ready to be written.
struct PricedLine {
    product_id: String,
    name: String,
    quantity: i64,
    price: Money,
    total: Money,
}

/// Repository for invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Runs the checkout transaction and returns the stored invoice.
    ///
    /// ## Arguments
    /// * `shop_id` - the caller's shop
    /// * `request` - cart, discount, payment and optional HELD/QUOTATION
    /// * `demo_daily_limit` - sale invoices a demo shop may create today;
    ///   `None` disables the quota for this caller
    /// * `now` - current time in the zone that defines "today"
    ///
    /// ## Errors
    /// * `CoreError::DemoLimitExceeded` - quota reached
    /// * `CoreError::ProductNotFound` - a line names a product outside the shop
    /// * `CoreError::InsufficientStock` - a line exceeds the stock on hand
    /// * `CoreError::Validation` - malformed request
    pub async fn checkout<Tz: TimeZone>(
        &self,
        shop_id: &str,
        request: &CheckoutRequest,
        demo_daily_limit: Option<i64>,
        now: &DateTime<Tz>,
    ) -> DbResult<InvoiceDetail> {
        request.validate()?;
        let requested = request.requested_status()?;
        let is_sale = requested.is_none();
        let day_start = start_of_day(now);
        let now = now.with_timezone(&Utc);

        debug!(
            shop_id = %shop_id,
            lines = request.items.len(),
            is_sale,
            "Starting checkout"
        );

        let mut tx = begin_write(&self.pool).await?;

        let shop = fetch_shop(&mut tx, shop_id).await?;

        // 1. Demo quota
        if is_sale && shop.is_demo {
            if let Some(limit) = demo_daily_limit {
                let sold_today = count_sales_since(&mut tx, shop_id, day_start).await?;
                if sold_today >= limit {
                    warn!(shop_id = %shop_id, sold_today, limit, "Demo invoice quota reached");
                    return Err(CoreError::DemoLimitExceeded {
                        resource: "invoices".to_string(),
                        limit,
                    }
                    .into());
                }
            }
        }

        // 2. Customer
        let customer = match request.customer_name() {
            Some(name) => {
                Some(customer::find_or_create(&mut tx, shop_id, name, request.customer_phone(), now).await?)
            }
            None => None,
        };

        // 3. Lines: price from the catalog, stock out on the sale path
        let mut lines = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = find_product(&mut tx, shop_id, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            if is_sale {
                if !product.can_sell(line.quantity) {
                    return Err(insufficient(&product.name, product.stock, line.quantity));
                }
                let decremented = sqlx::query(
                    r#"
                    UPDATE products SET stock = stock - ?3, updated_at = ?4
                    WHERE id = ?1 AND shop_id = ?2 AND stock >= ?3
                    "#,
                )
                .bind(&product.id)
                .bind(shop_id)
                .bind(line.quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                if decremented.rows_affected() == 0 {
                    return Err(insufficient(&product.name, product.stock, line.quantity));
                }
            }

            let price = product.price();
            lines.push(PricedLine {
                total: price.multiply_quantity(line.quantity),
                product_id: product.id,
                name: product.name,
                quantity: line.quantity,
                price,
            });
        }

        // 4-5. Totals and status
        let paid = Money::from_cents(request.payment_amount_cents);
        let summary = summarize(
            lines.iter().map(|line| line.total),
            Money::from_cents(request.discount_cents),
            paid,
            requested,
        );
        let tax = if shop.tax_inclusive {
            summary.final_amount.included_tax(shop.tax_rate())
        } else {
            Money::zero()
        };

        // 6. Number
        let kind = DocumentKind::for_invoice(summary.status);
        let invoice_number =
            allocate_document_number(&mut tx, shop_id, kind, now.timestamp_millis()).await?;

        // 7. Invoice and items
        let invoice = Invoice {
            id: new_id(),
            shop_id: shop_id.to_string(),
            customer_id: customer.as_ref().map(|c| c.id.clone()),
            invoice_number,
            date: now,
            total_cents: summary.final_amount.cents(),
            tax_cents: tax.cents(),
            discount_cents: request.discount_cents,
            paid_cents: paid.cents(),
            status: summary.status,
            payment_mode: request.payment_mode.trim().to_string(),
            created_at: now,
        };
        insert_invoice(&mut tx, &invoice).await?;

        for line in &lines {
            sqlx::query(concat!(
                "INSERT INTO invoice_items (",
                invoice_item_columns!(),
                ") VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ))
            .bind(new_id())
            .bind(&invoice.id)
            .bind(&line.product_id)
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.price.cents())
            .bind(line.total.cents())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        // 8. Payment
        if summary.records_payment(paid) {
            sqlx::query(
                r#"
                INSERT INTO payments (id, shop_id, customer_id, amount_cents, mode, direction, reference, date)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(new_id())
            .bind(shop_id)
            .bind(&invoice.customer_id)
            .bind(paid.cents())
            .bind(&invoice.payment_mode)
            .bind(PaymentDirection::In)
            .bind(&invoice.invoice_number)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        // 9. Commit
        tx.commit().await?;

        info!(
            shop_id = %shop_id,
            invoice_number = %invoice.invoice_number,
            status = invoice.status.as_str(),
            total_cents = invoice.total_cents,
            "Invoice created"
        );

        // 10. Re-read
        self.get(shop_id, &invoice.id).await
    }

    /// Gets an invoice with its items and customer.
    pub async fn get(&self, shop_id: &str, id: &str) -> DbResult<InvoiceDetail> {
        let mut conn = self.pool.acquire().await?;

        let invoice = sqlx::query_as::<_, Invoice>(concat!(
            "SELECT ",
            invoice_columns!(),
            " FROM invoices WHERE id = ?1 AND shop_id = ?2"
        ))
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))?;

        let items = sqlx::query_as::<_, InvoiceItem>(concat!(
            "SELECT ",
            invoice_item_columns!(),
            " FROM invoice_items WHERE invoice_id = ?1 ORDER BY rowid"
        ))
        .bind(&invoice.id)
        .fetch_all(&mut *conn)
        .await?;

        let customer = match invoice.customer_id.as_deref() {
            Some(customer_id) => customer::find(&mut conn, shop_id, customer_id).await?,
            None => None,
        };

        Ok(InvoiceDetail {
            invoice,
            items,
            customer,
        })
    }

    /// Lists the shop's invoices, newest first, with items and customers.
    pub async fn list(&self, shop_id: &str) -> DbResult<Vec<InvoiceDetail>> {
        let mut conn = self.pool.acquire().await?;

        let invoices = sqlx::query_as::<_, Invoice>(concat!(
            "SELECT ",
            invoice_columns!(),
            " FROM invoices WHERE shop_id = ?1 ORDER BY date DESC, created_at DESC"
        ))
        .bind(shop_id)
        .fetch_all(&mut *conn)
        .await?;

        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT ii.id, ii.invoice_id, ii.product_id, ii.name_snapshot, ii.quantity,
                   ii.price_cents, ii.total_cents, ii.created_at
            FROM invoice_items ii
            JOIN invoices i ON i.id = ii.invoice_id
            WHERE i.shop_id = ?1
            ORDER BY ii.rowid
            "#,
        )
        .bind(shop_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut items_by_invoice: HashMap<String, Vec<InvoiceItem>> = HashMap::new();
        for item in items {
            items_by_invoice.entry(item.invoice_id.clone()).or_default().push(item);
        }

        let customers: HashMap<_, _> = customer::list_for_shop(&mut conn, shop_id)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();

        let details = invoices
            .into_iter()
            .map(|invoice| InvoiceDetail {
                items: items_by_invoice.remove(&invoice.id).unwrap_or_default(),
                customer: invoice
                    .customer_id
                    .as_ref()
                    .and_then(|id| customers.get(id).cloned()),
                invoice,
            })
            .collect::<Vec<_>>();

        debug!(shop_id = %shop_id, count = details.len(), "Listed invoices");
        Ok(details)
    }
}

fn insufficient(product: &str, available: i64, requested: i64) -> DbError {
    CoreError::InsufficientStock {
        product: product.to_string(),
        available,
        requested,
    }
    .into()
}

/// Sale invoices (not HELD or QUOTATION) created at or after `since`.
async fn count_sales_since(
    conn: &mut SqliteConnection,
    shop_id: &str,
    since: DateTime<Utc>,
) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM invoices
        WHERE shop_id = ?1 AND created_at >= ?2 AND status NOT IN (?3, ?4)
        "#,
    )
    .bind(shop_id)
    .bind(since)
    .bind(InvoiceStatus::Held.as_str())
    .bind(InvoiceStatus::Quotation.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

async fn insert_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    sqlx::query(concat!(
        "INSERT INTO invoices (",
        invoice_columns!(),
        ") VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    ))
    .bind(&invoice.id)
    .bind(&invoice.shop_id)
    .bind(&invoice.customer_id)
    .bind(&invoice.invoice_number)
    .bind(invoice.date)
    .bind(invoice.total_cents)
    .bind(invoice.tax_cents)
    .bind(invoice.discount_cents)
    .bind(invoice.paid_cents)
    .bind(invoice.status.as_str())
    .bind(&invoice.payment_mode)
    .bind(invoice.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::repository::test_support;
    use crate::{Database, DbConfig};
    use tillbook_core::checkout::CheckoutLine;
    use tillbook_core::tenant::ShopSettingsPatch;
    use tillbook_core::Payment;

    fn cart(lines: &[(&str, i64)], paid: i64, status: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            customer_name: None,
            customer_phone: None,
            items: lines
                .iter()
                .map(|(product_id, quantity)| CheckoutLine {
                    product_id: product_id.to_string(),
                    quantity: *quantity,
                })
                .collect(),
            discount_cents: 0,
            payment_mode: "CASH".to_string(),
            payment_amount_cents: paid,
            status: status.map(str::to_string),
        }
    }

    async fn payments(db: &Database, shop_id: &str) -> Vec<Payment> {
        sqlx::query_as::<_, Payment>(
            "SELECT id, shop_id, customer_id, amount_cents, mode, direction, reference, date \
             FROM payments WHERE shop_id = ?1",
        )
        .bind(shop_id)
        .fetch_all(db.pool())
        .await
        .unwrap()
    }

    async fn stock(db: &Database, shop_id: &str, product_id: &str) -> i64 {
        db.products().get(shop_id, product_id).await.unwrap().stock
    }

    #[tokio::test]
    async fn test_paid_sale() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 1000, 10).await;

        let detail = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 2)], 2000, None), None, &Utc::now())
            .await
            .unwrap();

        assert_eq!(detail.invoice.total_cents, 2000);
        assert_eq!(detail.invoice.status, InvoiceStatus::Paid);
        assert!(detail.invoice.invoice_number.starts_with("INV-"));
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].price_cents, 1000);
        assert_eq!(detail.items[0].name_snapshot, "Cola");
        assert_eq!(stock(&db, &shop.id, &p1.id).await, 8);

        let payments = payments(&db, &shop.id).await;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount_cents, 2000);
        assert_eq!(payments[0].direction, PaymentDirection::In);
        assert_eq!(payments[0].reference.as_deref(), Some(detail.invoice.invoice_number.as_str()));
    }

    #[tokio::test]
    async fn test_partial_payment() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 1000, 10).await;

        let detail = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 2)], 500, None), None, &Utc::now())
            .await
            .unwrap();

        assert_eq!(detail.invoice.status, InvoiceStatus::Partial);
        assert_eq!(detail.invoice.paid_cents, 500);
        assert_eq!(detail.invoice.balance().cents(), 1500);
        let payments = payments(&db, &shop.id).await;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount_cents, 500);
    }

    #[tokio::test]
    async fn test_unpaid_sale_is_due() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 1000, 10).await;

        let detail = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 1)], 0, None), None, &Utc::now())
            .await
            .unwrap();

        assert_eq!(detail.invoice.status, InvoiceStatus::Due);
        assert!(payments(&db, &shop.id).await.is_empty());
        assert_eq!(stock(&db, &shop.id, &p1.id).await, 9);
    }

    #[tokio::test]
    async fn test_held_and_quotation_touch_nothing() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 1000, 1).await;

        let held = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 5)], 2000, Some("HELD")), None, &Utc::now())
            .await
            .unwrap();
        assert_eq!(held.invoice.status, InvoiceStatus::Held);
        assert_eq!(held.invoice.total_cents, 5000);
        assert!(held.invoice.invoice_number.starts_with("INV-"));

        let quote = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 3)], 0, Some("quotation")), None, &Utc::now())
            .await
            .unwrap();
        assert_eq!(quote.invoice.status, InvoiceStatus::Quotation);
        assert!(quote.invoice.invoice_number.starts_with("QTN-"));

        assert_eq!(stock(&db, &shop.id, &p1.id).await, 1);
        assert!(payments(&db, &shop.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_sale_status_rejected() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 1000, 10).await;

        let err = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 1)], 0, Some("PAID")), None, &Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let plenty = test_support::product(&db, &shop.id, "Rice", 500, 10).await;
        let scarce = test_support::product(&db, &shop.id, "Saffron", 9000, 1).await;

        let mut request = cart(&[(&plenty.id, 3), (&scarce.id, 2)], 0, None);
        request.customer_name = Some("Ravi".to_string());
        request.customer_phone = Some("9876543210".to_string());

        let err = db
            .invoices()
            .checkout(&shop.id, &request, None, &Utc::now())
            .await
            .unwrap_err();

        match err {
            DbError::Domain(CoreError::InsufficientStock {
                product,
                available,
                requested,
            }) => {
                assert_eq!(product, "Saffron");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(stock(&db, &shop.id, &plenty.id).await, 10);
        assert_eq!(stock(&db, &shop.id, &scarce.id).await, 1);
        assert!(db.invoices().list(&shop.id).await.unwrap().is_empty());
        let customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(customers, 0);
    }

    #[tokio::test]
    async fn test_same_product_twice_counts_cumulative_stock() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 1000, 3).await;

        let err = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 2), (&p1.id, 2)], 0, None), None, &Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { available: 1, .. })));
        assert_eq!(stock(&db, &shop.id, &p1.id).await, 3);
    }

    #[tokio::test]
    async fn test_foreign_product_not_found() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let other = test_support::shop(&db, "other@example.com", false).await;
        let foreign = test_support::product(&db, &other.id, "Cola", 1000, 10).await;

        let err = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&foreign.id, 1)], 0, None), None, &Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
        assert_eq!(stock(&db, &other.id, &foreign.id).await, 10);
    }

    #[tokio::test]
    async fn test_discount_and_totals() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let a = test_support::product(&db, &shop.id, "Tea", 250, 10).await;
        let b = test_support::product(&db, &shop.id, "Biscuits", 120, 10).await;

        let mut request = cart(&[(&a.id, 2), (&b.id, 3)], 800, None);
        request.discount_cents = 60;
        let detail = db
            .invoices()
            .checkout(&shop.id, &request, None, &Utc::now())
            .await
            .unwrap();

        let items_total: i64 = detail.items.iter().map(|i| i.total_cents).sum();
        assert_eq!(items_total, 860);
        assert_eq!(detail.invoice.total_cents, 800);
        assert_eq!(items_total, detail.invoice.total_cents + detail.invoice.discount_cents);
        assert_eq!(detail.invoice.status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn test_demo_quota_counts_only_sales() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", true).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 100, 100).await;
        let now = Utc::now();

        for _ in 0..2 {
            db.invoices()
                .checkout(&shop.id, &cart(&[(&p1.id, 1)], 100, None), Some(2), &now)
                .await
                .unwrap();
        }

        let err = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 1)], 100, None), Some(2), &now)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::DemoLimitExceeded { limit: 2, .. })));
        assert_eq!(stock(&db, &shop.id, &p1.id).await, 98);

        // parking a cart is never limited
        db.invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 1)], 0, Some("HELD")), Some(2), &now)
            .await
            .unwrap();

        // exempt callers pass no limit
        db.invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 1)], 100, None), None, &now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_quota_ignored_for_non_demo_shop() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 100, 100).await;

        for _ in 0..3 {
            db.invoices()
                .checkout(&shop.id, &cart(&[(&p1.id, 1)], 100, None), Some(1), &Utc::now())
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_customer_matched_by_phone() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 100, 100).await;

        let mut request = cart(&[(&p1.id, 1)], 100, None);
        request.customer_name = Some("Ravi".to_string());
        request.customer_phone = Some("9876543210".to_string());

        let first = db.invoices().checkout(&shop.id, &request, None, &Utc::now()).await.unwrap();
        let second = db.invoices().checkout(&shop.id, &request, None, &Utc::now()).await.unwrap();
        assert_eq!(first.invoice.customer_id, second.invoice.customer_id);
        assert_eq!(first.customer.as_ref().map(|c| c.name.as_str()), Some("Ravi"));

        // no phone: a new customer each time
        request.customer_phone = Some("  ".to_string());
        let third = db.invoices().checkout(&shop.id, &request, None, &Utc::now()).await.unwrap();
        let fourth = db.invoices().checkout(&shop.id, &request, None, &Utc::now()).await.unwrap();
        assert_ne!(third.invoice.customer_id, fourth.invoice.customer_id);
        assert_ne!(third.invoice.customer_id, first.invoice.customer_id);
    }

    #[tokio::test]
    async fn test_number_collision_advances_suffix() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 100, 100).await;
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();

        let first = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 1)], 100, None), None, &now)
            .await
            .unwrap();
        let second = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 1)], 100, None), None, &now)
            .await
            .unwrap();

        assert_eq!(first.invoice.invoice_number, "INV-200000");
        assert_eq!(second.invoice.invoice_number, "INV-200001");

        // numbering is per shop
        let other = test_support::shop(&db, "other@example.com", false).await;
        let p2 = test_support::product(&db, &other.id, "Cola", 100, 100).await;
        let theirs = db
            .invoices()
            .checkout(&other.id, &cart(&[(&p2.id, 1)], 100, None), None, &now)
            .await
            .unwrap();
        assert_eq!(theirs.invoice.invoice_number, "INV-200000");
    }

    #[tokio::test]
    async fn test_tax_inclusive_shop_records_included_tax() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let patch = ShopSettingsPatch {
            tax_rate_bps: Some(1800),
            tax_inclusive: Some(true),
            ..Default::default()
        };
        db.shops().update_settings(&shop.id, &patch, Utc::now()).await.unwrap();
        let p1 = test_support::product(&db, &shop.id, "Shirt", 11_800, 5).await;

        let detail = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 1)], 11_800, None), None, &Utc::now())
            .await
            .unwrap();
        assert_eq!(detail.invoice.total_cents, 11_800);
        assert_eq!(detail.invoice.tax_cents, 1800);
    }

    #[tokio::test]
    async fn test_deleted_product_keeps_snapshot() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 1000, 10).await;

        let detail = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 1)], 1000, None), None, &Utc::now())
            .await
            .unwrap();
        db.products().delete(&shop.id, &p1.id).await.unwrap();

        let reread = db.invoices().get(&shop.id, &detail.invoice.id).await.unwrap();
        assert_eq!(reread.items[0].product_id, None);
        assert_eq!(reread.items[0].name_snapshot, "Cola");
        assert_eq!(reread.items[0].price_cents, 1000);
    }

    #[tokio::test]
    async fn test_list_is_stable_and_scoped() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let other = test_support::shop(&db, "other@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 1000, 10).await;

        db.invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 1)], 1000, None), None, &Utc::now())
            .await
            .unwrap();

        let first = db.invoices().list(&shop.id).await.unwrap();
        let again = db.invoices().list(&shop.id).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].invoice.id, again[0].invoice.id);
        assert_eq!(first[0].items.len(), 1);
        assert!(db.invoices().list(&other.id).await.unwrap().is_empty());

        let err = db.invoices().get(&other.id, &first[0].invoice.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvoiceNotFound(_))));
    }

    #[tokio::test]
    async fn test_burst_in_one_millisecond_gets_distinct_numbers() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 100, 100).await;
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();

        let mut numbers = HashSet::new();
        for _ in 0..40 {
            let detail = db
                .invoices()
                .checkout(&shop.id, &cart(&[(&p1.id, 1)], 100, None), None, &now)
                .await
                .unwrap();
            numbers.insert(detail.invoice.invoice_number);
        }
        assert_eq!(numbers.len(), 40);
        assert!(numbers.contains("INV-200039"));

        // a later clock landing inside the used range jumps past it
        let later = now + chrono::Duration::milliseconds(5);
        let detail = db
            .invoices()
            .checkout(&shop.id, &cart(&[(&p1.id, 1)], 100, None), None, &later)
            .await
            .unwrap();
        assert_eq!(detail.invoice.invoice_number, "INV-200040");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_on_file_database() {
        let path = std::env::temp_dir().join(format!("tillbook-checkout-{}.db", new_id()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(8))
            .await
            .unwrap();
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let p1 = test_support::product(&db, &shop.id, "Cola", 100, 8).await;

        let mut handles = Vec::new();
        for _ in 0..40 {
            let repo = db.invoices();
            let shop_id = shop.id.clone();
            let request = cart(&[(&p1.id, 1)], 100, None);
            handles.push(tokio::spawn(async move {
                repo.checkout(&shop_id, &request, None, &Utc::now()).await
            }));
        }

        let mut sold = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => sold += 1,
                Err(DbError::Domain(CoreError::InsufficientStock { .. })) => {}
                Err(other) => panic!("checkout failed: {other}"),
            }
        }
        assert_eq!(sold, 8);
        assert_eq!(stock(&db, &shop.id, &p1.id).await, 0);

        let numbers: HashSet<String> = db
            .invoices()
            .list(&shop.id)
            .await
            .unwrap()
            .into_iter()
            .map(|detail| detail.invoice.invoice_number)
            .collect();
        assert_eq!(numbers.len(), 8);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
