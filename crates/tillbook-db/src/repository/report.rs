//! # Report Repository
//!
//! Read-only aggregation queries behind the dashboard and the top-products
//! report. The queries gather raw figures; the maths (averages, pending
//! balance, dead-stock value, health score) lives in
//! `tillbook_core::report::build_dashboard`.
//!
//! ## Figures per Dashboard
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────────────┐
//! │ window sales         │ PAID invoices with date in [start, end]          │
//! │ trailing sales       │ sale invoices dated in the last 30 days          │
//! │ all-time sales       │ sale invoices, any date                          │
//! │ all-time payments    │ IN payments, any date                            │
//! │ low stock            │ products with stock ≤ 5                          │
//! │ dead stock           │ stock > 0, older than N days, no sale line       │
//! │                      │ in the last N days (oldest first)                │
//! │ recent sales         │ latest 5 invoices, any status                    │
//! │ top products         │ Σ quantity over sale lines in the window         │
//! └──────────────────────┴──────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::shop::fetch_shop;
use tillbook_core::report::{
    build_dashboard, DashboardFigures, DashboardStats, DateWindow, DeadStockItem, RecentSale,
    TopProduct, DASHBOARD_LIST_LIMIT, MOMENTUM_DAYS,
};
use tillbook_core::{InvoiceStatus, Money, PaymentDirection, LOW_STOCK_THRESHOLD};

/// Repository for report queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Gathers every dashboard figure for the window and builds the payload.
    ///
    /// Errors are returned to the caller; the HTTP layer decides to serve
    /// [`DashboardStats::empty`] instead.
    pub async fn dashboard<Tz: TimeZone>(
        &self,
        shop_id: &str,
        window: DateWindow,
        now: &DateTime<Tz>,
    ) -> DbResult<DashboardStats> {
        let now = now.with_timezone(&Utc);
        let mut conn = self.pool.acquire().await?;

        let shop = fetch_shop(&mut conn, shop_id).await?;

        let (window_sales, window_count) = paid_in_window(&mut conn, shop_id, &window).await?;
        let trailing_sales = sale_total_since(&mut conn, shop_id, Some(now - Duration::days(MOMENTUM_DAYS))).await?;
        let all_time_sales = sale_total_since(&mut conn, shop_id, None).await?;
        let all_time_payments = payments_in(&mut conn, shop_id).await?;

        let (low_stock_count, total_products) = stock_counts(&mut conn, shop_id).await?;

        let cutoff = now - Duration::days(shop.dead_stock_days);
        let dead_stock = dead_stock(&mut conn, shop_id, cutoff).await?;
        let recent_sales = recent_sales(&mut conn, shop_id).await?;
        let top_products = top_products(&mut conn, shop_id, Some(&window)).await?;

        debug!(
            shop_id = %shop_id,
            window_count,
            dead_stock = dead_stock.len(),
            "Dashboard figures gathered"
        );

        Ok(build_dashboard(DashboardFigures {
            window,
            now,
            window_sales,
            window_count,
            trailing_sales,
            all_time_sales,
            all_time_payments,
            low_stock_count,
            total_products,
            dead_stock_days: shop.dead_stock_days,
            dead_stock,
            recent_sales,
            top_products,
        }))
    }

    /// Top five products by quantity sold, all-time when `window` is `None`.
    pub async fn top_products(&self, shop_id: &str, window: Option<DateWindow>) -> DbResult<Vec<TopProduct>> {
        let mut conn = self.pool.acquire().await?;
        top_products(&mut conn, shop_id, window.as_ref()).await
    }
}

async fn paid_in_window(
    conn: &mut SqliteConnection,
    shop_id: &str,
    window: &DateWindow,
) -> DbResult<(Money, i64)> {
    let (total, count): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total_cents), 0), COUNT(*)
        FROM invoices
        WHERE shop_id = ?1 AND status = ?2 AND date >= ?3 AND date <= ?4
        "#,
    )
    .bind(shop_id)
    .bind(InvoiceStatus::Paid.as_str())
    .bind(window.start)
    .bind(window.end)
    .fetch_one(&mut *conn)
    .await?;

    Ok((Money::from_cents(total), count))
}

/// Σ total of sale invoices (not HELD or QUOTATION), optionally since a date.
async fn sale_total_since(
    conn: &mut SqliteConnection,
    shop_id: &str,
    since: Option<DateTime<Utc>>,
) -> DbResult<Money> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(total_cents), 0)
        FROM invoices
        WHERE shop_id = ?1 AND status NOT IN (?2, ?3) AND (?4 IS NULL OR date >= ?4)
        "#,
    )
    .bind(shop_id)
    .bind(InvoiceStatus::Held.as_str())
    .bind(InvoiceStatus::Quotation.as_str())
    .bind(since)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Money::from_cents(total))
}

async fn payments_in(conn: &mut SqliteConnection, shop_id: &str) -> DbResult<Money> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM payments WHERE shop_id = ?1 AND direction = ?2",
    )
    .bind(shop_id)
    .bind(PaymentDirection::In)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Money::from_cents(total))
}

/// (low-stock count, total products).
async fn stock_counts(conn: &mut SqliteConnection, shop_id: &str) -> DbResult<(i64, i64)> {
    let counts: (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(CASE WHEN stock <= ?2 THEN 1 ELSE 0 END), 0), COUNT(*)
        FROM products
        WHERE shop_id = ?1
        "#,
    )
    .bind(shop_id)
    .bind(LOW_STOCK_THRESHOLD)
    .fetch_one(&mut *conn)
    .await?;

    Ok(counts)
}

async fn dead_stock(
    conn: &mut SqliteConnection,
    shop_id: &str,
    cutoff: DateTime<Utc>,
) -> DbResult<Vec<DeadStockItem>> {
    let items = sqlx::query_as::<_, DeadStockItem>(
        r#"
        SELECT p.id, p.name, p.price_cents, p.stock, p.created_at
        FROM products p
        WHERE p.shop_id = ?1
          AND p.stock > 0
          AND p.created_at <= ?2
          AND NOT EXISTS (
              SELECT 1 FROM invoice_items ii
              WHERE ii.product_id = p.id AND ii.created_at >= ?2
          )
        ORDER BY p.created_at ASC
        "#,
    )
    .bind(shop_id)
    .bind(cutoff)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

async fn recent_sales(conn: &mut SqliteConnection, shop_id: &str) -> DbResult<Vec<RecentSale>> {
    let sales = sqlx::query_as::<_, RecentSale>(
        r#"
        SELECT i.id, i.invoice_number, i.date, i.total_cents, i.paid_cents, i.status,
               i.payment_mode, c.name AS customer_name
        FROM invoices i
        LEFT JOIN customers c ON c.id = i.customer_id
        WHERE i.shop_id = ?1
        ORDER BY i.date DESC, i.created_at DESC
        LIMIT ?2
        "#,
    )
    .bind(shop_id)
    .bind(DASHBOARD_LIST_LIMIT)
    .fetch_all(&mut *conn)
    .await?;

    Ok(sales)
}

/// Groups sale lines by product. Lines whose product was deleted drop out.
async fn top_products(
    conn: &mut SqliteConnection,
    shop_id: &str,
    window: Option<&DateWindow>,
) -> DbResult<Vec<TopProduct>> {
    let products = sqlx::query_as::<_, TopProduct>(
        r#"
        SELECT p.id AS product_id, p.name, p.price_cents,
               SUM(ii.quantity) AS total_sold,
               SUM(ii.total_cents) AS total_revenue_cents
        FROM invoice_items ii
        JOIN invoices i ON i.id = ii.invoice_id
        JOIN products p ON p.id = ii.product_id
        WHERE i.shop_id = ?1
          AND p.shop_id = ?1
          AND i.status NOT IN (?2, ?3)
          AND (?4 IS NULL OR ii.created_at >= ?4)
          AND (?5 IS NULL OR ii.created_at <= ?5)
        GROUP BY p.id, p.name, p.price_cents
        ORDER BY total_sold DESC, p.name ASC
        LIMIT ?6
        "#,
    )
    .bind(shop_id)
    .bind(InvoiceStatus::Held.as_str())
    .bind(InvoiceStatus::Quotation.as_str())
    .bind(window.map(|w| w.start))
    .bind(window.map(|w| w.end))
    .bind(DASHBOARD_LIST_LIMIT)
    .fetch_all(&mut *conn)
    .await?;

    Ok(products)
}

// =============================================================================
// Unit Tests
// =============================================================================
