//! # Repository Module
//!
//! Tenant-scoped repository implementations for Tillbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.products().get(&shop_id, &id)                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── list(&self, shop_id)                                              │
//! │  ├── get(&self, shop_id, id)                                           │
//! │  ├── create(&self, shop_id, new)                                       │
//! │  └── update(&self, shop_id, id, patch)                                 │
//! │       │                                                                 │
//! │       │  SQL with `WHERE shop_id = ?` on every statement               │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  The tenant is always an explicit argument. A row that exists in      │
//! │  another shop is indistinguishable from a row that does not exist.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ShopRepository`](shop::ShopRepository) - Sign-up, settings, resets, account deletion
//! - [`UserRepository`](user::UserRepository) - Login lookups
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD and bulk operations
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Checkout transaction and invoice reads
//! - [`SupplierRepository`](supplier::SupplierRepository) - Supplier CRUD
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - Purchase orders and receipt
//! - [`ReportRepository`](report::ReportRepository) - Dashboard and report aggregates
//!
//! [`customer`] has no repository of its own: customers are only created by
//! checkout and read back with their invoices.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tillbook_core::checkout::{document_number, numbered, DocumentKind, MAX_NUMBER_ATTEMPTS};
use tillbook_core::CoreError;

pub mod customer;
pub mod invoice;
pub mod product;
pub mod purchase;
pub mod report;
pub mod shop;
pub mod supplier;
pub mod user;

/// Generates a new record ID.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Opens a write transaction that holds the SQLite write lock from `BEGIN`.
///
/// Every transaction here reads before it writes; a deferred transaction
/// fails with `SQLITE_BUSY` when it tries to upgrade after another writer
/// committed, whereas `BEGIN IMMEDIATE` queues on the busy timeout.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Picks a free `PREFIX-NNNNNN` number in the shop.
///
/// The candidate derived from `epoch_millis` is tried first. On a clash the
/// search restarts one past the highest suffix the shop already uses for
/// this prefix, advancing up to [`MAX_NUMBER_ATTEMPTS`] times (only a wrap
/// past 999999 can clash again). Callers hold the write lock, and the
/// unique index on `(shop_id, number)` still guards the final insert.
pub(crate) async fn allocate_document_number(
    conn: &mut SqliteConnection,
    shop_id: &str,
    kind: DocumentKind,
    epoch_millis: i64,
) -> DbResult<String> {
    let candidate = document_number(kind, epoch_millis, 0);
    if !number_taken(conn, shop_id, kind, &candidate).await? {
        return Ok(candidate);
    }

    let start = match highest_suffix(conn, shop_id, kind).await? {
        Some(highest) => highest + 1,
        None => epoch_millis + 1,
    };
    debug!(shop_id = %shop_id, candidate = %candidate, start, "Document number taken, jumping past highest");

    for offset in 0..MAX_NUMBER_ATTEMPTS {
        let candidate = numbered(kind, start + offset as i64);
        if !number_taken(conn, shop_id, kind, &candidate).await? {
            return Ok(candidate);
        }
    }

    Err(CoreError::NumberExhausted {
        prefix: kind.prefix().to_string(),
    }
    .into())
}

async fn number_taken(
    conn: &mut SqliteConnection,
    shop_id: &str,
    kind: DocumentKind,
    candidate: &str,
) -> DbResult<bool> {
    let sql = match kind {
        DocumentKind::Invoice | DocumentKind::Quotation => {
            "SELECT COUNT(*) FROM invoices WHERE shop_id = ?1 AND invoice_number = ?2"
        }
        DocumentKind::PurchaseOrder => {
            "SELECT COUNT(*) FROM purchase_orders WHERE shop_id = ?1 AND po_number = ?2"
        }
    };

    let taken: i64 = sqlx::query_scalar(sql)
        .bind(shop_id)
        .bind(candidate)
        .fetch_one(&mut *conn)
        .await?;
    Ok(taken > 0)
}

/// Highest numeric suffix in use for the kind's prefix, if any.
async fn highest_suffix(conn: &mut SqliteConnection, shop_id: &str, kind: DocumentKind) -> DbResult<Option<i64>> {
    let sql = match kind {
        DocumentKind::Invoice | DocumentKind::Quotation => {
            r#"
            SELECT MAX(CAST(substr(invoice_number, length(?2) + 1) AS INTEGER))
            FROM invoices WHERE shop_id = ?1 AND invoice_number LIKE ?2 || '%'
            "#
        }
        DocumentKind::PurchaseOrder => {
            r#"
            SELECT MAX(CAST(substr(po_number, length(?2) + 1) AS INTEGER))
            FROM purchase_orders WHERE shop_id = ?1 AND po_number LIKE ?2 || '%'
            "#
        }
    };

    let highest: Option<i64> = sqlx::query_scalar(sql)
        .bind(shop_id)
        .bind(format!("{}-", kind.prefix()))
        .fetch_one(&mut *conn)
        .await?;
    Ok(highest)
}
