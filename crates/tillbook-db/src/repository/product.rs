//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD scoped to the caller's shop
//! - Bulk import of already-parsed rows (one transaction)
//! - Bulk quick-edit (one transaction, unknown ids ignored)
//! - Creation counts for demo quotas
//!
//! ## Stock Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Who changes products.stock?                                            │
//! │                                                                         │
//! │  ProductRepository::update     absolute value (manual correction)      │
//! │  InvoiceRepository::checkout   stock = stock - q WHERE stock >= q      │
//! │  PurchaseRepository::receive   stock = stock + q                       │
//! │                                                                         │
//! │  The CHECK (stock >= 0) constraint backs all three.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, TimeZone, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::shop::fetch_shop;
use crate::repository::{begin_write, new_id};
use tillbook_core::catalog::{NewProduct, ProductPatch, ProductQuickEdit};
use tillbook_core::report::start_of_day;
use tillbook_core::{CoreError, Product, ValidationError};

macro_rules! product_columns {
    () => {
        "id, shop_id, name, category, description, price_cents, cost_price_cents, stock, \
         sku, barcode, created_at, updated_at"
    };
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let products = repo.list(&shop_id).await?;
/// let product = repo.get(&shop_id, "uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists the shop's products, newest first.
    pub async fn list(&self, shop_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products WHERE shop_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(shop_id = %shop_id, count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no such product in this shop
    pub async fn get(&self, shop_id: &str, id: &str) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        find_product(&mut conn, shop_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Inserts a new product.
    pub async fn create(&self, shop_id: &str, new: &NewProduct, now: DateTime<Utc>) -> DbResult<Product> {
        new.validate()?;

        let mut conn = self.pool.acquire().await?;
        let product = insert_product(&mut conn, shop_id, new, now).await?;

        info!(shop_id = %shop_id, product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Inserts many products in one transaction.
    ///
    /// Every row is validated before anything is written; one bad row
    /// rejects the whole batch. A demo shop with `demo_daily_limit` set is
    /// rejected when the batch would take it past the day's allowance.
    pub async fn bulk_create<Tz: TimeZone>(
        &self,
        shop_id: &str,
        rows: &[NewProduct],
        demo_daily_limit: Option<i64>,
        now: &DateTime<Tz>,
    ) -> DbResult<Vec<Product>> {
        if rows.is_empty() {
            return Err(ValidationError::Required {
                field: "products".to_string(),
            }
            .into());
        }
        for row in rows {
            row.validate()?;
        }

        let day_start = start_of_day(now);
        let now = now.with_timezone(&Utc);

        let mut tx = begin_write(&self.pool).await?;

        if let Some(limit) = demo_daily_limit {
            if fetch_shop(&mut tx, shop_id).await?.is_demo {
                let created_today = count_created(&mut tx, shop_id, day_start).await?;
                if created_today + rows.len() as i64 > limit {
                    warn!(shop_id = %shop_id, created_today, batch = rows.len(), limit, "Demo product quota reached");
                    return Err(CoreError::DemoLimitExceeded {
                        resource: "products".to_string(),
                        limit,
                    }
                    .into());
                }
            }
        }

        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            created.push(insert_product(&mut tx, shop_id, row, now).await?);
        }
        tx.commit().await?;

        info!(shop_id = %shop_id, count = created.len(), "Products bulk created");
        Ok(created)
    }

    /// Applies a partial update.
    pub async fn update(
        &self,
        shop_id: &str,
        id: &str,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> DbResult<Product> {
        patch.validate()?;

        let mut conn = self.pool.acquire().await?;
        let updated = apply_patch(&mut conn, shop_id, id, patch, now).await?;
        if !updated {
            return Err(DbError::not_found("Product", id));
        }

        debug!(shop_id = %shop_id, product_id = %id, "Product updated");
        find_product(&mut conn, shop_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Applies many partial updates in one transaction.
    ///
    /// Rows without an id are skipped and ids not in this shop are ignored.
    ///
    /// ## Returns
    /// Number of products actually updated.
    pub async fn bulk_update(
        &self,
        shop_id: &str,
        rows: &[ProductQuickEdit],
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        for row in rows {
            row.changes.validate()?;
        }

        let mut tx = begin_write(&self.pool).await?;
        let mut updated = 0;
        for row in rows {
            let Some(id) = row.id.as_deref().filter(|id| !id.trim().is_empty()) else {
                continue;
            };
            if apply_patch(&mut tx, shop_id, id, &row.changes, now).await? {
                updated += 1;
            }
        }
        tx.commit().await?;

        info!(shop_id = %shop_id, requested = rows.len(), updated, "Products bulk updated");
        Ok(updated)
    }

    /// Deletes a product. Invoice and purchase lines keep their snapshots
    /// and lose the product reference.
    pub async fn delete(&self, shop_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1 AND shop_id = ?2")
            .bind(id)
            .bind(shop_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(shop_id = %shop_id, product_id = %id, "Product deleted");
        Ok(())
    }

    /// Counts products created at or after `since`.
    pub async fn count_created_since(&self, shop_id: &str, since: DateTime<Utc>) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        count_created(&mut conn, shop_id, since).await
    }
}

async fn count_created(conn: &mut SqliteConnection, shop_id: &str, since: DateTime<Utc>) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE shop_id = ?1 AND created_at >= ?2")
        .bind(shop_id)
        .bind(since)
        .fetch_one(&mut *conn)
        .await?;

    Ok(count)
}

/// Loads a product on an existing connection or transaction.
pub(crate) async fn find_product(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(concat!(
        "SELECT ",
        product_columns!(),
        " FROM products WHERE id = ?1 AND shop_id = ?2"
    ))
    .bind(id)
    .bind(shop_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

async fn insert_product(
    conn: &mut SqliteConnection,
    shop_id: &str,
    new: &NewProduct,
    now: DateTime<Utc>,
) -> DbResult<Product> {
    let product = Product {
        id: new_id(),
        shop_id: shop_id.to_string(),
        name: new.name.trim().to_string(),
        category: new.category.clone(),
        description: new.description.clone(),
        price_cents: new.price_cents,
        cost_price_cents: new.cost_price_cents,
        stock: new.stock,
        sku: new.sku.clone().filter(|sku| !sku.trim().is_empty()),
        barcode: new.barcode.clone(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(concat!(
        "INSERT INTO products (",
        product_columns!(),
        ") VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    ))
    .bind(&product.id)
    .bind(&product.shop_id)
    .bind(&product.name)
    .bind(&product.category)
    .bind(&product.description)
    .bind(product.price_cents)
    .bind(product.cost_price_cents)
    .bind(product.stock)
    .bind(&product.sku)
    .bind(&product.barcode)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(product)
}

/// Returns whether a row in this shop was updated.
async fn apply_patch(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
    patch: &ProductPatch,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            name = COALESCE(?3, name),
            category = COALESCE(?4, category),
            description = COALESCE(?5, description),
            price_cents = COALESCE(?6, price_cents),
            cost_price_cents = COALESCE(?7, cost_price_cents),
            stock = COALESCE(?8, stock),
            sku = COALESCE(?9, sku),
            barcode = COALESCE(?10, barcode),
            updated_at = ?11
        WHERE id = ?1 AND shop_id = ?2
        "#,
    )
    .bind(id)
    .bind(shop_id)
    .bind(patch.name.as_deref().map(str::trim))
    .bind(&patch.category)
    .bind(&patch.description)
    .bind(patch.price_cents)
    .bind(patch.cost_price_cents)
    .bind(patch.stock)
    .bind(&patch.sku)
    .bind(&patch.barcode)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use chrono::Duration;

    #[tokio::test]
    async fn test_create_get_list() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;

        let first = test_support::product(&db, &shop.id, "Rice 5kg", 45_000, 10).await;
        let second = test_support::product(&db, &shop.id, "Dal 1kg", 12_000, 3).await;

        let loaded = db.products().get(&shop.id, &first.id).await.unwrap();
        assert_eq!(loaded.name, "Rice 5kg");
        assert_eq!(loaded.price_cents, 45_000);

        let listed = db.products().list(&shop.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|p| p.id == second.id));
    }

    #[tokio::test]
    async fn test_other_shop_cannot_see_product() {
        let db = test_support::database().await;
        let mine = test_support::shop(&db, "mine@example.com", false).await;
        let theirs = test_support::shop(&db, "theirs@example.com", false).await;
        let product = test_support::product(&db, &mine.id, "Rice", 1000, 5).await;

        let err = db.products().get(&theirs.id, &product.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = db.products().delete(&theirs.id, &product.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(db.products().list(&theirs.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;

        let bad = NewProduct {
            name: "  ".to_string(),
            ..Default::default()
        };
        let err = db.products().create(&shop.id, &bad, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let product = test_support::product(&db, &shop.id, "Rice", 1000, 5).await;

        let patch = ProductPatch {
            price_cents: Some(1250),
            ..Default::default()
        };
        let updated = db.products().update(&shop.id, &product.id, &patch, Utc::now()).await.unwrap();
        assert_eq!(updated.price_cents, 1250);
        assert_eq!(updated.name, "Rice");
        assert_eq!(updated.stock, 5);

        let err = db
            .products()
            .update(&shop.id, "missing", &patch, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_bulk_create_is_all_or_nothing() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;

        let rows = vec![
            NewProduct {
                name: "Soap".to_string(),
                price_cents: 300,
                stock: 20,
                ..Default::default()
            },
            NewProduct {
                name: "Shampoo".to_string(),
                price_cents: 900,
                stock: -1,
                ..Default::default()
            },
        ];
        assert!(db.products().bulk_create(&shop.id, &rows, None, &Utc::now()).await.is_err());
        assert!(db.products().list(&shop.id).await.unwrap().is_empty());

        assert!(db.products().bulk_create(&shop.id, &[], None, &Utc::now()).await.is_err());

        let created = db.products().bulk_create(&shop.id, &rows[..1], None, &Utc::now()).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(db.products().list(&shop.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_create_respects_demo_quota() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "demo@example.com", true).await;
        test_support::product(&db, &shop.id, "Rice", 1000, 5).await;

        let rows: Vec<NewProduct> = ["Soap", "Salt", "Tea"]
            .iter()
            .map(|name| NewProduct {
                name: name.to_string(),
                price_cents: 100,
                ..Default::default()
            })
            .collect();

        // one already today, limit 3: a batch of three would make four
        let err = db
            .products()
            .bulk_create(&shop.id, &rows, Some(3), &Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::DemoLimitExceeded { limit: 3, .. })
        ));
        assert_eq!(db.products().list(&shop.id).await.unwrap().len(), 1);

        let created = db
            .products()
            .bulk_create(&shop.id, &rows[..2], Some(3), &Utc::now())
            .await
            .unwrap();
        assert_eq!(created.len(), 2);

        // no limit for exempt callers or regular shops
        db.products().bulk_create(&shop.id, &rows, None, &Utc::now()).await.unwrap();
        let regular = test_support::shop(&db, "owner@example.com", false).await;
        db.products()
            .bulk_create(&regular.id, &rows, Some(1), &Utc::now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_bulk_update_skips_missing_ids() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let other = test_support::shop(&db, "other@example.com", false).await;
        let product = test_support::product(&db, &shop.id, "Rice", 1000, 5).await;
        let foreign = test_support::product(&db, &other.id, "Rice", 1000, 5).await;

        let rows = vec![
            ProductQuickEdit {
                id: Some(product.id.clone()),
                changes: ProductPatch {
                    stock: Some(40),
                    ..Default::default()
                },
            },
            ProductQuickEdit {
                id: None,
                changes: ProductPatch {
                    stock: Some(1),
                    ..Default::default()
                },
            },
            ProductQuickEdit {
                id: Some(foreign.id.clone()),
                changes: ProductPatch {
                    stock: Some(0),
                    ..Default::default()
                },
            },
        ];

        let updated = db.products().bulk_update(&shop.id, &rows, Utc::now()).await.unwrap();
        assert_eq!(updated, 1);
        assert_eq!(db.products().get(&shop.id, &product.id).await.unwrap().stock, 40);
        assert_eq!(db.products().get(&other.id, &foreign.id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_count_created_since() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", true).await;
        let now = Utc::now();

        let old = NewProduct {
            name: "Old".to_string(),
            ..Default::default()
        };
        db.products().create(&shop.id, &old, now - Duration::days(2)).await.unwrap();
        test_support::product(&db, &shop.id, "New", 100, 1).await;

        let today = db
            .products()
            .count_created_since(&shop.id, now - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(today, 1);
    }
}
