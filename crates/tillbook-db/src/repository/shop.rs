//! # Shop Repository
//!
//! The tenant root: sign-up, settings, data resets and account deletion.
//!
//! ## Reset Scopes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  scope   │ invoices │ payments │ POs │ products │ customers │ suppliers │
//! │──────────┼──────────┼──────────┼─────┼──────────┼───────────┼───────────│
//! │  sales   │    ✗     │    ✗     │     │          │           │           │
//! │  all     │    ✗     │    ✗     │  ✗  │    ✗     │     ✗     │     ✗     │
//! │  account │  everything above, then users and the shop row itself         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every scope runs in one transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, new_id};
use tillbook_core::tenant::{ResetScope, ShopRegistration, ShopSettingsPatch};
use tillbook_core::{CoreError, Role, Shop, User, ValidationError, DEFAULT_DEAD_STOCK_DAYS};

macro_rules! shop_columns {
    () => {
        "id, name, owner_name, email, phone, country, currency, currency_symbol, timezone, \
         tax_rate_bps, tax_inclusive, address, logo_url, receipt_footer, dead_stock_days, \
         is_demo, plan, created_at, updated_at"
    };
}

/// Plan recorded for every new sign-up.
const DEFAULT_PLAN: &str = "FREE";

/// Repository for shops (tenants).
#[derive(Debug, Clone)]
pub struct ShopRepository {
    pool: SqlitePool,
}

impl ShopRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShopRepository { pool }
    }

    /// Creates a shop and its OWNER user in one transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain(Validation(Duplicate)))` - email already registered
    pub async fn register(
        &self,
        registration: &ShopRegistration,
        password_hash: &str,
        is_demo: bool,
        now: DateTime<Utc>,
    ) -> DbResult<(Shop, User)> {
        registration.validate()?;
        let email = registration.normalized_email();

        debug!(email = %email, is_demo, "Registering shop");

        let mut tx = begin_write(&self.pool).await?;

        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
            .bind(&email)
            .fetch_one(&mut *tx)
            .await?;
        if taken > 0 {
            return Err(email_taken(&email));
        }

        let shop = Shop {
            id: new_id(),
            name: registration.shop_name.trim().to_string(),
            owner_name: registration.owner_name.trim().to_string(),
            email: email.clone(),
            phone: registration.phone.clone(),
            country: registration.country.trim().to_string(),
            currency: registration.currency(),
            currency_symbol: registration.currency_symbol(),
            timezone: "UTC".to_string(),
            tax_rate_bps: 0,
            tax_inclusive: false,
            address: None,
            logo_url: None,
            receipt_footer: None,
            dead_stock_days: DEFAULT_DEAD_STOCK_DAYS,
            is_demo,
            plan: DEFAULT_PLAN.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(concat!("INSERT INTO shops (", shop_columns!(), ") VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"))
            .bind(&shop.id)
            .bind(&shop.name)
            .bind(&shop.owner_name)
            .bind(&shop.email)
            .bind(&shop.phone)
            .bind(&shop.country)
            .bind(&shop.currency)
            .bind(&shop.currency_symbol)
            .bind(&shop.timezone)
            .bind(shop.tax_rate_bps)
            .bind(shop.tax_inclusive)
            .bind(&shop.address)
            .bind(&shop.logo_url)
            .bind(&shop.receipt_footer)
            .bind(shop.dead_stock_days)
            .bind(shop.is_demo)
            .bind(&shop.plan)
            .bind(shop.created_at)
            .bind(shop.updated_at)
            .execute(&mut *tx)
            .await?;

        let owner = User {
            id: new_id(),
            shop_id: shop.id.clone(),
            name: shop.owner_name.clone(),
            email,
            password_hash: password_hash.to_string(),
            role: Role::Owner,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, shop_id, name, email, password_hash, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&owner.id)
        .bind(&owner.shop_id)
        .bind(&owner.name)
        .bind(&owner.email)
        .bind(&owner.password_hash)
        .bind(owner.role.as_str())
        .bind(owner.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_violation_on("users.email") => email_taken(&owner.email),
            err => err,
        })?;

        tx.commit().await?;

        info!(shop_id = %shop.id, "Shop registered");
        Ok((shop, owner))
    }

    /// Gets the caller's shop.
    pub async fn get(&self, shop_id: &str) -> DbResult<Shop> {
        let mut conn = self.pool.acquire().await?;
        fetch_shop(&mut conn, shop_id).await
    }

    /// Applies a settings patch. `is_demo`, `plan` and `email` are not
    /// reachable from here.
    pub async fn update_settings(
        &self,
        shop_id: &str,
        patch: &ShopSettingsPatch,
        now: DateTime<Utc>,
    ) -> DbResult<Shop> {
        patch.validate()?;

        debug!(shop_id = %shop_id, "Updating shop settings");

        let result = sqlx::query(
            r#"
            UPDATE shops SET
                name = COALESCE(?2, name),
                owner_name = COALESCE(?3, owner_name),
                phone = COALESCE(?4, phone),
                country = COALESCE(?5, country),
                currency = COALESCE(?6, currency),
                currency_symbol = COALESCE(?7, currency_symbol),
                timezone = COALESCE(?8, timezone),
                tax_rate_bps = COALESCE(?9, tax_rate_bps),
                tax_inclusive = COALESCE(?10, tax_inclusive),
                address = COALESCE(?11, address),
                logo_url = COALESCE(?12, logo_url),
                receipt_footer = COALESCE(?13, receipt_footer),
                dead_stock_days = COALESCE(?14, dead_stock_days),
                updated_at = ?15
            WHERE id = ?1
            "#,
        )
        .bind(shop_id)
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.owner_name.as_deref().map(str::trim))
        .bind(&patch.phone)
        .bind(&patch.country)
        .bind(&patch.currency)
        .bind(&patch.currency_symbol)
        .bind(&patch.timezone)
        .bind(patch.tax_rate_bps)
        .bind(patch.tax_inclusive)
        .bind(&patch.address)
        .bind(&patch.logo_url)
        .bind(&patch.receipt_footer)
        .bind(patch.dead_stock_days)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ShopNotFound(shop_id.to_string()).into());
        }

        info!(shop_id = %shop_id, "Shop settings updated");
        self.get(shop_id).await
    }

    /// Wipes the shop's data for the given scope in one transaction.
    pub async fn reset(&self, shop_id: &str, scope: ResetScope) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;
        fetch_shop(&mut tx, shop_id).await?;
        wipe(&mut tx, shop_id, scope).await?;
        tx.commit().await?;

        info!(shop_id = %shop_id, ?scope, "Shop data reset");
        Ok(())
    }

    /// Deletes every row owned by the shop, its users and the shop itself.
    pub async fn delete_account(&self, shop_id: &str) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        wipe(&mut tx, shop_id, ResetScope::All).await?;
        sqlx::query("DELETE FROM users WHERE shop_id = ?1")
            .bind(shop_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM shops WHERE id = ?1")
            .bind(shop_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ShopNotFound(shop_id.to_string()).into());
        }

        tx.commit().await?;

        info!(shop_id = %shop_id, "Shop account deleted");
        Ok(())
    }
}

fn email_taken(email: &str) -> DbError {
    ValidationError::Duplicate {
        field: "email".to_string(),
        value: email.to_string(),
    }
    .into()
}

/// Loads a shop on an existing connection or transaction.
pub(crate) async fn fetch_shop(conn: &mut SqliteConnection, shop_id: &str) -> DbResult<Shop> {
    sqlx::query_as::<_, Shop>(concat!("SELECT ", shop_columns!(), " FROM shops WHERE id = ?1"))
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::ShopNotFound(shop_id.to_string()).into())
}

/// Deletes shop-owned rows, children before parents.
async fn wipe(conn: &mut SqliteConnection, shop_id: &str, scope: ResetScope) -> DbResult<()> {
    let sales: &[&str] = &[
        "DELETE FROM payments WHERE shop_id = ?1",
        "DELETE FROM invoice_items WHERE invoice_id IN (SELECT id FROM invoices WHERE shop_id = ?1)",
        "DELETE FROM invoices WHERE shop_id = ?1",
    ];
    let catalog: &[&str] = &[
        "DELETE FROM purchase_order_items WHERE purchase_order_id IN (SELECT id FROM purchase_orders WHERE shop_id = ?1)",
        "DELETE FROM purchase_orders WHERE shop_id = ?1",
        "DELETE FROM products WHERE shop_id = ?1",
        "DELETE FROM customers WHERE shop_id = ?1",
        "DELETE FROM suppliers WHERE shop_id = ?1",
    ];

    let statements = match scope {
        ResetScope::Sales => sales.to_vec(),
        ResetScope::All => sales.iter().chain(catalog).copied().collect(),
    };

    for statement in statements {
        let result = sqlx::query(statement).bind(shop_id).execute(&mut *conn).await?;
        debug!(shop_id = %shop_id, rows = result.rows_affected(), statement, "Wiped rows");
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use tillbook_core::checkout::{CheckoutLine, CheckoutRequest};

    async fn count(db: &crate::Database, table: &str, shop_id: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE shop_id = ?1"))
            .bind(shop_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_creates_shop_and_owner() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "Asha@Example.com", true).await;

        assert_eq!(shop.email, "asha@example.com");
        assert_eq!(shop.currency, "INR");
        assert_eq!(shop.dead_stock_days, DEFAULT_DEAD_STOCK_DAYS);
        assert!(shop.is_demo);

        let owner = db.users().find_by_email("asha@example.com").await.unwrap().unwrap();
        assert_eq!(owner.shop_id, shop.id);
        assert_eq!(owner.role, Role::Owner);

        let loaded = db.shops().get(&shop.id).await.unwrap();
        assert_eq!(loaded.name, "Corner Store");
    }

    #[tokio::test]
    async fn test_register_rejects_existing_email() {
        let db = test_support::database().await;
        test_support::shop(&db, "owner@example.com", false).await;

        let registration = ShopRegistration {
            shop_name: "Second".to_string(),
            owner_name: "Ravi".to_string(),
            email: "OWNER@example.com".to_string(),
            password: "secret99".to_string(),
            country: "IN".to_string(),
            ..Default::default()
        };
        let err = db
            .shops()
            .register(&registration, "hash", false, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
        let shops: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shops")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(shops, 1);
    }

    #[tokio::test]
    async fn test_update_settings_keeps_absent_fields() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", true).await;

        let patch = ShopSettingsPatch {
            tax_rate_bps: Some(1800),
            tax_inclusive: Some(true),
            dead_stock_days: Some(45),
            ..Default::default()
        };
        let updated = db.shops().update_settings(&shop.id, &patch, Utc::now()).await.unwrap();

        assert_eq!(updated.tax_rate_bps, 1800);
        assert!(updated.tax_inclusive);
        assert_eq!(updated.dead_stock_days, 45);
        assert_eq!(updated.name, shop.name);
        assert_eq!(updated.currency, shop.currency);
        assert!(updated.is_demo);
    }

    #[tokio::test]
    async fn test_update_settings_rejects_invalid_tax() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", true).await;

        let patch = ShopSettingsPatch {
            tax_rate_bps: Some(10_001),
            ..Default::default()
        };
        let err = db.shops().update_settings(&shop.id, &patch, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reset_scopes() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let product = test_support::product(&db, &shop.id, "Rice", 1000, 10).await;

        let request = CheckoutRequest {
            customer_name: Some("Walk-in".to_string()),
            customer_phone: None,
            items: vec![CheckoutLine {
                product_id: product.id.clone(),
                quantity: 1,
            }],
            discount_cents: 0,
            payment_mode: "CASH".to_string(),
            payment_amount_cents: 1000,
            status: None,
        };
        db.invoices().checkout(&shop.id, &request, None, &Utc::now()).await.unwrap();

        db.shops().reset(&shop.id, ResetScope::Sales).await.unwrap();
        assert_eq!(count(&db, "invoices", &shop.id).await, 0);
        assert_eq!(count(&db, "payments", &shop.id).await, 0);
        assert_eq!(count(&db, "products", &shop.id).await, 1);
        assert_eq!(count(&db, "customers", &shop.id).await, 1);

        db.shops().reset(&shop.id, ResetScope::All).await.unwrap();
        assert_eq!(count(&db, "products", &shop.id).await, 0);
        assert_eq!(count(&db, "customers", &shop.id).await, 0);
        assert!(db.shops().get(&shop.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_account_leaves_other_shops() {
        let db = test_support::database().await;
        let doomed = test_support::shop(&db, "gone@example.com", false).await;
        let other = test_support::shop(&db, "stays@example.com", false).await;
        test_support::product(&db, &doomed.id, "Rice", 1000, 10).await;
        test_support::product(&db, &other.id, "Rice", 1000, 10).await;

        db.shops().delete_account(&doomed.id).await.unwrap();

        assert!(db.shops().get(&doomed.id).await.is_err());
        assert!(db.users().find_by_email("gone@example.com").await.unwrap().is_none());
        assert_eq!(count(&db, "products", &other.id).await, 1);

        let err = db.shops().delete_account(&doomed.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ShopNotFound(_))));
    }
}
