//! # Supplier Repository
//!
//! Database operations for suppliers. Deleting a supplier keeps its purchase
//! orders; they lose the supplier reference.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use tillbook_core::catalog::{NewSupplier, SupplierPatch};
use tillbook_core::Supplier;

macro_rules! supplier_columns {
    () => {
        "id, shop_id, name, contact_person, phone, email, address, created_at, updated_at"
    };
}

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Lists the shop's suppliers by name.
    pub async fn list(&self, shop_id: &str) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(concat!(
            "SELECT ",
            supplier_columns!(),
            " FROM suppliers WHERE shop_id = ?1 ORDER BY name COLLATE NOCASE ASC"
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(shop_id = %shop_id, count = suppliers.len(), "Listed suppliers");
        Ok(suppliers)
    }

    pub async fn get(&self, shop_id: &str, id: &str) -> DbResult<Supplier> {
        let mut conn = self.pool.acquire().await?;
        find_supplier(&mut conn, shop_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn create(&self, shop_id: &str, new: &NewSupplier, now: DateTime<Utc>) -> DbResult<Supplier> {
        new.validate()?;

        let supplier = Supplier {
            id: new_id(),
            shop_id: shop_id.to_string(),
            name: new.name.trim().to_string(),
            contact_person: new.contact_person.clone(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            address: new.address.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(concat!(
            "INSERT INTO suppliers (",
            supplier_columns!(),
            ") VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ))
        .bind(&supplier.id)
        .bind(&supplier.shop_id)
        .bind(&supplier.name)
        .bind(&supplier.contact_person)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await?;

        info!(shop_id = %shop_id, supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    /// Applies a partial update. Absent fields keep their value.
    pub async fn update(
        &self,
        shop_id: &str,
        id: &str,
        patch: &SupplierPatch,
        now: DateTime<Utc>,
    ) -> DbResult<Supplier> {
        patch.validate()?;

        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE suppliers SET
                name = COALESCE(?3, name),
                contact_person = COALESCE(?4, contact_person),
                phone = COALESCE(?5, phone),
                email = COALESCE(?6, email),
                address = COALESCE(?7, address),
                updated_at = ?8
            WHERE id = ?1 AND shop_id = ?2
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .bind(patch.name.as_deref().map(str::trim))
        .bind(&patch.contact_person)
        .bind(&patch.phone)
        .bind(&patch.email)
        .bind(&patch.address)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        debug!(shop_id = %shop_id, supplier_id = %id, "Supplier updated");
        find_supplier(&mut conn, shop_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn delete(&self, shop_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1 AND shop_id = ?2")
            .bind(id)
            .bind(shop_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        info!(shop_id = %shop_id, supplier_id = %id, "Supplier deleted");
        Ok(())
    }
}

/// Loads a supplier on an existing connection or transaction.
pub(crate) async fn find_supplier(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Supplier>> {
    let supplier = sqlx::query_as::<_, Supplier>(concat!(
        "SELECT ",
        supplier_columns!(),
        " FROM suppliers WHERE id = ?1 AND shop_id = ?2"
    ))
    .bind(id)
    .bind(shop_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(supplier)
}

/// All suppliers of a shop, for joining onto purchase-order listings.
pub(crate) async fn list_for_shop(conn: &mut SqliteConnection, shop_id: &str) -> DbResult<Vec<Supplier>> {
    let suppliers = sqlx::query_as::<_, Supplier>(concat!(
        "SELECT ",
        supplier_columns!(),
        " FROM suppliers WHERE shop_id = ?1"
    ))
    .bind(shop_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(suppliers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use tillbook_core::CoreError;

    fn supplier(name: &str) -> NewSupplier {
        NewSupplier {
            name: name.to_string(),
            phone: Some("022-555-0100".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_list_by_name() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;

        db.suppliers().create(&shop.id, &supplier("Zenith Foods"), Utc::now()).await.unwrap();
        db.suppliers().create(&shop.id, &supplier("acme wholesale"), Utc::now()).await.unwrap();

        let names: Vec<_> = db
            .suppliers()
            .list(&shop.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["acme wholesale", "Zenith Foods"]);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;

        let err = db.suppliers().create(&shop.id, &supplier("   "), Utc::now()).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let created = db.suppliers().create(&shop.id, &supplier("Acme"), Utc::now()).await.unwrap();

        let patch = SupplierPatch {
            contact_person: Some("Meera".to_string()),
            ..Default::default()
        };
        let updated = db.suppliers().update(&shop.id, &created.id, &patch, Utc::now()).await.unwrap();
        assert_eq!(updated.name, "Acme");
        assert_eq!(updated.contact_person.as_deref(), Some("Meera"));
        assert_eq!(updated.phone.as_deref(), Some("022-555-0100"));

        db.suppliers().delete(&shop.id, &created.id).await.unwrap();
        let err = db.suppliers().delete(&shop.id, &created.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        let err = db.suppliers().update(&shop.id, &created.id, &patch, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_scoped_to_shop() {
        let db = test_support::database().await;
        let shop = test_support::shop(&db, "owner@example.com", false).await;
        let other = test_support::shop(&db, "other@example.com", false).await;
        let created = db.suppliers().create(&shop.id, &supplier("Acme"), Utc::now()).await.unwrap();

        assert!(db.suppliers().list(&other.id).await.unwrap().is_empty());
        let err = db.suppliers().get(&other.id, &created.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        let err = db.suppliers().delete(&other.id, &created.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
