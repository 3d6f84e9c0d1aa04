//! # User Repository
//!
//! Login lookups. Users are created together with their shop in
//! [`ShopRepository::register`](crate::repository::shop::ShopRepository::register).

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tillbook_core::tenant::normalize_email;
use tillbook_core::User;

macro_rules! user_columns {
    () => {
        "id, shop_id, name, email, password_hash, role, created_at"
    };
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Finds a user by login email. Matching is case-insensitive.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let email = normalize_email(email);
        debug!(email = %email, "Looking up user");

        let user = sqlx::query_as::<_, User>(concat!("SELECT ", user_columns!(), " FROM users WHERE email = ?1"))
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by id.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!("SELECT ", user_columns!(), " FROM users WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}
