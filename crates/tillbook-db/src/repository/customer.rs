//! # Customers
//!
//! Customers are created implicitly at checkout and read back with their
//! invoices. Both helpers run on the caller's connection so they can join
//! the checkout transaction.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::new_id;
use tillbook_core::Customer;

macro_rules! customer_columns {
    () => {
        "id, shop_id, name, phone, email, address, created_at"
    };
}

/// Finds the shop's customer with this phone, or creates one.
///
/// Without a phone there is nothing to match on, so a new customer row
/// is created every time.
pub(crate) async fn find_or_create(
    conn: &mut SqliteConnection,
    shop_id: &str,
    name: &str,
    phone: Option<&str>,
    now: DateTime<Utc>,
) -> DbResult<Customer> {
    if let Some(phone) = phone {
        let existing = sqlx::query_as::<_, Customer>(concat!(
            "SELECT ",
            customer_columns!(),
            " FROM customers WHERE shop_id = ?1 AND phone = ?2 ORDER BY created_at LIMIT 1"
        ))
        .bind(shop_id)
        .bind(phone)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(customer) = existing {
            debug!(customer_id = %customer.id, "Matched existing customer by phone");
            return Ok(customer);
        }
    }

    let customer = Customer {
        id: new_id(),
        shop_id: shop_id.to_string(),
        name: name.to_string(),
        phone: phone.map(str::to_string),
        email: None,
        address: None,
        created_at: now,
    };

    sqlx::query(concat!(
        "INSERT INTO customers (",
        customer_columns!(),
        ") VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
    ))
    .bind(&customer.id)
    .bind(&customer.shop_id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.email)
    .bind(&customer.address)
    .bind(customer.created_at)
    .execute(&mut *conn)
    .await?;

    debug!(customer_id = %customer.id, "Created customer");
    Ok(customer)
}

/// Every customer of the shop, for joining onto invoice lists.
pub(crate) async fn list_for_shop(conn: &mut SqliteConnection, shop_id: &str) -> DbResult<Vec<Customer>> {
    let customers = sqlx::query_as::<_, Customer>(concat!(
        "SELECT ",
        customer_columns!(),
        " FROM customers WHERE shop_id = ?1"
    ))
    .bind(shop_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(customers)
}

pub(crate) async fn find(conn: &mut SqliteConnection, shop_id: &str, id: &str) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(concat!(
        "SELECT ",
        customer_columns!(),
        " FROM customers WHERE id = ?1 AND shop_id = ?2"
    ))
    .bind(id)
    .bind(shop_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(customer)
}
