//! HTTP handlers.
//!
//! One module per resource. Handlers stay thin: extract the caller's
//! [`AuthContext`](crate::auth::AuthContext), call a repository and map the result.

pub mod auth;
pub mod health;
pub mod invoices;
pub mod products;
pub mod purchases;
pub mod reports;
pub mod settings;
pub mod suppliers;

use serde::Serialize;

/// `{message}` body for operations with nothing else to return.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        MessageResponse { message }
    }
}
