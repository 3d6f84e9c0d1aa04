//! # Tenant Inputs
//!
//! Sign-up, shop settings and data-reset request models.
//!
//! ## Shop Lifecycle
//! ```text
//!   ShopRegistration ──► Shop + OWNER user (one transaction)
//!          │
//!          ▼
//!   ShopSettingsPatch ──► profile / currency / tax / receipt / dead stock
//!          │
//!          ▼
//!   ResetScope::Sales ──► invoices, items, payments wiped
//!   ResetScope::All   ──► + purchase orders, products, customers, suppliers
//!          │
//!          ▼
//!   account deletion  ──► everything, users and the shop itself
//! ```
//!
//! `is_demo`, `plan` and the login email are never writable through
//! settings.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::{
    validate_dead_stock_days, validate_email, validate_password, validate_required,
    validate_tax_rate_bps, ValidationResult,
};

// =============================================================================
// Registration
// =============================================================================

/// Body of `POST /auth/signup`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShopRegistration {
    pub shop_name: String,
    pub owner_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub country: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub currency_symbol: Option<String>,
}

impl ShopRegistration {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("shopName", &self.shop_name, 200)?;
        validate_required("ownerName", &self.owner_name, 200)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        validate_required("country", &self.country, 100)?;
        Ok(())
    }

    /// Emails are matched case-insensitively.
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn currency(&self) -> String {
        non_blank(self.currency.as_deref()).unwrap_or("USD").to_string()
    }

    pub fn currency_symbol(&self) -> String {
        non_blank(self.currency_symbol.as_deref()).unwrap_or("$").to_string()
    }
}

/// Lower-cases and trims an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Settings
// =============================================================================

/// Body of `PUT /settings`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShopSettingsPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub currency_symbol: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub tax_rate_bps: Option<i64>,
    #[serde(default)]
    pub tax_inclusive: Option<bool>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub receipt_footer: Option<String>,
    #[serde(default)]
    pub dead_stock_days: Option<i64>,
}

impl ShopSettingsPatch {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_required("name", name, 200)?;
        }
        if let Some(owner) = &self.owner_name {
            validate_required("ownerName", owner, 200)?;
        }
        if let Some(currency) = &self.currency {
            validate_required("currency", currency, 10)?;
        }
        if let Some(symbol) = &self.currency_symbol {
            validate_required("currencySymbol", symbol, 10)?;
        }
        if let Some(bps) = self.tax_rate_bps {
            validate_tax_rate_bps(bps)?;
        }
        if let Some(days) = self.dead_stock_days {
            validate_dead_stock_days(days)?;
        }
        Ok(())
    }
}

// =============================================================================
// Reset
// =============================================================================

/// What `POST /settings/reset` wipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ResetScope {
    /// Invoices, invoice items and payments.
    Sales,
    /// Sales plus purchase orders, products, customers and suppliers.
    All,
}

impl ResetScope {
    /// Parses the `type` field of a reset request.
    pub fn parse(raw: &str) -> ValidationResult<Self> {
        match raw.trim() {
            "sales" => Ok(ResetScope::Sales),
            "all" => Ok(ResetScope::All),
            _ => Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec!["sales".to_string(), "all".to_string()],
            }),
        }
    }

    /// Message returned to the client after a successful reset.
    pub fn completion_message(&self) -> &'static str {
        match self {
            ResetScope::Sales => "Sales data reset complete",
            ResetScope::All => "Factory reset complete",
        }
    }
}
