//! # Catalog Inputs
//!
//! Request models for products and suppliers, with their validation.
//! Bulk import takes already-parsed rows; no CSV handling lives here.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::validation::{
    validate_non_negative, validate_price_cents, validate_product_name, validate_required,
    validate_sku, ValidationResult,
};

// =============================================================================
// Products
// =============================================================================

/// Body of `POST /products` and one row of `POST /products/bulk`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price_cents: i64,
    #[serde(default)]
    pub cost_price_cents: i64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
}

impl NewProduct {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_product_name(&self.name)?;
        validate_price_cents(self.price_cents)?;
        validate_non_negative("costPrice", self.cost_price_cents)?;
        validate_non_negative("stock", self.stock)?;
        if let Some(sku) = &self.sku {
            validate_sku(sku)?;
        }
        Ok(())
    }
}

/// Partial update of a product. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub cost_price_cents: Option<i64>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
}

impl ProductPatch {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_product_name(name)?;
        }
        if let Some(price) = self.price_cents {
            validate_price_cents(price)?;
        }
        if let Some(cost) = self.cost_price_cents {
            validate_non_negative("costPrice", cost)?;
        }
        if let Some(stock) = self.stock {
            validate_non_negative("stock", stock)?;
        }
        if let Some(sku) = &self.sku {
            validate_sku(sku)?;
        }
        Ok(())
    }
}

/// One row of `PUT /products/bulk`: an id plus the fields to change.
/// Rows without an id are skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductQuickEdit {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub changes: ProductPatch,
}

// =============================================================================
// Suppliers
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSupplier {
    pub name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewSupplier {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("name", &self.name, 200)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SupplierPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl SupplierPatch {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_required("name", name, 200)?;
        }
        Ok(())
    }
}
