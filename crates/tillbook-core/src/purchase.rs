//! # Purchase Module
//!
//! Procurement rules: building a purchase order from requested lines and
//! guarding its one-way lifecycle.
//!
//! ```text
//!             create                receive (stock += qty)
//!   request ─────────► PENDING ───────────────────────────► RECEIVED
//!                         │
//!                         │ cancel
//!                         ▼
//!                     CANCELLED
//! ```
//!
//! RECEIVED and CANCELLED are terminal. The database layer flips the status
//! with a conditional update on `status = 'PENDING'`, so the checks here are
//! the friendly error path and the SQL is the guarantee.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PurchaseOrder, PurchaseOrderStatus};
use crate::validation::{validate_line_count, validate_non_negative, validate_quantity, ValidationResult};

// =============================================================================
// Request Model
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseLine {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub unit_cost_cents: i64,
}

impl PurchaseLine {
    /// quantity × unit cost.
    pub fn total_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents).multiply_quantity(self.quantity)
    }
}

/// Body of `POST /purchases`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewPurchaseOrder {
    pub supplier_id: String,
    pub items: Vec<PurchaseLine>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewPurchaseOrder {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.supplier_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "supplierId".to_string(),
            });
        }
        validate_line_count(self.items.len())?;
        for line in &self.items {
            if line.product_id.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "productId".to_string(),
                });
            }
            validate_quantity(line.quantity)?;
            validate_non_negative("unitCost", line.unit_cost_cents)?;
        }
        Ok(())
    }

    /// Σ line total costs.
    pub fn total(&self) -> Money {
        self.items.iter().map(PurchaseLine::total_cost).sum()
    }
}

// =============================================================================
// Lifecycle Guards
// =============================================================================

/// Checks that a purchase order can still be received.
pub fn ensure_receivable(order: &PurchaseOrder) -> CoreResult<()> {
    ensure_pending(order)
}

/// Checks that a purchase order can still be cancelled.
pub fn ensure_cancellable(order: &PurchaseOrder) -> CoreResult<()> {
    ensure_pending(order)
}

fn ensure_pending(order: &PurchaseOrder) -> CoreResult<()> {
    match order.status {
        PurchaseOrderStatus::Pending => Ok(()),
        other => Err(CoreError::InvalidPurchaseOrderStatus {
            po_number: order.po_number.clone(),
            current_status: other.as_str().to_string(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
