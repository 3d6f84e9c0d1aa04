//! # Checkout Module
//!
//! Pure rules of the invoice-creation transaction. The database layer
//! performs the I/O (product lookup, stock decrement, inserts); everything
//! that can be decided without I/O is decided here.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Transaction                            │
//! │                                                                         │
//! │  CheckoutRequest ──► validate() ──► requested_status()                 │
//! │                                            │                            │
//! │                      ┌─────────────────────┴───────────────┐            │
//! │                      ▼                                     ▼            │
//! │              HELD / QUOTATION                        sale path          │
//! │              (no stock, no payment)      (demo quota, stock check,     │
//! │                      │                    decrement, payment IN)       │
//! │                      └─────────────────────┬───────────────┘            │
//! │                                            ▼                            │
//! │              summarize(line totals, discount, paid, status)             │
//! │                                            │                            │
//! │                                            ▼                            │
//! │               document_number(INV | QTN, now, attempt)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Client-supplied prices are never read; unknown JSON fields on a line
//! (such as `price`) are ignored during deserialization.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::InvoiceStatus;
use crate::validation::{validate_line_count, validate_non_negative, validate_quantity, ValidationResult};

/// How many successive suffixes are tried before giving up on a number.
pub const MAX_NUMBER_ATTEMPTS: u32 = 25;

// =============================================================================
// Request Model
// =============================================================================

/// One cart line: which product and how many.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutLine {
    pub product_id: String,
    pub quantity: i64,
}

/// Body of `POST /invoices`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub items: Vec<CheckoutLine>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default = "default_payment_mode")]
    pub payment_mode: String,
    #[serde(default)]
    pub payment_amount_cents: i64,
    /// Only `HELD` or `QUOTATION` may be given explicitly.
    #[serde(default)]
    pub status: Option<String>,
}

fn default_payment_mode() -> String {
    "CASH".to_string()
}

impl CheckoutRequest {
    /// Validates the request shape before any I/O happens.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_line_count(self.items.len())?;
        for line in &self.items {
            if line.product_id.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "productId".to_string(),
                });
            }
            validate_quantity(line.quantity)?;
        }
        validate_non_negative("discount", self.discount_cents)?;
        validate_non_negative("paymentAmount", self.payment_amount_cents)?;
        if self.payment_mode.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "paymentMode".to_string(),
            });
        }
        self.requested_status()?;
        Ok(())
    }

    /// Parses the explicit status override.
    ///
    /// Absent, empty or `null` means "derive from payment". Anything other
    /// than `HELD` or `QUOTATION` is rejected.
    pub fn requested_status(&self) -> ValidationResult<Option<InvoiceStatus>> {
        let raw = match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("null") => return Ok(None),
            Some(raw) => raw,
        };

        match raw.to_ascii_uppercase().as_str() {
            "HELD" => Ok(Some(InvoiceStatus::Held)),
            "QUOTATION" => Ok(Some(InvoiceStatus::Quotation)),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["HELD".to_string(), "QUOTATION".to_string()],
            }),
        }
    }

    /// True unless the request parks a cart or issues a quotation.
    pub fn is_sale(&self) -> bool {
        !matches!(self.requested_status(), Ok(Some(_)))
    }

    /// Customer name, if one was meaningfully supplied.
    pub fn customer_name(&self) -> Option<&str> {
        non_blank(self.customer_name.as_deref())
    }

    /// Customer phone, if one was meaningfully supplied.
    pub fn customer_phone(&self) -> Option<&str> {
        non_blank(self.customer_phone.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Status & Totals
// =============================================================================

/// Derives the status of a sale from what was paid against what is owed.
///
/// ```text
/// paid ≥ final      → PAID
/// 0 < paid < final  → PARTIAL
/// paid = 0          → DUE
/// ```
///
/// A zero or negative final amount with nothing paid counts as PAID, since
/// `paid ≥ final` is checked first.
pub fn derive_status(final_amount: Money, paid: Money) -> InvoiceStatus {
    if paid >= final_amount {
        InvoiceStatus::Paid
    } else if paid.is_positive() {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Due
    }
}

/// Figures computed once every line has been priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSummary {
    /// Σ line totals before discount.
    pub subtotal: Money,
    /// subtotal − discount. Not clamped.
    pub final_amount: Money,
    pub status: InvoiceStatus,
}

impl CheckoutSummary {
    /// Whether a payment row should be written for this checkout.
    pub fn records_payment(&self, paid: Money) -> bool {
        self.status.is_sale() && paid.is_positive()
    }
}

/// Combines priced lines with discount, payment and the status override.
pub fn summarize(
    line_totals: impl IntoIterator<Item = Money>,
    discount: Money,
    paid: Money,
    requested: Option<InvoiceStatus>,
) -> CheckoutSummary {
    let subtotal: Money = line_totals.into_iter().sum();
    let final_amount = subtotal - discount;
    let status = requested.unwrap_or_else(|| derive_status(final_amount, paid));

    CheckoutSummary {
        subtotal,
        final_amount,
        status,
    }
}

// =============================================================================
// Document Numbers
// =============================================================================

/// Kinds of numbered documents a shop issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Invoice,
    Quotation,
    PurchaseOrder,
}

impl DocumentKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "INV",
            DocumentKind::Quotation => "QTN",
            DocumentKind::PurchaseOrder => "PO",
        }
    }

    /// Invoice numbers use QTN for quotations and INV otherwise.
    pub fn for_invoice(status: InvoiceStatus) -> Self {
        if status == InvoiceStatus::Quotation {
            DocumentKind::Quotation
        } else {
            DocumentKind::Invoice
        }
    }
}

/// Builds `PREFIX-NNNNNN` from the last six digits of the epoch millis.
///
/// `attempt` advances the suffix when a previous candidate already exists
/// in the shop. The suffix wraps within six digits.
///
/// ```rust
/// use tillbook_core::checkout::{document_number, DocumentKind};
///
/// assert_eq!(document_number(DocumentKind::Invoice, 1_700_000_123_456, 0), "INV-123456");
/// assert_eq!(document_number(DocumentKind::Quotation, 1_700_000_999_999, 1), "QTN-000000");
/// ```
pub fn document_number(kind: DocumentKind, epoch_millis: i64, attempt: u32) -> String {
    numbered(kind, epoch_millis + attempt as i64)
}

/// Formats `PREFIX-NNNNNN` for an explicit suffix, wrapping within six digits.
///
/// ```rust
/// use tillbook_core::checkout::{numbered, DocumentKind};
///
/// assert_eq!(numbered(DocumentKind::PurchaseOrder, 42), "PO-000042");
/// assert_eq!(numbered(DocumentKind::Invoice, 1_000_000), "INV-000000");
/// ```
pub fn numbered(kind: DocumentKind, suffix: i64) -> String {
    format!("{}-{:06}", kind.prefix(), suffix.rem_euclid(1_000_000))
}

// =============================================================================
// Unit Tests
// =============================================================================
