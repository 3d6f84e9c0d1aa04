//! # Domain Types
//!
//! Core records shared by the database layer and the HTTP API.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │                         ┌─────────────────┐                             │
//! │                         │      Shop       │  tenant root                │
//! │                         │  dead_stock_days│                             │
//! │                         │  is_demo        │                             │
//! │                         └────────┬────────┘                             │
//! │        ┌──────────────┬──────────┼───────────┬──────────────┐           │
//! │        ▼              ▼          ▼           ▼              ▼           │
//! │  ┌──────────┐  ┌──────────┐ ┌─────────┐ ┌──────────┐ ┌─────────────┐   │
//! │  │  User    │  │ Product  │ │Customer │ │ Supplier │ │  Payment    │   │
//! │  └──────────┘  └────┬─────┘ └────┬────┘ └────┬─────┘ └─────────────┘   │
//! │                     │            │           │                          │
//! │                     ▼            ▼           ▼                          │
//! │              ┌─────────────┐ ┌─────────┐ ┌──────────────┐              │
//! │              │ InvoiceItem │◄┤ Invoice │ │PurchaseOrder │              │
//! │              │ (snapshot)  │ └─────────┘ └──────┬───────┘              │
//! │              └─────────────┘                    ▼                       │
//! │                                         ┌──────────────────┐           │
//! │                                         │PurchaseOrderItem │           │
//! │                                         └──────────────────┘           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tenancy
//! Every record except `Shop` carries `shop_id`, directly or through its
//! parent document. Repositories always filter on it.
//!
//! ## Wire Format
//! All records serialize as camelCase JSON. Monetary fields keep their
//! `Cents` suffix so the client never confuses minor and major units.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::LOW_STOCK_THRESHOLD;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% (e.g., a GST slab)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Shop
// =============================================================================

/// A tenant: one retail business and everything it owns.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Shop {
    pub id: String,
    pub name: String,
    pub owner_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub country: String,
    pub currency: String,
    pub currency_symbol: String,
    pub timezone: String,
    /// Tax rate in basis points (1800 = 18%).
    pub tax_rate_bps: i64,
    /// Whether product prices already include tax.
    pub tax_inclusive: bool,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub receipt_footer: Option<String>,
    /// Days without a sale before stock counts as dead.
    pub dead_stock_days: i64,
    /// Demo shops are subject to daily quotas.
    pub is_demo: bool,
    pub plan: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Shop {
    /// Returns the configured tax rate.
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps.clamp(0, 10_000) as u32)
    }
}

// =============================================================================
// User
// =============================================================================

/// Role of a user within their shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    /// Created at sign-up; full access.
    Owner,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Staff => "STAFF",
        }
    }
}

/// A login belonging to exactly one shop.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// The user summary returned by sign-up and login.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub shop_id: String,
    pub shop_name: String,
    pub currency: String,
    pub currency_symbol: String,
    pub country: String,
    pub is_demo: bool,
}

impl SessionUser {
    pub fn new(user: &User, shop: &Shop) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            shop_id: shop.id.clone(),
            shop_name: shop.name.clone(),
            currency: shop.currency.clone(),
            currency_symbol: shop.currency_symbol.clone(),
            country: shop.country.clone(),
            is_demo: shop.is_demo,
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A stocked item available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    /// Selling price in minor units.
    pub price_cents: i64,
    /// Purchase cost in minor units.
    pub cost_price_cents: i64,
    /// Units on hand. Never negative.
    pub stock: i64,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether a sale of `quantity` units can be fulfilled.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    /// Stock at or below the dashboard threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= LOW_STOCK_THRESHOLD
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Lifecycle status of an invoice.
///
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │  Sale path (stock decremented, payment recorded):            │
/// │     PAID      paid ≥ final                                   │
/// │     PARTIAL   0 < paid < final                               │
/// │     DUE       paid = 0                                       │
/// │                                                              │
/// │  Non-sale path (no stock or payment effect):                 │
/// │     HELD       parked cart                                   │
/// │     QUOTATION  price estimate                                │
/// └──────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum InvoiceStatus {
    Paid,
    Partial,
    Due,
    Held,
    Quotation,
}

impl InvoiceStatus {
    /// True for statuses that move stock and money.
    #[inline]
    pub fn is_sale(&self) -> bool {
        !matches!(self, InvoiceStatus::Held | InvoiceStatus::Quotation)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Partial => "PARTIAL",
            InvoiceStatus::Due => "DUE",
            InvoiceStatus::Held => "HELD",
            InvoiceStatus::Quotation => "QUOTATION",
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A finalized checkout document. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub shop_id: String,
    pub customer_id: Option<String>,
    /// `INV-123456` or `QTN-123456`, unique per shop.
    pub invoice_number: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    /// Σ line totals − discount. May be negative.
    pub total_cents: i64,
    /// Tax contained in the total (tax-inclusive shops only).
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub paid_cents: i64,
    pub status: InvoiceStatus,
    pub payment_mode: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Outstanding balance (never negative).
    #[inline]
    pub fn balance(&self) -> Money {
        (Money::from_cents(self.total_cents) - Money::from_cents(self.paid_cents)).non_negative()
    }
}

/// A line of an invoice.
/// Uses the snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    /// Cleared if the product is deleted later.
    pub product_id: Option<String>,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    /// Unit price at time of sale (frozen).
    pub price_cents: i64,
    /// price × quantity.
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An invoice with its lines and customer, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub customer: Option<Customer>,
}

// =============================================================================
// Payment
// =============================================================================

/// Direction of a money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum PaymentDirection {
    /// Money received from a customer.
    In,
    /// Money paid out.
    Out,
}

/// Money actually received or paid.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub shop_id: String,
    pub customer_id: Option<String>,
    pub amount_cents: i64,
    /// Tender tag such as CASH or CARD.
    pub mode: String,
    pub direction: PaymentDirection,
    /// Document number this payment settles.
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
}

// =============================================================================
// Supplier
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Purchase Orders
// =============================================================================

/// Lifecycle of a purchase order. One-way: PENDING → RECEIVED | CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum PurchaseOrderStatus {
    Pending,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Pending => "PENDING",
            PurchaseOrderStatus::Received => "RECEIVED",
            PurchaseOrderStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseOrder {
    pub id: String,
    pub shop_id: String,
    pub supplier_id: Option<String>,
    /// `PO-123456`, unique per shop.
    pub po_number: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub status: PurchaseOrderStatus,
    /// Σ item total costs.
    pub total_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseOrderItem {
    pub id: String,
    pub purchase_order_id: String,
    pub product_id: Option<String>,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    /// quantity × unit cost.
    pub total_cost_cents: i64,
}

/// A purchase order with supplier and lines, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub supplier: Option<Supplier>,
    pub items: Vec<PurchaseOrderItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            shop_id: "s1".to_string(),
            name: "Cola".to_string(),
            category: None,
            description: None,
            price_cents: 1000,
            cost_price_cents: 700,
            stock,
            sku: None,
            barcode: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1800);
        assert_eq!(rate.bps(), 1800);
        assert!((rate.percentage() - 18.0).abs() < 0.001);
    }

    #[test]
    fn test_invoice_status_is_sale() {
        assert!(InvoiceStatus::Paid.is_sale());
        assert!(InvoiceStatus::Partial.is_sale());
        assert!(InvoiceStatus::Due.is_sale());
        assert!(!InvoiceStatus::Held.is_sale());
        assert!(!InvoiceStatus::Quotation.is_sale());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::Quotation).unwrap(),
            "\"QUOTATION\""
        );
        assert_eq!(
            serde_json::to_string(&PurchaseOrderStatus::Received).unwrap(),
            "\"RECEIVED\""
        );
        assert_eq!(serde_json::to_string(&PaymentDirection::In).unwrap(), "\"IN\"");
    }

    #[test]
    fn test_product_stock_checks() {
        assert!(product(5).can_sell(5));
        assert!(!product(4).can_sell(5));
        assert!(product(5).is_low_stock());
        assert!(!product(6).is_low_stock());
    }

    #[test]
    fn test_invoice_detail_flattens() {
        let now = Utc::now();
        let detail = InvoiceDetail {
            invoice: Invoice {
                id: "i1".to_string(),
                shop_id: "s1".to_string(),
                customer_id: None,
                invoice_number: "INV-000001".to_string(),
                date: now,
                total_cents: 2000,
                tax_cents: 0,
                discount_cents: 0,
                paid_cents: 500,
                status: InvoiceStatus::Partial,
                payment_mode: "CASH".to_string(),
                created_at: now,
            },
            items: vec![],
            customer: None,
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["invoiceNumber"], "INV-000001");
        assert_eq!(json["status"], "PARTIAL");
        assert!(json["items"].as_array().unwrap().is_empty());
        assert_eq!(detail.invoice.balance().cents(), 1500);
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: "u1".to_string(),
            shop_id: "s1".to_string(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Owner,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"OWNER\""));
    }
}
