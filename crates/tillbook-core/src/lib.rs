//! # tillbook-core: Pure Business Logic for Tillbook
//!
//! This crate holds every business rule of the Tillbook retail backend as
//! plain data and pure functions. It never touches a database, socket or
//! clock; callers pass "now" in explicitly.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Single-page client (out of tree)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    auth, tenant extraction, demo quotas, handlers              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tillbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ checkout  │  │ purchase  │  │  report   │  │   │
//! │  │   │  Shop     │  │  status   │  │  PO lines │  │  window   │  │   │
//! │  │   │  Invoice  │  │  numbers  │  │  totals   │  │  health   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tillbook-db (Database Layer)                    │   │
//! │  │          SQLite queries, migrations, tenant-scoped repos        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Shop, Product, Invoice, PurchaseOrder, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`catalog`] - Product and supplier request models
//! - [`checkout`] - Checkout request model, status derivation, document numbers
//! - [`purchase`] - Purchase-order request model and line maths
//! - [`report`] - Report windows, health score and dashboard payloads
//! - [`tenant`] - Sign-up, settings and reset request models
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tillbook_core::checkout::derive_status;
//! use tillbook_core::money::Money;
//! use tillbook_core::types::InvoiceStatus;
//!
//! let final_amount = Money::from_cents(2000);
//! let paid = Money::from_cents(500);
//!
//! assert_eq!(derive_status(final_amount, paid), InvoiceStatus::Partial);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod checkout;
pub mod error;
pub mod money;
pub mod purchase;
pub mod report;
pub mod tenant;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tillbook_core::Money` instead of
// `use tillbook_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Products at or below this stock level count as "low stock" on the dashboard.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Default number of days without a sale before stock is considered dead.
pub const DEFAULT_DEAD_STOCK_DAYS: i64 = 30;

/// Default number of sale invoices a demo shop may create per day.
pub const DEFAULT_DEMO_INVOICES_PER_DAY: i64 = 5;

/// Default number of products a demo shop may create per day.
pub const DEFAULT_DEMO_PRODUCTS_PER_DAY: i64 = 5;

/// Maximum number of lines in a single invoice or purchase order.
pub const MAX_DOCUMENT_LINES: usize = 500;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 100000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 100_000;
