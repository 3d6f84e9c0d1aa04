//! # Report Module
//!
//! Report windows, the shop health score and the dashboard payload.
//!
//! ## Dashboard Assembly
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dashboard Pipeline                              │
//! │                                                                         │
//! │  ?startDate&endDate ──► DateWindow::resolve(now) ──► window            │
//! │                                                       │                 │
//! │  tillbook-db (queries) ──► DashboardFigures ◄─────────┘                 │
//! │                                │                                        │
//! │                                ▼                                        │
//! │                      build_dashboard(figures)                           │
//! │                      ├── sales summary (PAID, in window)                │
//! │                      ├── pending = max(0, sales − payments IN)          │
//! │                      ├── dead stock (≤10 rows, value, oldest example)   │
//! │                      └── health_score(HealthInputs) ∈ [0, 100]          │
//! │                                │                                        │
//! │                                ▼                                        │
//! │                         DashboardStats (JSON)                           │
//! │                                                                         │
//! │  Any failure upstream ──► DashboardStats::empty() with HTTP 200         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Health Score
//! ```text
//! momentum     = min(40, trailing30 / 2000 × 40)  (+5 if allTime > 0 and trailing30 = 0)
//! collections  = max(0, 30 − pending / allTime × 100)   only when allTime > 0
//! inventory    = max(0, 30 × (1 − (dead / total) / 0.3)) when total > 0, else 15
//! score        = round(clamp(momentum + collections + inventory, 0, 100))
//! ```
//! Amounts enter the formula in major units. When all-time sales are zero
//! the collections term is left out entirely rather than zero-filled.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::InvoiceStatus;

/// Trailing sales (major units) that earn the full momentum score.
pub const MOMENTUM_TARGET: Money = Money::from_cents(200_000);

/// Days of trailing sales used for momentum.
pub const MOMENTUM_DAYS: i64 = 30;

/// Dead-stock rows included in the dashboard payload.
pub const DEAD_STOCK_SAMPLE: usize = 10;

/// Rows in the recent-sales and top-products lists.
pub const DASHBOARD_LIST_LIMIT: i64 = 5;

// =============================================================================
// Date Windows
// =============================================================================

/// An inclusive reporting window in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DateWindow {
    #[ts(as = "String")]
    pub start: DateTime<Utc>,
    #[ts(as = "String")]
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Today in the zone of `now`: 00:00:00.000 to 23:59:59.999.
    pub fn today<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let day = now.date_naive();
        DateWindow {
            start: local_to_utc(&now.timezone(), day.and_time(NaiveTime::MIN)),
            end: local_to_utc(&now.timezone(), end_of_day(day)),
        }
    }

    /// Resolves optional query bounds, falling back per field to today.
    ///
    /// Each bound accepts RFC 3339, a naive date-time (read in the zone of
    /// `now`) or a bare `YYYY-MM-DD`. A bare date means the start of that
    /// day for `start` and the end of that day for `end`. Missing, invalid,
    /// `"undefined"` and `"null"` values use today's bound instead.
    pub fn resolve<Tz: TimeZone>(start: Option<&str>, end: Option<&str>, now: &DateTime<Tz>) -> Self {
        let today = DateWindow::today(now);
        let tz = now.timezone();
        DateWindow {
            start: parse_bound(start, Bound::Start, &tz).unwrap_or(today.start),
            end: parse_bound(end, Bound::End, &tz).unwrap_or(today.end),
        }
    }

    /// A window only when both bounds are present and valid.
    pub fn explicit<Tz: TimeZone>(start: Option<&str>, end: Option<&str>, tz: &Tz) -> Option<Self> {
        Some(DateWindow {
            start: parse_bound(start, Bound::Start, tz)?,
            end: parse_bound(end, Bound::End, tz)?,
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Midnight today in the zone of `now`, as UTC.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    DateWindow::today(now).start
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn parse_bound<Tz: TimeZone>(raw: Option<&str>, bound: Bound, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim)?;
    if raw.is_empty() || raw == "undefined" || raw == "null" {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(local_to_utc(tz, naive));
        }
    }

    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let naive = match bound {
        Bound::Start => day.and_time(NaiveTime::MIN),
        Bound::End => end_of_day(day),
    };
    Some(local_to_utc(tz, naive))
}

fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::milliseconds(1)
}

/// Interprets a wall-clock time in `tz`. Times skipped by a DST jump fall
/// back to reading the wall clock as UTC.
fn local_to_utc<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

// =============================================================================
// Health Score
// =============================================================================

/// Raw figures feeding the health score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HealthInputs {
    /// Sale-invoice total over the trailing 30 days.
    pub trailing_sales: Money,
    /// Sale-invoice total, all time.
    pub all_time_sales: Money,
    /// All-time outstanding balance (already floored at zero).
    pub pending: Money,
    pub total_products: i64,
    pub dead_stock_count: i64,
}

/// The three components of the health score, unrounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthBreakdown {
    pub momentum: f64,
    /// `None` when the shop has no sales yet.
    pub collections: Option<f64>,
    pub inventory: f64,
}

impl HealthBreakdown {
    pub fn compute(inputs: &HealthInputs) -> Self {
        let trailing = inputs.trailing_sales.as_major_f64();
        let all_time = inputs.all_time_sales.as_major_f64();
        let target = MOMENTUM_TARGET.as_major_f64();

        let mut momentum = (trailing / target * 40.0).min(40.0);
        if inputs.all_time_sales.is_positive() && inputs.trailing_sales.is_zero() {
            momentum += 5.0;
        }

        let collections = if inputs.all_time_sales.is_positive() {
            let pending_ratio = inputs.pending.as_major_f64() / all_time;
            Some((30.0 - pending_ratio * 100.0).max(0.0))
        } else {
            None
        };

        let inventory = if inputs.total_products > 0 {
            let dead_ratio = inputs.dead_stock_count as f64 / inputs.total_products as f64;
            (30.0 * (1.0 - dead_ratio / 0.3)).max(0.0)
        } else {
            15.0
        };

        HealthBreakdown {
            momentum,
            collections,
            inventory,
        }
    }

    /// Rounded total, clamped to [0, 100].
    pub fn score(&self) -> i64 {
        let raw = self.momentum + self.collections.unwrap_or(0.0) + self.inventory;
        if raw.is_nan() {
            return 0;
        }
        raw.clamp(0.0, 100.0).round() as i64
    }
}

/// Computes the 0–100 shop health score.
pub fn health_score(inputs: &HealthInputs) -> i64 {
    HealthBreakdown::compute(inputs).score()
}

// =============================================================================
// Dashboard Payload
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReportRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesSummary {
    pub total_cents: i64,
    pub count: i64,
    pub average_cents: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LowStock {
    pub count: i64,
}

/// A product that has not sold within the dead-stock threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeadStockItem {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeadStockExample {
    pub name: String,
    pub days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DeadStockSummary {
    pub count: i64,
    pub value_cents: i64,
    pub days_threshold: i64,
    pub data: Vec<DeadStockItem>,
    pub example: Option<DeadStockExample>,
}

/// One of the latest invoices, with the customer's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecentSale {
    pub id: String,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub status: InvoiceStatus,
    pub payment_mode: String,
    pub customer_name: Option<String>,
}

/// Quantity and revenue for one product over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    pub price_cents: i64,
    pub total_sold: i64,
    pub total_revenue_cents: i64,
}

/// Response of `GET /reports/dashboard`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardStats {
    pub range: ReportRange,
    pub sales: SalesSummary,
    pub pending_payments_cents: i64,
    pub low_stock: LowStock,
    pub health_score: i64,
    pub dead_stock: DeadStockSummary,
    pub recent_sales: Vec<RecentSale>,
    pub top_products: Vec<TopProduct>,
}

impl DashboardStats {
    /// The zeroed payload served when aggregation fails.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Everything the database layer gathers for one dashboard.
#[derive(Debug, Clone)]
pub struct DashboardFigures {
    pub window: DateWindow,
    pub now: DateTime<Utc>,
    pub window_sales: Money,
    pub window_count: i64,
    pub trailing_sales: Money,
    pub all_time_sales: Money,
    pub all_time_payments: Money,
    pub low_stock_count: i64,
    pub total_products: i64,
    pub dead_stock_days: i64,
    /// Oldest first.
    pub dead_stock: Vec<DeadStockItem>,
    pub recent_sales: Vec<RecentSale>,
    pub top_products: Vec<TopProduct>,
}

/// Turns gathered figures into the dashboard payload.
pub fn build_dashboard(figures: DashboardFigures) -> DashboardStats {
    let DashboardFigures {
        window,
        now,
        window_sales,
        window_count,
        trailing_sales,
        all_time_sales,
        all_time_payments,
        low_stock_count,
        total_products,
        dead_stock_days,
        dead_stock,
        recent_sales,
        top_products,
    } = figures;

    let average_cents = if window_count > 0 {
        window_sales.cents() / window_count
    } else {
        0
    };

    let pending = (all_time_sales - all_time_payments).non_negative();

    let dead_count = dead_stock.len() as i64;
    let dead_value: Money = dead_stock
        .iter()
        .map(|item| Money::from_cents(item.price_cents).multiply_quantity(item.stock))
        .sum();
    let example = dead_stock.first().map(|item| DeadStockExample {
        name: item.name.clone(),
        days: (now - item.created_at).num_days(),
    });

    let health = health_score(&HealthInputs {
        trailing_sales,
        all_time_sales,
        pending,
        total_products,
        dead_stock_count: dead_count,
    });

    DashboardStats {
        range: ReportRange {
            start: Some(window.start),
            end: Some(window.end),
        },
        sales: SalesSummary {
            total_cents: window_sales.cents(),
            count: window_count,
            average_cents,
        },
        pending_payments_cents: pending.cents(),
        low_stock: LowStock {
            count: low_stock_count,
        },
        health_score: health,
        dead_stock: DeadStockSummary {
            count: dead_count,
            value_cents: dead_value.cents(),
            days_threshold: dead_stock_days,
            data: dead_stock.into_iter().take(DEAD_STOCK_SAMPLE).collect(),
            example,
        },
        recent_sales,
        top_products,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
