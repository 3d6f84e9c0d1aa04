//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    Every price, total, payment and stock value is stored as i64 cents  │
//! │    (paise, pence, ...). Floats appear only in the health score, which  │
//! │    is a ratio and never written back.                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillbook_core::money::Money;
//!
//! let price = Money::from_cents(1099);
//! let line_total = price.multiply_quantity(2);
//! assert_eq!(line_total.cents(), 2198);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: a discount larger than the cart yields a negative
///   final amount, which is stored as-is
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Currency-agnostic**: the shop's currency symbol is a display concern
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_cents ──► InvoiceItem.price_cents ──► line total         │
/// │                                                                         │
/// │  Σ line totals − discount ──► Invoice.total_cents ──► status            │
/// │                                                                         │
/// │  Σ Invoice.total − Σ Payment.amount ──► pending payments                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole major-unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor-unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the value in major units as a float.
    ///
    /// Only for ratio-style reporting such as the health score. Never feed
    /// the result back into stored amounts.
    ///
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(200_000).as_major_f64(), 2000.0);
    /// ```
    #[inline]
    pub fn as_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Extracts the tax already contained in a tax-inclusive amount.
    ///
    /// `tax = amount × bps / (10000 + bps)`, rounded half up in integer
    /// arithmetic (i128 to avoid overflow).
    ///
    /// ```rust
    /// use tillbook_core::money::Money;
    /// use tillbook_core::types::TaxRate;
    ///
    /// // 118.00 at 18% inclusive contains 18.00 of tax
    /// let tax = Money::from_cents(11_800).included_tax(TaxRate::from_bps(1800));
    /// assert_eq!(tax.cents(), 1_800);
    /// ```
    pub fn included_tax(&self, rate: TaxRate) -> Money {
        if rate.is_zero() || self.0 <= 0 {
            return Money::zero();
        }
        let bps = rate.bps() as i128;
        let divisor = 10_000 + bps;
        let tax = (self.0 as i128 * bps + divisor / 2) / divisor;
        Money::from_cents(tax as i64)
    }

    /// Formats the value with a currency symbol, e.g. `₹10.50`.
    pub fn format_with(&self, symbol: &str) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}{}.{:02}", sign, symbol, self.major().abs(), self.minor_part())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering without a symbol (e.g. `-5.50`).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(Money::from_cents(500).format_with("₹"), "₹5.00");
        assert_eq!(Money::from_cents(-550).format_with("$"), "-$5.50");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((b - a).cents(), -500);
        assert_eq!((a * 3).cents(), 3000);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 650].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 1000);

        let empty: Money = std::iter::empty::<Money>().sum();
        assert!(empty.is_zero());
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(Money::from_cents(-1).non_negative(), Money::zero());
        assert_eq!(Money::from_cents(42).non_negative().cents(), 42);
    }

    #[test]
    fn test_included_tax() {
        // 105.00 at 5% inclusive → 5.00 tax
        let tax = Money::from_cents(10_500).included_tax(TaxRate::from_bps(500));
        assert_eq!(tax.cents(), 500);

        // Rounds to nearest minor unit: 10.00 at 8.25% → 0.7621.. → 76
        let tax = Money::from_cents(1_000).included_tax(TaxRate::from_bps(825));
        assert_eq!(tax.cents(), 76);

        assert!(Money::from_cents(1_000)
            .included_tax(TaxRate::zero())
            .is_zero());
        assert!(Money::from_cents(-1_000)
            .included_tax(TaxRate::from_bps(500))
            .is_zero());
    }

    #[test]
    fn test_as_major_f64() {
        assert!((Money::from_cents(1999).as_major_f64() - 19.99).abs() < 1e-9);
    }
}
