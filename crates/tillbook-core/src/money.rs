//! # Money Module
//!
//! Provides the `Money` and `TaxRate` types for handling monetary values.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │    3 × 19.99 = 59.97000000000001                                        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    3 × 1999 = 5997 → "59.97"                                            │
//! │    Every total is already rounded to 2 decimal places                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillbook_core::money::Money;
//!
//! let price = Money::from_cents(1099);   // 10.99
//! let doubled = price * 2;               // 21.98
//! let total = price + Money::from_cents(500);
//! assert_eq!(total.cents(), 1599);
//! assert_eq!(doubled.to_string(), "21.98");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Number of basis points in 100%.
const BPS_SCALE: i128 = 10_000;

/// Divides rounding half away from zero.
///
/// `denominator` must be positive.
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the currency's minor unit (cents).
///
/// ## Where Money is Used
/// ```text
/// LineItem.unit_price ──► LineItem.total ──► subtotal ──► tax ──► total
///                                                                   │
/// Payment.amount ──────────────────────────────► Balance.remaining ◄┘
/// ```
///
/// Serialized as a bare integer of minor units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a decimal string such as `"12.5"` or `"-0.345"`.
    ///
    /// Extra fraction digits are rounded half away from zero to two places,
    /// which is how prices typed into a form become minor units.
    ///
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal_str("12.5").unwrap().cents(), 1250);
    /// assert_eq!(Money::from_decimal_str("0.345").unwrap().cents(), 35);
    /// assert!(Money::from_decimal_str("abc").is_err());
    /// ```
    pub fn from_decimal_str(input: &str) -> CoreResult<Self> {
        let invalid = || CoreError::invalid_input("amount", format!("'{}' is not a number", input));

        let trimmed = input.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let major: i128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };

        let mut frac = frac_part.chars().map(|c| c as i128 - '0' as i128);
        let tenths = frac.next().unwrap_or(0);
        let hundredths = frac.next().unwrap_or(0);
        let round_up = frac.next().is_some_and(|d| d >= 5);

        let mut cents = major * 100 + tenths * 10 + hundredths;
        if round_up {
            cents += 1;
        }
        if negative {
            cents = -cents;
        }

        i64::try_from(cents).map(Money).map_err(|_| invalid())
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    #[inline]
    pub fn clamp_zero(self) -> Self {
        self.max(Money::zero())
    }

    /// Sum that reports overflow instead of wrapping.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Multiplies by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Tax added on top of this (net) amount.
    ///
    /// ## Implementation
    /// `amount × bps / 10000`, rounded half away from zero on the minor unit.
    ///
    /// ```rust
    /// use tillbook_core::money::{Money, TaxRate};
    ///
    /// let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(825)).unwrap();
    /// // 10.00 × 8.25% = 0.825 → 0.83
    /// assert_eq!(tax.cents(), 83);
    /// ```
    ///
    /// ## Errors
    /// `InvalidInput` when the tax does not fit in an amount (rates above
    /// 100% on a huge base).
    pub fn calculate_tax(&self, rate: TaxRate) -> CoreResult<Money> {
        let tax = div_round(self.0 as i128 * rate.bps() as i128, BPS_SCALE);
        i64::try_from(tax)
            .map(Money)
            .map_err(|_| CoreError::invalid_input("tax", "amount overflows"))
    }

    /// Tax portion already contained in this (gross) amount.
    ///
    /// ## Implementation
    /// `gross - gross / (1 + r)` simplifies to `gross × bps / (10000 + bps)`,
    /// computed in integers and rounded once.
    ///
    /// ```rust
    /// use tillbook_core::money::{Money, TaxRate};
    ///
    /// let tax = Money::from_cents(11500).extract_inclusive_tax(TaxRate::from_bps(1500));
    /// assert_eq!(tax.cents(), 1500);
    /// ```
    pub fn extract_inclusive_tax(&self, rate: TaxRate) -> Money {
        let bps = rate.bps() as i128;
        // |tax| <= |gross|, so the result always fits.
        let tax = div_round(self.0 as i128 * bps, BPS_SCALE + bps);
        Money(tax as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering, e.g. `-5.50`.
///
/// Currency symbols and placement are a presentation concern handled by
/// `template::CurrencyFormat`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1500 bps = 15% (a common VAT rate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (settings screens store these).
    ///
    /// Negative percentages clamp to zero.
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct.max(0.0) * 100.0).round() as u32)
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
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_from_decimal_str() {
        assert_eq!(Money::from_decimal_str("12").unwrap().cents(), 1200);
        assert_eq!(Money::from_decimal_str("12.5").unwrap().cents(), 1250);
        assert_eq!(Money::from_decimal_str(".99").unwrap().cents(), 99);
        assert_eq!(Money::from_decimal_str("0.344").unwrap().cents(), 34);
        assert_eq!(Money::from_decimal_str("0.345").unwrap().cents(), 35);
        assert_eq!(Money::from_decimal_str("-1.005").unwrap().cents(), -101);
        assert_eq!(Money::from_decimal_str(" 7.10 ").unwrap().cents(), 710);

        assert!(Money::from_decimal_str("").is_err());
        assert!(Money::from_decimal_str(".").is_err());
        assert!(Money::from_decimal_str("1.2.3").is_err());
        assert!(Money::from_decimal_str("1e5").is_err());
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);
        assert_eq!((b - a).clamp_zero(), Money::zero());

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_exclusive_tax_rounding() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(Money::from_cents(1000).calculate_tax(rate).unwrap().cents(), 83);
        assert_eq!(Money::from_cents(-1000).calculate_tax(rate).unwrap().cents(), -83);
        assert_eq!(Money::from_cents(1000).calculate_tax(TaxRate::zero()).unwrap(), Money::zero());
    }

    #[test]
    fn test_overflow_is_reported() {
        let huge = Money::from_cents(i64::MAX / 2 + 1);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(Money::from_cents(1).checked_add(Money::from_cents(2)), Some(Money::from_cents(3)));

        assert!(huge.calculate_tax(TaxRate::from_bps(30_000)).is_err());
        let gross = Money::from_cents(i64::MAX);
        assert!(gross.extract_inclusive_tax(TaxRate::from_bps(u32::MAX)) <= gross);
    }

    #[test]
    fn test_inclusive_tax_extraction() {
        let rate = TaxRate::from_bps(1500);
        let gross = Money::from_cents(10000);
        let tax = gross.extract_inclusive_tax(rate);
        // 100.00 / 1.15 = 86.9565… → base 86.96, tax 13.04
        assert_eq!(tax.cents(), 1304);
        let base = gross - tax;
        assert!((base.calculate_tax(rate).unwrap() + base - gross).abs().cents() <= 1);
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(8.25).bps(), 825);
        assert_eq!(TaxRate::from_percentage(15.0).bps(), 1500);
        assert_eq!(TaxRate::from_percentage(-3.0).bps(), 0);
        assert!((TaxRate::from_bps(825).percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_serializes_as_minor_units() {
        let json = serde_json::to_string(&Money::from_cents(1250)).unwrap();
        assert_eq!(json, "1250");
        let back: Money = serde_json::from_str("1250").unwrap();
        assert_eq!(back.cents(), 1250);
    }
}
