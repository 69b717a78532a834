//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A quote with 40 equipment lines at $12.10 × 1.15 markup, summed in     │
//! │  binary floats, drifts by fractions of a cent per line. The PDF then    │
//! │  shows a grand total that disagrees with the sum of its own rows.       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    • every line total is computed in i128 and rounded ONCE to cents    │
//! │    • subtotals are exact integer sums of the rounded lines             │
//! │    • documents still store decimals (250.0) for readability            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use quotekit_core::money::Money;
//!
//! let price = Money::from_cents(5000); // $50.00
//! let line = price.multiply_quantity(2);
//! assert_eq!(line.to_string(), "$100.00");
//! ```

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// ## Document Representation
/// Stored documents keep prices as decimal numbers (`"price": 250.0`).
/// Serialization converts cents to a decimal; deserialization rounds the
/// decimal to the nearest cent, so `19.999` becomes `$20.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[ts(export)]
pub struct Money(#[ts(type = "number")] i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole dollars.
    #[inline]
    pub const fn from_dollars(dollars: i64) -> Self {
        Money(dollars.saturating_mul(100))
    }

    /// Parses a decimal amount (as typed into a form or read from a
    /// document), rounding to the nearest cent.
    ///
    /// ## Returns
    /// * `None` - the value is NaN or infinite
    ///
    /// ## Example
    /// ```rust
    /// use quotekit_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(10.99), Some(Money::from_cents(1099)));
    /// assert_eq!(Money::from_decimal(f64::NAN), None);
    /// ```
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Money((value * 100.0).round() as i64))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the value as a decimal number of dollars.
    ///
    /// Only for serialization and display; never compute with the result.
    pub fn to_decimal(&self) -> f64 {
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

    /// Checks if the value is greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by an integer quantity, saturating at the `i64`
    /// bounds.
    ///
    /// ## Example
    /// ```rust
    /// use quotekit_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Scales the amount by `numerator / denominator`, rounding once.
    ///
    /// Every percentage, multiplier and hours calculation funnels through
    /// here so that the rounding rule lives in exactly one place.
    pub fn scale(&self, numerator: i128, denominator: i128) -> Money {
        Money::from_cents(round_div((self.0 as i128).saturating_mul(numerator), denominator))
    }
}

/// Integer division rounding half away from zero, clamped to the `i64`
/// range.
///
/// ## Example
/// ```text
///  125 / 10 → 13      -125 / 10 → -13
///  124 / 10 → 12      -124 / 10 → -12
/// ```
pub fn round_div(numerator: i128, denominator: i128) -> i64 {
    debug_assert!(denominator > 0, "denominator must be positive");
    let half = denominator / 2;
    let rounded = if numerator >= 0 {
        numerator.saturating_add(half) / denominator
    } else {
        numerator.saturating_sub(half) / denominator
    };
    rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Money::from_decimal(value)
            .ok_or_else(|| de::Error::custom(format!("invalid amount: {}", value)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(76680).to_string(), "$766.80");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
    }

    #[test]
    fn test_round_div_half_away_from_zero() {
        assert_eq!(round_div(125, 10), 13);
        assert_eq!(round_div(124, 10), 12);
        assert_eq!(round_div(-125, 10), -13);
        assert_eq!(round_div(-124, 10), -12);
        assert_eq!(round_div(0, 10_000), 0);
    }

    #[test]
    fn test_scale() {
        // $10.00 × 8.25% = $0.825 → $0.83
        assert_eq!(Money::from_cents(1000).scale(825, 10_000).cents(), 83);
        // $50.00 × 110% = $55.00
        assert_eq!(Money::from_cents(5000).scale(11_000, 10_000).cents(), 5500);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 5].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 355);
    }

    #[test]
    fn test_serializes_as_decimal() {
        let json = serde_json::to_string(&Money::from_cents(25000)).unwrap();
        assert_eq!(json, "250.0");

        let json = serde_json::to_string(&Money::from_cents(1099)).unwrap();
        assert_eq!(json, "10.99");
    }

    #[test]
    fn test_deserializes_integers_and_decimals() {
        let m: Money = serde_json::from_str("85").unwrap();
        assert_eq!(m.cents(), 8500);

        let m: Money = serde_json::from_str("0.1").unwrap();
        assert_eq!(m.cents(), 10);

        let m: Money = serde_json::from_str("19.999").unwrap();
        assert_eq!(m.cents(), 2000);

        assert!(serde_json::from_str::<Money>("\"ten\"").is_err());
    }

    #[test]
    fn test_huge_quantities_saturate() {
        let price = Money::from_dollars(250);
        assert_eq!(price.multiply_quantity(i64::MAX).cents(), i64::MAX);
        assert_eq!(price.multiply_quantity(i64::MIN).cents(), i64::MIN);

        let total: Money = [Money::from_cents(i64::MAX), price].into_iter().sum();
        assert_eq!(total.cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MIN) - price).cents(), i64::MIN);

        let mut running = Money::from_cents(i64::MAX - 1);
        running += price;
        assert_eq!(running.cents(), i64::MAX);

        assert_eq!(Money::from_cents(i64::MAX).scale(20_000, 10_000).cents(), i64::MAX);
    }

    #[test]
    fn test_many_small_lines_do_not_drift() {
        let line = Money::from_decimal(0.1).unwrap();
        let total: Money = std::iter::repeat(line).take(1000).sum();
        assert_eq!(total, Money::from_dollars(100));
    }
}
