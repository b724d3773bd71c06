//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Tier boundaries like £100.00 / £100.01 must compare exactly:          │
//! │    100.01 as f64 = 100.01000000000000511  ❌                            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Pence                                            │
//! │    10000p <= 10000p <= 10000p  → first tier                             │
//! │    10001p                      → second tier                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use delivery_core::money::Money;
//!
//! let subtotal: Money = "100.01".parse().unwrap();
//! assert_eq!(subtotal.pence(), 10001);
//!
//! let total = subtotal + Money::from_pence(99);
//! assert_eq!(total.to_string(), "£101.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (pence).
///
/// ## Design Decisions
/// - **i64 (signed)**: proposed tiers may carry negative bounds that the
///   validator must be able to see and reject
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart subtotal ──► Tier selection (min <= subtotal <= max)              │
/// │                          │                                              │
/// │                          ▼                                              │
/// │                    tier.base_cost ──► VAT ──► cost_inc_vat              │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from pence.
    ///
    /// ## Example
    /// ```rust
    /// use delivery_core::money::Money;
    ///
    /// let cost = Money::from_pence(2000); // £20.00
    /// assert_eq!(cost.pence(), 2000);
    /// ```
    #[inline]
    pub const fn from_pence(pence: i64) -> Self {
        Money(pence)
    }

    /// Creates a Money value from pounds and pence.
    ///
    /// ## Example
    /// ```rust
    /// use delivery_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(100, 1).pence(), 10001);
    /// assert_eq!(Money::from_major_minor(-5, 50).pence(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in pence.
    #[inline]
    pub const fn pence(&self) -> i64 {
        self.0
    }

    /// Returns the whole pounds portion.
    #[inline]
    pub const fn pounds(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the pence portion (always 0-99).
    #[inline]
    pub const fn pence_part(&self) -> i64 {
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

    /// Calculates tax on this amount, rounding half up to the nearest penny.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use delivery_core::money::Money;
    /// use delivery_core::types::TaxRate;
    ///
    /// let cost = Money::from_pence(1000); // £10.00
    /// let vat = cost.calculate_tax(TaxRate::from_bps(2000)); // 20%
    /// assert_eq!(vat.pence(), 200);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_pence(i64::try_from(tax).unwrap_or(if tax < 0 { i64::MIN } else { i64::MAX }))
    }

    /// `None` on overflow.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Clamps at the i64 range instead of overflowing.
    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }
}

// =============================================================================
// Decimal Parsing
// =============================================================================

/// Parses fixed-point text with at most two fractional digits into
/// hundredths: `"100.01"` → `10001`, `"17.5"` → `1750`, `"-3"` → `-300`.
///
/// Shared by [`Money`] (pence) and [`TaxRate`] (basis points), both of
/// which are hundredths of their display unit.
pub(crate) fn parse_hundredths(input: &str) -> Option<i64> {
    let text = input.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.len() > 2 {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole_value: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let fraction_value: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };

    let value = whole_value.checked_mul(100)?.checked_add(fraction_value)?;
    Some(if negative { -value } else { value })
}

/// Parses a decimal amount such as `"100.01"` or `"£20"`.
///
/// ## Rules
/// - Optional leading `£`
/// - At most two fractional digits (`"1.005"` is rejected, never rounded)
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unsigned = trimmed.strip_prefix('£').unwrap_or(trimmed);

        parse_hundredths(unsigned)
            .map(Money)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: format!("'{}' is not a decimal amount with at most 2 decimal places", s.trim()),
            })
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders `£12.34` / `-£5.50`. Also used in validation messages.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}£{}.{:02}", sign, self.pounds().abs(), self.pence_part())
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

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pence() {
        let money = Money::from_pence(1099);
        assert_eq!(money.pence(), 1099);
        assert_eq!(money.pounds(), 10);
        assert_eq!(money.pence_part(), 99);
    }

    #[test]
    fn test_checked_and_saturating_add() {
        let big = Money::from_pence(i64::MAX);
        assert_eq!(big.checked_add(Money::from_pence(1)), None);
        assert_eq!(big.saturating_add(Money::from_pence(1)), big);
        assert_eq!(
            Money::from_pence(100).checked_add(Money::from_pence(1)),
            Some(Money::from_pence(101))
        );
    }

    #[test]
    fn test_tax_clamps_instead_of_truncating() {
        let tax = Money::from_pence(i64::MAX).calculate_tax(TaxRate::from_bps(20_000));
        assert_eq!(tax.pence(), i64::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_pence(1099).to_string(), "£10.99");
        assert_eq!(Money::from_pence(500).to_string(), "£5.00");
        assert_eq!(Money::from_pence(-550).to_string(), "-£5.50");
        assert_eq!(Money::zero().to_string(), "£0.00");
        assert_eq!(Money::from_pence(99_999_999).to_string(), "£999999.99");
    }

    #[test]
    fn test_parse_decimal_amounts() {
        assert_eq!("100".parse::<Money>().unwrap().pence(), 10000);
        assert_eq!("100.01".parse::<Money>().unwrap().pence(), 10001);
        assert_eq!("100.5".parse::<Money>().unwrap().pence(), 10050);
        assert_eq!(".5".parse::<Money>().unwrap().pence(), 50);
        assert_eq!(" £20.00 ".parse::<Money>().unwrap().pence(), 2000);
        assert_eq!("-3".parse::<Money>().unwrap().pence(), -300);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("".parse::<Money>().is_err());
        assert!(".".parse::<Money>().is_err());
        assert!("1.005".parse::<Money>().is_err());
        assert!("12a".parse::<Money>().is_err());
        assert!("1,000".parse::<Money>().is_err());
        assert!("99999999999999999999".parse::<Money>().is_err());
    }

    #[test]
    fn test_tax_calculation_basic() {
        let amount = Money::from_pence(1000);
        let tax = amount.calculate_tax(TaxRate::from_bps(2000));
        assert_eq!(tax.pence(), 200);
        assert_eq!((amount + tax).pence(), 1200);
    }

    #[test]
    fn test_tax_calculation_rounds_half_up() {
        // £10.00 at 8.25% = £0.825 → £0.83
        let tax = Money::from_pence(1000).calculate_tax(TaxRate::from_bps(825));
        assert_eq!(tax.pence(), 83);
    }

    #[test]
    fn test_arithmetic_and_checks() {
        let a = Money::from_pence(1000);
        let b = Money::from_pence(500);
        assert_eq!((a + b).pence(), 1500);
        assert_eq!((a - b).pence(), 500);

        let mut c = Money::zero();
        assert!(c.is_zero());
        c += b;
        assert!(c.is_positive());
        assert!((b - a).is_negative());
    }
}
