//! # Money Module
//!
//! Provides the `Money` type for Rupiah amounts and `Ratio` for the exact
//! fractional multipliers used by the tax pipeline.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  183333 * 0.12 in floating point = 21999.959999999999                   │
//! │  200000 * 11 / 12                = 183333.33333333334                   │
//! │                                                                         │
//! │  OUR SOLUTION: whole Rupiah in i64, ratios as (num, den)                │
//! │    round(183333 × 12/100) = (2·183333·12 + 100) div 200 = 22000        │
//! │    No float ever touches an amount.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use niaga_core::money::{Money, Ratio};
//!
//! let goods = Money::from_rupiah(200_000);
//! let dpp = goods.mul_ratio_round(Ratio::new(11, 12));
//! assert_eq!(dpp.rupiah(), 183_333);
//! assert_eq!(dpp.to_string(), "Rp 183.333");
//! ```

use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole Rupiah.
///
/// ## Design Decisions
/// - **i64 (signed)**: negotiation adjustments can be negative
/// - **No minor unit**: Rupiah invoices are issued in whole Rupiah
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// InvoiceItem.quantity × price ──► subtotal ──► goods ──► DPP ──► VAT
///                                                  │                 │
///                                                  └──── total ◄─────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole Rupiah.
    ///
    /// ```rust
    /// use niaga_core::money::Money;
    ///
    /// let price = Money::from_rupiah(125_000);
    /// assert_eq!(price.rupiah(), 125_000);
    /// ```
    #[inline]
    pub const fn from_rupiah(rupiah: i64) -> Self {
        Money(rupiah)
    }

    /// Returns the value in whole Rupiah.
    #[inline]
    pub const fn rupiah(&self) -> i64 {
        self.0
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

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use niaga_core::money::Money;
    ///
    /// let line = Money::from_rupiah(15_000).multiply_quantity(3);
    /// assert_eq!(line.rupiah(), 45_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Multiplies by a ratio and rounds half toward positive infinity.
    ///
    /// ## Rounding
    /// Matches `Math.round` on the exact rational value:
    /// `floor(x + 1/2)` where `x = amount × num / den`.
    /// With integers that is `floor((2·amount·num + den) / (2·den))`.
    ///
    /// ```text
    /// 183333.33 → 183333      21999.96 → 22000
    ///      0.5  → 1              -0.5  → 0         -1.5 → -1
    /// ```
    ///
    /// Computed in i128 so the intermediate product cannot overflow.
    /// Results beyond the i64 range saturate, and a ratio with a
    /// non-positive denominator yields zero; use
    /// [`Money::checked_mul_ratio_round`] when either must be an error.
    pub fn mul_ratio_round(&self, ratio: Ratio) -> Money {
        match ratio.apply_round(self.0 as i128) {
            Some(value) => Money(value.clamp(i64::MIN as i128, i64::MAX as i128) as i64),
            None => Money::zero(),
        }
    }

    /// Like [`Money::mul_ratio_round`] but reports overflow and invalid
    /// ratios.
    pub fn checked_mul_ratio_round(&self, ratio: Ratio, context: &str) -> CoreResult<Money> {
        let value = ratio.apply_round(self.0 as i128).ok_or(CoreError::InvalidRatio {
            num: ratio.num,
            den: ratio.den,
        })?;
        i64::try_from(value)
            .map(Money)
            .map_err(|_| CoreError::Overflow {
                context: context.to_string(),
            })
    }

    /// Checked addition.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }
}

// =============================================================================
// Ratio
// =============================================================================

/// An exact rational multiplier such as 11/12 (DPP) or 12/100 (VAT).
///
/// Deserializing checks the denominator the same way [`Ratio::try_new`]
/// does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Ratio {
    num: i64,
    den: i64,
}

impl Ratio {
    /// Creates a ratio. The denominator must be positive; use
    /// [`Ratio::try_new`] for untrusted input.
    pub const fn new(num: i64, den: i64) -> Self {
        Ratio { num, den }
    }

    /// Creates a ratio after checking the denominator.
    pub fn try_new(num: i64, den: i64) -> CoreResult<Self> {
        if den <= 0 {
            return Err(CoreError::InvalidRatio { num, den });
        }
        Ok(Ratio { num, den })
    }

    /// A ratio of `percent / 100`.
    pub const fn percent(percent: i64) -> Self {
        Ratio::new(percent, 100)
    }

    /// The identity ratio 1/1.
    pub const fn one() -> Self {
        Ratio::new(1, 1)
    }

    /// Numerator.
    pub const fn num(&self) -> i64 {
        self.num
    }

    /// Denominator.
    pub const fn den(&self) -> i64 {
        self.den
    }

    /// Returns true when the denominator is usable.
    pub const fn is_valid(&self) -> bool {
        self.den > 0
    }

    /// `None` for an invalid ratio.
    fn apply_round(&self, amount: i128) -> Option<i128> {
        if !self.is_valid() {
            return None;
        }
        let num = self.num as i128;
        let den = self.den as i128;
        // floor division (div_euclid with a positive divisor)
        Some((2 * amount * num + den).div_euclid(2 * den))
    }
}

impl<'de> Deserialize<'de> for Ratio {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Parts {
            num: i64,
            den: i64,
        }

        let parts = Parts::deserialize(deserializer)?;
        Ratio::try_new(parts.num, parts.den).map_err(de::Error::custom)
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Ratio::one()
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display as Indonesian Rupiah with dot thousands separators.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Rp {}", sign, grouped)
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

impl std::iter::Sum for Money {
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
    fn test_display() {
        assert_eq!(Money::from_rupiah(0).to_string(), "Rp 0");
        assert_eq!(Money::from_rupiah(999).to_string(), "Rp 999");
        assert_eq!(Money::from_rupiah(1_000).to_string(), "Rp 1.000");
        assert_eq!(Money::from_rupiah(1_234_567).to_string(), "Rp 1.234.567");
        assert_eq!(Money::from_rupiah(-205_333).to_string(), "-Rp 205.333");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_rupiah(1_000);
        let b = Money::from_rupiah(400);

        assert_eq!((a + b).rupiah(), 1_400);
        assert_eq!((a - b).rupiah(), 600);
        assert_eq!((a * 3).rupiah(), 3_000);
        assert_eq!((-a).rupiah(), -1_000);
        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.rupiah(), 1_800);
    }

    #[test]
    fn test_dpp_ratio_rounds_down_below_half() {
        // 200000 × 11/12 = 183333.33…
        let dpp = Money::from_rupiah(200_000).mul_ratio_round(Ratio::new(11, 12));
        assert_eq!(dpp.rupiah(), 183_333);
    }

    #[test]
    fn test_vat_ratio_rounds_up_above_half() {
        // 183333 × 12/100 = 21999.96
        let vat = Money::from_rupiah(183_333).mul_ratio_round(Ratio::percent(12));
        assert_eq!(vat.rupiah(), 22_000);
    }

    #[test]
    fn test_half_rounds_toward_positive_infinity() {
        let half = Ratio::new(1, 2);
        assert_eq!(Money::from_rupiah(1).mul_ratio_round(half).rupiah(), 1); // 0.5
        assert_eq!(Money::from_rupiah(3).mul_ratio_round(half).rupiah(), 2); // 1.5
        assert_eq!(Money::from_rupiah(-1).mul_ratio_round(half).rupiah(), 0); // -0.5
        assert_eq!(Money::from_rupiah(-3).mul_ratio_round(half).rupiah(), -1); // -1.5
        assert_eq!(Money::from_rupiah(-5).mul_ratio_round(Ratio::new(1, 4)).rupiah(), -1); // -1.25
    }

    #[test]
    fn test_checked_ratio_overflow() {
        let huge = Money::from_rupiah(i64::MAX);
        assert!(huge.checked_mul_ratio_round(Ratio::new(2, 1), "test").is_err());
        assert!(huge.checked_mul_ratio_round(Ratio::one(), "test").is_ok());
    }

    #[test]
    fn test_ratio_validation() {
        assert!(Ratio::try_new(11, 12).is_ok());
        assert!(Ratio::try_new(1, 0).is_err());
        assert!(Ratio::try_new(1, -3).is_err());
        assert_eq!(Ratio::new(11, 12).to_string(), "11/12");
    }

    #[test]
    fn test_zero_denominator_does_not_panic() {
        let broken = Ratio::new(11, 0);
        let amount = Money::from_rupiah(200_000);

        assert_eq!(amount.mul_ratio_round(broken), Money::zero());
        let err = amount.checked_mul_ratio_round(broken, "dpp").unwrap_err();
        assert!(matches!(err, CoreError::InvalidRatio { num: 11, den: 0 }));
    }

    #[test]
    fn test_deserialize_rejects_bad_denominator() {
        let ratio: Ratio = serde_json::from_str(r#"{"num":11,"den":12}"#).unwrap();
        assert_eq!(ratio, Ratio::new(11, 12));

        assert!(serde_json::from_str::<Ratio>(r#"{"num":11,"den":0}"#).is_err());
        assert!(serde_json::from_str::<Ratio>(r#"{"num":1,"den":-4}"#).is_err());
    }
}
