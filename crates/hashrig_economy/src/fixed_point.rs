//! # Fixed-Point Arithmetic
//!
//! **NO FLOATING POINT IN BALANCES**
//!
//! Real-currency amounts (deposits, trade prices, withdrawals) are stored as
//! `FixedPoint`: a `u64` holding the value scaled by 10^8, i.e. exactly eight
//! fractional digits, the precision the payment provider reports.
//!
//! ## Why Fixed-Point?
//!
//! - Deterministic: Same calculation = same result on all hardware
//! - No rounding errors: 0.1 + 0.2 == 0.3 (unlike IEEE 754 floats)
//! - Non-negative by construction: a balance can never be driven below zero
//!   without an explicit checked subtraction failing first
//!
//! ## Wire format
//!
//! Serialized as a decimal string (`"5.00000000"`). Deserialization accepts
//! either a decimal string or a JSON number, because the payment provider and
//! browser clients send both.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EconomyError, EconomyResult};

/// Number of decimal places.
pub const DECIMAL_PLACES: u32 = 8;

/// The multiplier for 8 decimal places.
const MULTIPLIER: u64 = 10u64.pow(DECIMAL_PLACES);

/// Fixed-point decimal number with 8 decimal places.
///
/// Internally stores value * 100,000,000 as a u64.
///
/// # Range
///
/// - Minimum: 0.00000000
/// - Maximum: 184,467,440,737.09551615
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct FixedPoint(u64);

impl FixedPoint {
    /// Zero value.
    pub const ZERO: Self = Self(0);

    /// One unit (1.00000000).
    pub const ONE: Self = Self(MULTIPLIER);

    /// Maximum representable value.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a fixed-point number from a whole number.
    ///
    /// Saturates at [`FixedPoint::MAX`].
    #[inline]
    #[must_use]
    pub const fn from_whole(whole: u64) -> Self {
        Self(whole.saturating_mul(MULTIPLIER))
    }

    /// Creates a fixed-point number from parts.
    ///
    /// # Arguments
    ///
    /// * `whole` - The whole number part
    /// * `decimal` - The fractional part in units of 10^-8 (0-99999999)
    ///
    /// # Example
    ///
    /// ```rust
    /// use hashrig_economy::FixedPoint;
    ///
    /// let value = FixedPoint::from_parts(7, 50_000_000); // 7.5
    /// assert_eq!(value.to_string(), "7.50000000");
    /// ```
    #[inline]
    #[must_use]
    pub const fn from_parts(whole: u64, decimal: u64) -> Self {
        Self(whole * MULTIPLIER + (decimal % MULTIPLIER))
    }

    /// Creates a fixed-point number from raw internal value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw internal value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns the whole number part (the value floored to an integer).
    #[inline]
    #[must_use]
    pub const fn whole(self) -> u64 {
        self.0 / MULTIPLIER
    }

    /// Returns the fractional part (0-99999999).
    #[inline]
    #[must_use]
    pub const fn decimal(self) -> u64 {
        self.0 % MULTIPLIER
    }

    /// Checked addition. Returns `None` on overflow.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked subtraction. Returns `None` on underflow.
    #[inline]
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked multiplication by an integer.
    #[inline]
    #[must_use]
    pub const fn checked_mul_int(self, rhs: u64) -> Option<Self> {
        match self.0.checked_mul(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Multiplies by basis points (10000 = 100%), rounding down.
    ///
    /// Saturates at [`FixedPoint::MAX`].
    #[inline]
    #[must_use]
    pub const fn mul_bp(self, basis_points: u32) -> Self {
        let result = (self.0 as u128 * basis_points as u128) / 10_000;
        if result > u64::MAX as u128 {
            Self::MAX
        } else {
            Self(result as u64)
        }
    }

    /// Saturating addition.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Returns true if this value is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Safe addition with error on overflow.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ArithmeticOverflow` if the addition would overflow.
    #[inline]
    pub fn safe_add(self, rhs: Self) -> EconomyResult<Self> {
        self.checked_add(rhs).ok_or(EconomyError::ArithmeticOverflow)
    }

    /// Safe subtraction with error on underflow.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::ArithmeticOverflow` if the subtraction would underflow.
    #[inline]
    pub fn safe_sub(self, rhs: Self) -> EconomyResult<Self> {
        self.checked_sub(rhs).ok_or(EconomyError::ArithmeticOverflow)
    }
}

impl Add for FixedPoint {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for FixedPoint {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for FixedPoint {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for FixedPoint {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl fmt::Debug for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedPoint({}.{:08})", self.whole(), self.decimal())
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.whole(), self.decimal())
    }
}

impl FromStr for FixedPoint {
    type Err = EconomyError;

    /// Parses a non-negative decimal string.
    ///
    /// Digits beyond the eighth fractional place are truncated. Signs,
    /// exponents and empty input are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EconomyError::InvalidAmount(s.to_string());
        let trimmed = s.trim();

        let (whole_str, frac_str) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };

        if whole_str.is_empty() && frac_str.is_empty() {
            return Err(invalid());
        }
        if !whole_str.bytes().all(|b| b.is_ascii_digit())
            || !frac_str.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: u64 = if whole_str.is_empty() {
            0
        } else {
            whole_str.parse().map_err(|_| invalid())?
        };

        let mut decimal = 0u64;
        let mut scale = MULTIPLIER;
        for digit in frac_str.bytes().take(DECIMAL_PLACES as usize) {
            scale /= 10;
            decimal += u64::from(digit - b'0') * scale;
        }

        whole
            .checked_mul(MULTIPLIER)
            .and_then(|w| w.checked_add(decimal))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl Serialize for FixedPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct FixedPointVisitor;

impl Visitor<'_> for FixedPointVisitor {
    type Value = FixedPoint;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        v.checked_mul(MULTIPLIER)
            .map(FixedPoint)
            .ok_or_else(|| E::custom(EconomyError::ArithmeticOverflow))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        let v = u64::try_from(v).map_err(|_| E::custom(EconomyError::InvalidAmount(v.to_string())))?;
        self.visit_u64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if !v.is_finite() || v < 0.0 {
            return Err(E::custom(EconomyError::InvalidAmount(v.to_string())));
        }
        // Round through the decimal rendering so 0.1 arrives as 0.10000000.
        format!("{v:.8}").parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for FixedPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FixedPointVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_whole() {
        let value = FixedPoint::from_whole(100);
        assert_eq!(value.whole(), 100);
        assert_eq!(value.decimal(), 0);
    }

    #[test]
    fn test_from_parts() {
        let value = FixedPoint::from_parts(3, 14_159_265);
        assert_eq!(value.whole(), 3);
        assert_eq!(value.decimal(), 14_159_265);
    }

    #[test]
    fn test_decimal_addition_is_exact() {
        let a: FixedPoint = "0.1".parse().unwrap();
        let b: FixedPoint = "0.2".parse().unwrap();
        assert_eq!(a + b, "0.3".parse().unwrap());
    }

    #[test]
    fn test_checked_sub_underflow() {
        assert!(FixedPoint::ZERO.checked_sub(FixedPoint::ONE).is_none());
        assert_eq!(
            FixedPoint::ZERO.safe_sub(FixedPoint::ONE),
            Err(EconomyError::ArithmeticOverflow)
        );
    }

    #[test]
    fn test_checked_add_overflow() {
        assert!(FixedPoint::MAX.checked_add(FixedPoint::ONE).is_none());
    }

    #[test]
    fn test_mul_bp() {
        let value = FixedPoint::from_whole(1000);
        assert_eq!(value.mul_bp(500), FixedPoint::from_whole(50));
    }

    #[test]
    fn test_display() {
        let value = FixedPoint::from_parts(42, 12_345_678);
        assert_eq!(format!("{value}"), "42.12345678");
        assert_eq!(FixedPoint::ZERO.to_string(), "0.00000000");
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!("5".parse::<FixedPoint>().unwrap(), FixedPoint::from_whole(5));
        assert_eq!(".5".parse::<FixedPoint>().unwrap(), FixedPoint::from_parts(0, 50_000_000));
        assert_eq!(" 7.5 ".parse::<FixedPoint>().unwrap(), FixedPoint::from_parts(7, 50_000_000));
        // Ninth digit is truncated.
        assert_eq!(
            "0.123456789".parse::<FixedPoint>().unwrap(),
            FixedPoint::from_raw(12_345_678)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", ".", "-1", "1e5", "abc", "1.2.3", "+3"] {
            assert!(bad.parse::<FixedPoint>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_serde_accepts_numbers_and_strings() {
        let from_str: FixedPoint = serde_json::from_str("\"7.5\"").unwrap();
        let from_float: FixedPoint = serde_json::from_str("7.5").unwrap();
        let from_int: FixedPoint = serde_json::from_str("7").unwrap();
        assert_eq!(from_str, FixedPoint::from_parts(7, 50_000_000));
        assert_eq!(from_float, from_str);
        assert_eq!(from_int, FixedPoint::from_whole(7));
        assert!(serde_json::from_str::<FixedPoint>("-1").is_err());

        let json = serde_json::to_string(&FixedPoint::from_whole(5)).unwrap();
        assert_eq!(json, "\"5.00000000\"");
    }
}
