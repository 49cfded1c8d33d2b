//! Signed 64.64 fixed-point arithmetic
//!
//! Mirrors the on-chain 64.64 format: an `i128` whose low 64 bits hold the
//! fractional part. Every conversion, multiplication and division truncates
//! toward zero, matching integer-division semantics on the ledger side.

use crate::error::{Result, RmmError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fractional bits in the representation
pub const FRACTIONAL_BITS: u32 = 64;

/// Decimal digits preserved by [`FixedPointX64::to_decimal`]
pub const DEFAULT_DECIMAL_PRECISION: u32 = 9;

/// Largest precision accepted by [`FixedPointX64::to_decimal_with_precision`]
pub const MAX_DECIMAL_PRECISION: u32 = 18;

const ONE_RAW: i128 = 1 << FRACTIONAL_BITS;
const FRACTION_MASK: u128 = (1u128 << FRACTIONAL_BITS) - 1;
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;
const TWO_POW_127: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

/// Signed fixed-point number with 64 fractional bits
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FixedPointX64(i128);

impl FixedPointX64 {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(ONE_RAW);

    /// Wrap a raw 64.64 numerator
    pub const fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    /// Raw 64.64 numerator
    pub const fn raw(self) -> i128 {
        self.0
    }

    pub fn from_int(value: i64) -> Self {
        Self((value as i128) << FRACTIONAL_BITS)
    }

    /// Encode `numerator / denominator` exactly, truncating toward zero
    pub fn from_ratio(numerator: i128, denominator: i128) -> Result<Self> {
        if denominator == 0 {
            return Err(RmmError::DivisionByZero);
        }
        let negative = (numerator < 0) != (denominator < 0);
        let magnitude = div_x64(numerator.unsigned_abs(), denominator.unsigned_abs())?;
        Self::from_magnitude(magnitude, negative)
    }

    /// Encode a decimal value, truncating bits beyond 2^-64 toward zero
    pub fn from_decimal(value: Decimal) -> Result<Self> {
        // mantissa / 10^scale with scale <= 28, so the divisor fits in i128
        let denominator = 10i128.pow(value.scale());
        Self::from_ratio(value.mantissa(), denominator)
    }

    /// Encode a float, truncating toward zero
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(RmmError::Overflow(format!("{} is not finite", value)));
        }
        let scaled = (value * TWO_POW_64).trunc();
        if scaled.abs() >= TWO_POW_127 {
            return Err(RmmError::Overflow(format!("{} exceeds the 64.64 range", value)));
        }
        Ok(Self(scaled as i128))
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / TWO_POW_64
    }

    /// Decode to a decimal keeping [`DEFAULT_DECIMAL_PRECISION`] digits
    pub fn to_decimal(self) -> Result<Decimal> {
        self.to_decimal_with_precision(DEFAULT_DECIMAL_PRECISION)
    }

    /// Decode to a decimal keeping `digits` fractional digits; further digits
    /// are truncated, not rounded. Precision is capped at [`MAX_DECIMAL_PRECISION`].
    pub fn to_decimal_with_precision(self, digits: u32) -> Result<Decimal> {
        let digits = digits.min(MAX_DECIMAL_PRECISION);
        let scale = 10u128.pow(digits);
        let magnitude = self.0.unsigned_abs();

        let whole = magnitude >> FRACTIONAL_BITS;
        let fraction_digits = ((magnitude & FRACTION_MASK) * scale) >> FRACTIONAL_BITS;

        let mantissa = whole
            .checked_mul(scale)
            .and_then(|m| m.checked_add(fraction_digits))
            .and_then(|m| i128::try_from(m).ok())
            .ok_or_else(|| RmmError::Overflow(format!("{:#x} not representable as Decimal", self.0)))?;
        let signed = if self.0 < 0 { -mantissa } else { mantissa };

        Decimal::try_from_i128_with_scale(signed, digits)
            .map_err(|e| RmmError::Overflow(e.to_string()))
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| RmmError::Overflow(format!("{} + {}", self, rhs)))
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or_else(|| RmmError::Overflow(format!("{} - {}", self, rhs)))
    }

    pub fn checked_mul(self, rhs: Self) -> Result<Self> {
        let negative = (self.0 < 0) != (rhs.0 < 0);
        let magnitude = mul_x64(self.0.unsigned_abs(), rhs.0.unsigned_abs())?;
        Self::from_magnitude(magnitude, negative)
    }

    /// Truncating division. Dividing by zero is an error rather than a
    /// saturating zero.
    pub fn checked_div(self, rhs: Self) -> Result<Self> {
        if rhs.0 == 0 {
            return Err(RmmError::DivisionByZero);
        }
        let negative = (self.0 < 0) != (rhs.0 < 0);
        let magnitude = div_x64(self.0.unsigned_abs(), rhs.0.unsigned_abs())?;
        Self::from_magnitude(magnitude, negative)
    }

    pub fn abs(self) -> Result<Self> {
        self.0
            .checked_abs()
            .map(Self)
            .ok_or_else(|| RmmError::Overflow("abs of minimum value".to_string()))
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    fn from_magnitude(magnitude: u128, negative: bool) -> Result<Self> {
        if negative {
            if magnitude > i128::MIN.unsigned_abs() {
                return Err(RmmError::Overflow("negative result out of range".to_string()));
            }
            Ok(Self(0u128.wrapping_sub(magnitude) as i128))
        } else {
            i128::try_from(magnitude)
                .map(Self)
                .map_err(|_| RmmError::Overflow("positive result out of range".to_string()))
        }
    }
}

impl fmt::Display for FixedPointX64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Ok(value) => write!(f, "{}", value),
            Err(_) => write!(f, "{}", self.to_f64()),
        }
    }
}

/// `(numerator << 64) / denominator` on magnitudes, via restoring long division
fn div_x64(numerator: u128, denominator: u128) -> Result<u128> {
    let quotient = numerator / denominator;
    if quotient >> FRACTIONAL_BITS != 0 {
        return Err(RmmError::Overflow(format!(
            "{} / {} exceeds the 64.64 range",
            numerator, denominator
        )));
    }

    // remainder < denominator <= 2^127, so doubling never wraps
    let mut remainder = numerator % denominator;
    let mut fraction = 0u128;
    for _ in 0..FRACTIONAL_BITS {
        remainder <<= 1;
        fraction <<= 1;
        if remainder >= denominator {
            remainder -= denominator;
            fraction |= 1;
        }
    }

    Ok((quotient << FRACTIONAL_BITS) | fraction)
}

/// `(a * b) >> 64` on magnitudes, split into 64-bit limbs
fn mul_x64(a: u128, b: u128) -> Result<u128> {
    let overflow = || RmmError::Overflow(format!("{} * {} exceeds the 64.64 range", a, b));

    let (a_hi, a_lo) = (a >> FRACTIONAL_BITS, a & FRACTION_MASK);
    let (b_hi, b_lo) = (b >> FRACTIONAL_BITS, b & FRACTION_MASK);

    let hi_hi = a_hi * b_hi;
    if hi_hi >> FRACTIONAL_BITS != 0 {
        return Err(overflow());
    }

    (hi_hi << FRACTIONAL_BITS)
        .checked_add(a_hi * b_lo)
        .and_then(|sum| sum.checked_add(a_lo * b_hi))
        .and_then(|sum| sum.checked_add((a_lo * b_lo) >> FRACTIONAL_BITS))
        .ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_ratio_truncates_toward_zero() {
        // 1/3 is not representable; the last bit must be dropped, not rounded up
        let third = FixedPointX64::from_ratio(1, 3).unwrap();
        assert_eq!(third.raw(), 0x5555_5555_5555_5555);

        let negative_third = FixedPointX64::from_ratio(-1, 3).unwrap();
        assert_eq!(negative_third.raw(), -0x5555_5555_5555_5555);
    }

    #[test]
    fn test_from_ratio_division_by_zero() {
        assert_eq!(
            FixedPointX64::from_ratio(1, 0),
            Err(RmmError::DivisionByZero)
        );
    }

    #[test]
    fn test_decimal_conversion() {
        let value = FixedPointX64::from_decimal(dec!(3.0853753872)).unwrap();
        assert_eq!(value.to_decimal().unwrap(), dec!(3.085375387));

        let negative = FixedPointX64::from_decimal(dec!(-0.5)).unwrap();
        assert_eq!(negative.raw(), -(1i128 << 63));
        assert_eq!(negative.to_decimal().unwrap(), dec!(-0.5));
    }

    #[test]
    fn test_from_decimal_never_rounds_up() {
        // 28 fractional digits: the exact product with 2^64 needs more than
        // 96 mantissa bits and sits just below 2^64
        let below_one = FixedPointX64::from_decimal(dec!(0.9999999999999999999999999999)).unwrap();
        assert_eq!(below_one.raw(), ONE_RAW - 1);

        let below_minus_one =
            FixedPointX64::from_decimal(dec!(-0.9999999999999999999999999999)).unwrap();
        assert_eq!(below_minus_one.raw(), -(ONE_RAW - 1));

        let large = FixedPointX64::from_decimal(dec!(123456789.123456789)).unwrap();
        assert_eq!(large.to_decimal().unwrap(), dec!(123456789.123456789));
    }

    #[test]
    fn test_to_decimal_truncates_extra_digits() {
        let two_thirds = FixedPointX64::from_ratio(2, 3).unwrap();
        assert_eq!(two_thirds.to_decimal().unwrap(), dec!(0.666666666));
        assert_eq!(
            two_thirds.to_decimal_with_precision(4).unwrap(),
            dec!(0.6666)
        );
    }

    #[test]
    fn test_f64_overflow() {
        assert!(matches!(
            FixedPointX64::from_f64(1e40),
            Err(RmmError::Overflow(_))
        ));
        assert!(matches!(
            FixedPointX64::from_f64(f64::NAN),
            Err(RmmError::Overflow(_))
        ));
    }

    #[test]
    fn test_mul_div() {
        let a = FixedPointX64::from_decimal(dec!(1.5)).unwrap();
        let b = FixedPointX64::from_int(-4);

        assert_eq!(a.checked_mul(b).unwrap(), FixedPointX64::from_int(-6));
        assert_eq!(
            b.checked_div(a).unwrap(),
            FixedPointX64::from_ratio(-8, 3).unwrap()
        );
        assert_eq!(
            a.checked_div(FixedPointX64::ZERO),
            Err(RmmError::DivisionByZero)
        );
    }

    #[test]
    fn test_mul_overflow() {
        let big = FixedPointX64::from_int(i64::MAX);
        assert!(matches!(big.checked_mul(big), Err(RmmError::Overflow(_))));
    }

    #[test]
    fn test_add_sub() {
        let a = FixedPointX64::from_int(2);
        let b = FixedPointX64::from_decimal(dec!(0.25)).unwrap();
        assert_eq!(a.checked_sub(b).unwrap().to_f64(), 1.75);
        assert!(FixedPointX64::from_raw(i128::MAX)
            .checked_add(FixedPointX64::ONE)
            .is_err());
    }
}
