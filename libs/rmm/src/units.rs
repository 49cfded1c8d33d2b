//! Token amounts at native decimal precision
//!
//! A [`Wei`] is a raw integer amount tagged with the number of decimals of the
//! token it belongs to (18 for WETH-like tokens, 6 for USDC-like tokens).
//!
//! ## Critical Rules
//!
//! 1. **Explicit rescaling**: arithmetic between amounts of different precision
//!    is a [`RmmError::PrecisionMismatch`], never an implicit conversion
//! 2. **Truncation**: every conversion into raw units truncates toward zero
//!
//! ```rust
//! use rmm::{Wei, dec};
//!
//! let weth = Wei::from_decimal(dec!(1.5), 18).unwrap();
//! let usdc = Wei::from_decimal(dec!(5), 6).unwrap();
//!
//! assert!(weth.checked_add(usdc).is_err());
//! assert_eq!(usdc.rescale(18).unwrap().raw(), 5_000_000_000_000_000_000);
//! ```

use crate::error::{Result, RmmError};
use crate::fixed_point::{FixedPointX64, FRACTIONAL_BITS};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Precision of liquidity amounts and of most ERC-20 style tokens
pub const DEFAULT_DECIMALS: u8 = 18;

/// Highest supported token precision
pub const MAX_DECIMALS: u8 = 18;

/// Amount in the smallest unit of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wei {
    raw: i128,
    decimals: u8,
}

impl Wei {
    pub fn new(raw: i128, decimals: u8) -> Result<Self> {
        ensure_supported(decimals)?;
        Ok(Self { raw, decimals })
    }

    pub fn zero(decimals: u8) -> Self {
        Self { raw: 0, decimals }
    }

    /// Convert a human-readable amount, dropping digits beyond `decimals`
    pub fn from_decimal(value: Decimal, decimals: u8) -> Result<Self> {
        ensure_supported(decimals)?;
        let scale = value.scale();
        let target = u32::from(decimals);

        // Integer rescale of the mantissa; the digits dropped are exactly the
        // ones beyond `decimals`
        let raw = if target >= scale {
            value.mantissa().checked_mul(10i128.pow(target - scale))
        } else {
            Some(value.mantissa() / 10i128.pow(scale - target))
        }
        .ok_or_else(|| RmmError::Overflow(format!("{} at {} decimals", value, decimals)))?;

        Self::new(raw, decimals)
    }

    /// Convert a 64.64 value, truncating toward zero
    pub fn from_fixed(value: FixedPointX64, decimals: u8) -> Result<Self> {
        ensure_supported(decimals)?;
        let scale = pow10(decimals).unsigned_abs();
        let magnitude = value.raw().unsigned_abs();

        let whole = magnitude >> FRACTIONAL_BITS;
        let fraction = magnitude & ((1u128 << FRACTIONAL_BITS) - 1);

        // fraction < 2^64 and scale <= 10^18 < 2^60, so this product cannot wrap
        let raw = whole
            .checked_mul(scale)
            .and_then(|w| w.checked_add((fraction * scale) >> FRACTIONAL_BITS))
            .and_then(|m| i128::try_from(m).ok())
            .ok_or_else(|| {
                RmmError::Overflow(format!("{} at {} decimals", value, decimals))
            })?;

        Self::new(if value.is_negative() { -raw } else { raw }, decimals)
    }

    pub fn from_f64(value: f64, decimals: u8) -> Result<Self> {
        Self::from_fixed(FixedPointX64::from_f64(value)?, decimals)
    }

    pub fn raw(&self) -> i128 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    pub fn is_negative(&self) -> bool {
        self.raw < 0
    }

    pub fn to_decimal(&self) -> Result<Decimal> {
        Decimal::try_from_i128_with_scale(self.raw, self.decimals as u32)
            .map_err(|e| RmmError::Overflow(e.to_string()))
    }

    pub fn to_fixed(&self) -> Result<FixedPointX64> {
        FixedPointX64::from_ratio(self.raw, pow10(self.decimals))
    }

    /// Lossy conversion for analytics and curve evaluation
    pub fn to_f64(&self) -> f64 {
        self.raw as f64 / 10f64.powi(self.decimals as i32)
    }

    /// Amount per unit of `liquidity`, in 64.64
    pub fn per_liquidity(&self, liquidity: &Wei) -> Result<FixedPointX64> {
        self.to_fixed()?.checked_div(liquidity.to_fixed()?)
    }

    pub fn checked_add(self, other: Wei) -> Result<Self> {
        self.ensure_same_precision(&other)?;
        self.raw
            .checked_add(other.raw)
            .map(|raw| Self { raw, ..self })
            .ok_or_else(|| RmmError::Overflow(format!("{} + {}", self, other)))
    }

    pub fn checked_sub(self, other: Wei) -> Result<Self> {
        self.ensure_same_precision(&other)?;
        self.raw
            .checked_sub(other.raw)
            .map(|raw| Self { raw, ..self })
            .ok_or_else(|| RmmError::Overflow(format!("{} - {}", self, other)))
    }

    /// Compare two amounts of the same precision
    pub fn checked_cmp(&self, other: &Wei) -> Result<Ordering> {
        self.ensure_same_precision(other)?;
        Ok(self.raw.cmp(&other.raw))
    }

    /// Change precision explicitly; scaling down truncates toward zero
    pub fn rescale(self, decimals: u8) -> Result<Self> {
        ensure_supported(decimals)?;
        match decimals.cmp(&self.decimals) {
            Ordering::Equal => Ok(self),
            Ordering::Greater => {
                let factor = pow10(decimals - self.decimals);
                let raw = self.raw.checked_mul(factor).ok_or_else(|| {
                    RmmError::Overflow(format!("{} rescaled to {} decimals", self, decimals))
                })?;
                Self::new(raw, decimals)
            }
            Ordering::Less => Self::new(self.raw / pow10(self.decimals - decimals), decimals),
        }
    }

    fn ensure_same_precision(&self, other: &Wei) -> Result<()> {
        if self.decimals != other.decimals {
            return Err(RmmError::PrecisionMismatch {
                left: self.decimals,
                right: other.decimals,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Ok(value) => write!(f, "{}", value),
            Err(_) => write!(f, "{}e-{}", self.raw, self.decimals),
        }
    }
}

fn ensure_supported(decimals: u8) -> Result<()> {
    if decimals > MAX_DECIMALS {
        return Err(RmmError::UnsupportedPrecision {
            decimals,
            max: MAX_DECIMALS,
        });
    }
    Ok(())
}

fn pow10(decimals: u8) -> i128 {
    10i128.pow(decimals as u32)
}
