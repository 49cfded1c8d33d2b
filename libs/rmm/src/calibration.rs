//! Per-pool calibration and lifecycle
//!
//! A [`Calibration`] is fixed at pool creation. Only `last_timestamp` moves,
//! and only forward, as the external clock advances.

use crate::error::{Result, RmmError};
use crate::replication_math::CurveParams;
use crate::units::Wei;
use serde::{Deserialize, Serialize};

/// Scale of `sigma` and `gamma`: 10_000 = 100%
pub const PERCENTAGE: u32 = 10_000;

/// Seconds in a Julian-Gregorian year of 365.2425 days
pub const SECONDS_PER_YEAR: u64 = 31_556_952;

/// Grace window after maturity during which swaps are still accepted
pub const BUFFER: u64 = 120;

/// Highest accepted volatility (1000%)
pub const MAX_SIGMA: u32 = 10_000_000;

/// Lowest accepted gamma (a 10% fee)
pub const MIN_GAMMA: u32 = 9_000;

/// Supported token precision range
pub const MIN_TOKEN_DECIMALS: u8 = 6;
pub const MAX_TOKEN_DECIMALS: u8 = 18;

/// Pool lifecycle state, derived from the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolState {
    /// `tau > 0`
    Active,
    /// `tau == 0`; swaps are accepted until `maturity + BUFFER`
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calibration {
    strike: Wei,
    sigma: u32,
    maturity: u64,
    last_timestamp: u64,
    gamma: u32,
    decimals_risky: u8,
    decimals_stable: u8,
}

impl Calibration {
    /// # Arguments
    /// * `strike` - Strike price in stable token decimals
    /// * `sigma` - Implied volatility, 10_000 = 100%
    /// * `maturity` - Maturity timestamp in seconds
    /// * `last_timestamp` - Reference timestamp, not after `maturity`
    /// * `gamma` - `1 - fee`, 10_000 = 100%
    pub fn new(
        strike: Wei,
        sigma: u32,
        maturity: u64,
        last_timestamp: u64,
        gamma: u32,
        decimals_risky: u8,
        decimals_stable: u8,
    ) -> Result<Self> {
        for decimals in [decimals_risky, decimals_stable] {
            if !(MIN_TOKEN_DECIMALS..=MAX_TOKEN_DECIMALS).contains(&decimals) {
                return Err(RmmError::InvalidCalibration(format!(
                    "token decimals {} outside {}..={}",
                    decimals, MIN_TOKEN_DECIMALS, MAX_TOKEN_DECIMALS
                )));
            }
        }
        if strike.decimals() != decimals_stable {
            return Err(RmmError::PrecisionMismatch {
                left: strike.decimals(),
                right: decimals_stable,
            });
        }
        if strike.raw() <= 0 {
            return Err(RmmError::InvalidCalibration(format!(
                "strike must be positive, got {}",
                strike
            )));
        }
        if sigma == 0 || sigma > MAX_SIGMA {
            return Err(RmmError::InvalidCalibration(format!(
                "sigma {} outside 1..={}",
                sigma, MAX_SIGMA
            )));
        }
        if !(MIN_GAMMA..=PERCENTAGE).contains(&gamma) {
            return Err(RmmError::InvalidCalibration(format!(
                "gamma {} outside {}..={}",
                gamma, MIN_GAMMA, PERCENTAGE
            )));
        }
        if last_timestamp > maturity {
            return Err(RmmError::InvalidCalibration(format!(
                "last timestamp {} after maturity {}",
                last_timestamp, maturity
            )));
        }

        Ok(Self {
            strike,
            sigma,
            maturity,
            last_timestamp,
            gamma,
            decimals_risky,
            decimals_stable,
        })
    }

    pub fn strike(&self) -> Wei {
        self.strike
    }

    pub fn sigma(&self) -> u32 {
        self.sigma
    }

    pub fn maturity(&self) -> u64 {
        self.maturity
    }

    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    pub fn gamma(&self) -> u32 {
        self.gamma
    }

    pub fn decimals_risky(&self) -> u8 {
        self.decimals_risky
    }

    pub fn decimals_stable(&self) -> u8 {
        self.decimals_stable
    }

    /// Seconds until maturity, saturating at zero
    pub fn tau_seconds(&self) -> u64 {
        self.maturity.saturating_sub(self.last_timestamp)
    }

    /// Years until maturity
    pub fn tau(&self) -> f64 {
        self.tau_seconds() as f64 / SECONDS_PER_YEAR as f64
    }

    pub fn sigma_f64(&self) -> f64 {
        self.sigma as f64 / PERCENTAGE as f64
    }

    pub fn gamma_f64(&self) -> f64 {
        self.gamma as f64 / PERCENTAGE as f64
    }

    pub fn fee(&self) -> f64 {
        (PERCENTAGE - self.gamma) as f64 / PERCENTAGE as f64
    }

    pub fn curve(&self) -> CurveParams {
        CurveParams::new(self.strike.to_f64(), self.sigma_f64(), self.tau())
    }

    pub fn state(&self) -> PoolState {
        if self.tau_seconds() > 0 {
            PoolState::Active
        } else {
            PoolState::Expired
        }
    }

    /// Whether the clock is past `maturity + BUFFER`
    pub fn is_past_grace(&self) -> bool {
        self.last_timestamp > self.maturity.saturating_add(BUFFER)
    }

    /// Move the reference timestamp forward
    pub(crate) fn advance_to(&mut self, timestamp: u64) -> Result<()> {
        if timestamp < self.last_timestamp {
            return Err(RmmError::TimestampRegression {
                last: self.last_timestamp,
                requested: timestamp,
            });
        }
        self.last_timestamp = timestamp;
        Ok(())
    }
}
