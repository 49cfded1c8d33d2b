//! Covered-call replication curve
//!
//! Closed-form relations between the two reserves of a replicating pool:
//!
//! ```text
//! y / L = K · Φ(Φ⁻¹(1 − x / L) − σ√τ) + k
//! ```
//!
//! where `x` is the risky reserve, `y` the stable reserve, `L` liquidity,
//! `K` the strike, `σ√τ` the proportional volatility and `k` the invariant
//! (expressed per unit of liquidity).

use crate::cumulative_normal::{cdf, inverse_cdf, pdf, quantile_density};
use crate::error::{Result, RmmError};
use serde::{Deserialize, Serialize};

/// Newton refinement steps for [`ReplicationMath::solve_risky_given_stable`]
const MAX_NEWTON_ITERATIONS: usize = 16;
const NEWTON_STEP_TOLERANCE: f64 = 1e-15;

/// Curve parameters in natural units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveParams {
    pub strike: f64,
    /// Implied volatility, 1.0 = 100%
    pub sigma: f64,
    /// Time to maturity in years
    pub tau: f64,
}

impl CurveParams {
    pub fn new(strike: f64, sigma: f64, tau: f64) -> Self {
        Self { strike, sigma, tau }
    }

    pub fn proportional_volatility(&self) -> f64 {
        ReplicationMath::proportional_volatility(self.sigma, self.tau)
    }
}

/// Replication curve math with no state
pub struct ReplicationMath;

impl ReplicationMath {
    /// `σ√τ`, or 0 once the pool has expired
    pub fn proportional_volatility(sigma: f64, tau: f64) -> f64 {
        if tau <= 0.0 {
            return 0.0;
        }
        sigma * tau.sqrt()
    }

    /// Stable reserve on the curve for a given risky reserve
    ///
    /// At zero proportional volatility the option premium vanishes and the
    /// stable reserve degenerates to the invariant offset.
    pub fn trading_function(
        invariant: f64,
        reserve_risky: f64,
        liquidity: f64,
        curve: &CurveParams,
    ) -> Result<f64> {
        let risky_per_liquidity = Self::ratio(reserve_risky, liquidity)?;
        let volatility = curve.proportional_volatility();

        if volatility <= 0.0 {
            return Ok(invariant * liquidity);
        }
        if risky_per_liquidity == 0.0 {
            return Ok((curve.strike + invariant) * liquidity);
        }
        if risky_per_liquidity == 1.0 {
            return Ok(invariant * liquidity);
        }

        let d = inverse_cdf(1.0 - risky_per_liquidity)?;
        Ok((curve.strike * cdf(d - volatility) + invariant) * liquidity)
    }

    /// Risky reserve on the curve for a given stable reserve, solved in
    /// closed form
    ///
    /// Composes one more approximation than [`Self::trading_function`], so its
    /// error is larger, especially near the ends of the reserve range. At zero
    /// proportional volatility the curve carries no risky information and the
    /// full risky capacity (`liquidity`) is returned.
    pub fn inverse_trading_function(
        invariant: f64,
        reserve_stable: f64,
        liquidity: f64,
        curve: &CurveParams,
    ) -> Result<f64> {
        if liquidity <= 0.0 {
            return Err(RmmError::InvalidReserves(format!(
                "liquidity must be positive, got {}",
                liquidity
            )));
        }
        let volatility = curve.proportional_volatility();
        if volatility <= 0.0 {
            return Ok(liquidity);
        }

        let stable_ratio = Self::stable_ratio(invariant, reserve_stable, liquidity, curve)?;
        if stable_ratio == 0.0 {
            return Ok(liquidity);
        }
        if stable_ratio == 1.0 {
            return Ok(0.0);
        }

        let d = inverse_cdf(stable_ratio)?;
        Ok((1.0 - cdf(d + volatility)) * liquidity)
    }

    /// Risky reserve for a given stable reserve, seeded with the closed-form
    /// inverse and refined with Newton's method against the forward curve
    ///
    /// The result is consistent with [`Self::trading_function`] to within
    /// floating point noise, which keeps the invariant from drifting down on
    /// stable-in swaps.
    pub fn solve_risky_given_stable(
        invariant: f64,
        reserve_stable: f64,
        liquidity: f64,
        curve: &CurveParams,
    ) -> Result<f64> {
        let seed = Self::inverse_trading_function(invariant, reserve_stable, liquidity, curve)?;
        let volatility = curve.proportional_volatility();
        if volatility <= 0.0 {
            return Ok(seed);
        }

        let target = reserve_stable / liquidity;
        let mut risky = seed / liquidity;

        for _ in 0..MAX_NEWTON_ITERATIONS {
            if risky <= 0.0 || risky >= 1.0 {
                break;
            }
            let d = inverse_cdf(1.0 - risky)?;
            let residual = curve.strike * cdf(d - volatility) + invariant - target;
            let slope = -curve.strike * pdf(d - volatility) * quantile_density(1.0 - risky)?;
            if slope == 0.0 || !slope.is_finite() {
                break;
            }

            let next = risky - residual / slope;
            if !(next > 0.0 && next < 1.0) {
                break;
            }
            let step = (next - risky).abs();
            risky = next;
            if step < NEWTON_STEP_TOLERANCE {
                break;
            }
        }

        Ok(risky * liquidity)
    }

    /// Invariant per unit of liquidity for a full reserve state
    pub fn calc_invariant(
        reserve_risky: f64,
        reserve_stable: f64,
        liquidity: f64,
        curve: &CurveParams,
    ) -> Result<f64> {
        let on_curve = Self::trading_function(0.0, reserve_risky, liquidity, curve)?;
        Ok((reserve_stable - on_curve) / liquidity)
    }

    /// Fee-less marginal price of the risky asset in stable units
    pub fn spot_price(reserve_risky: f64, liquidity: f64, curve: &CurveParams) -> Result<f64> {
        Self::marginal_price_swap_risky_in(0.0, reserve_risky, liquidity, curve, 1.0)
    }

    /// Stable received per marginal unit of risky sold after `amount_in`
    /// risky has already been swapped in
    ///
    /// Negative amounts are clamped to a price of 0.
    pub fn marginal_price_swap_risky_in(
        amount_in: f64,
        reserve_risky: f64,
        liquidity: f64,
        curve: &CurveParams,
        gamma: f64,
    ) -> Result<f64> {
        if amount_in < 0.0 {
            return Ok(0.0);
        }
        let risky_per_liquidity = Self::ratio(reserve_risky, liquidity)?;
        let z = 1.0 - risky_per_liquidity - gamma * amount_in / liquidity;
        let d = inverse_cdf(z)?;

        Ok(gamma * curve.strike * pdf(d - curve.proportional_volatility()) * quantile_density(z)?)
    }

    /// Stable paid per marginal unit of risky bought after `amount_in`
    /// stable has already been swapped in
    ///
    /// Negative amounts are clamped to a price of 0.
    pub fn marginal_price_swap_stable_in(
        amount_in: f64,
        invariant: f64,
        reserve_stable: f64,
        liquidity: f64,
        curve: &CurveParams,
        gamma: f64,
    ) -> Result<f64> {
        if amount_in < 0.0 {
            return Ok(0.0);
        }
        let z = Self::stable_ratio(
            invariant,
            reserve_stable + gamma * amount_in,
            liquidity,
            curve,
        )?;
        let d = inverse_cdf(z)?;

        let risky_out_per_stable_in =
            gamma * pdf(d + curve.proportional_volatility()) * quantile_density(z)? / curve.strike;
        if risky_out_per_stable_in <= 0.0 {
            return Err(RmmError::Domain {
                function: "marginal_price_swap_stable_in",
                value: z,
            });
        }
        Ok(1.0 / risky_out_per_stable_in)
    }

    /// `reserve_risky / liquidity`, required to lie in `[0, 1]`
    fn ratio(reserve_risky: f64, liquidity: f64) -> Result<f64> {
        if liquidity <= 0.0 {
            return Err(RmmError::InvalidReserves(format!(
                "liquidity must be positive, got {}",
                liquidity
            )));
        }
        let ratio = reserve_risky / liquidity;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(RmmError::InvalidReserves(format!(
                "risky per liquidity {} outside [0, 1]",
                ratio
            )));
        }
        Ok(ratio)
    }

    /// `(y / L − k) / K`, required to lie in `[0, 1]`
    fn stable_ratio(
        invariant: f64,
        reserve_stable: f64,
        liquidity: f64,
        curve: &CurveParams,
    ) -> Result<f64> {
        let ratio = (reserve_stable / liquidity - invariant) / curve.strike;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(RmmError::InvalidReserves(format!(
                "stable per liquidity {} outside [k, K + k]",
                reserve_stable / liquidity
            )));
        }
        Ok(ratio)
    }
}
