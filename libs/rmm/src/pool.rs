//! Replicating pool state and swap simulation
//!
//! A [`Pool`] owns one [`Calibration`] and one [`Reserve`]. Every swap has a
//! mutating form and a `virtual_*` form that returns the would-be state
//! without touching the pool, so pricing searches can run against snapshots.
//!
//! Curve evaluation happens per unit of liquidity in `f64`; reserves,
//! amounts and the invariant are carried as [`Wei`] and [`FixedPointX64`],
//! truncating at every conversion so rounding favours the pool.

use crate::calibration::{Calibration, PoolState, PERCENTAGE};
use crate::error::{Result, RmmError};
use crate::fixed_point::FixedPointX64;
use crate::replication_math::{CurveParams, ReplicationMath};
use crate::units::{Wei, DEFAULT_DECIMALS};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, error};

/// Largest output reduction, per unit of strike and liquidity, spent on
/// absorbing floating point error before a swap is rejected
pub const INVARIANT_TOLERANCE: f64 = 1e-9;

/// First settlement step as a right shift of the quoted output
const SETTLEMENT_STEP_SHIFT: u32 = 40;

/// Mutable pool reserves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reserve {
    pub risky: Wei,
    pub stable: Wei,
    /// Total liquidity claims, 18 decimals
    pub liquidity: Wei,
    /// Invariant per unit of liquidity
    pub invariant: FixedPointX64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDirection {
    RiskyIn,
    StableIn,
}

/// Outcome of a swap simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapResult {
    pub direction: SwapDirection,
    pub delta_in: Wei,
    pub delta_out: Wei,
    /// Input counted toward the curve after the fee
    pub fee_adjusted_input: Wei,
    /// Reserves after the swap
    pub reserve: Reserve,
    /// Received amount per paid amount; zero for an empty swap
    pub effective_price: FixedPointX64,
    pub invariant_before: FixedPointX64,
    pub invariant_after: FixedPointX64,
}

/// One calibrated replication curve and its reserves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    calibration: Calibration,
    reserve: Reserve,
}

impl Pool {
    /// Build a pool from observed reserves, deriving the invariant
    pub fn from_reserves(
        calibration: Calibration,
        risky: Wei,
        stable: Wei,
        liquidity: Wei,
    ) -> Result<Self> {
        ensure_decimals(&risky, calibration.decimals_risky())?;
        ensure_decimals(&stable, calibration.decimals_stable())?;
        ensure_decimals(&liquidity, DEFAULT_DECIMALS)?;

        if liquidity.raw() <= 0 {
            return Err(RmmError::InvalidReserves(format!(
                "liquidity must be positive, got {}",
                liquidity
            )));
        }
        if risky.is_negative() || stable.is_negative() {
            return Err(RmmError::InvalidReserves(format!(
                "reserves must be non-negative, got {} risky and {} stable",
                risky, stable
            )));
        }

        let invariant = compute_invariant(&calibration, &risky, &stable, &liquidity)?;
        debug!(
            risky = %risky,
            stable = %stable,
            liquidity = %liquidity,
            invariant = %invariant,
            "Pool created from reserves"
        );

        Ok(Self {
            calibration,
            reserve: Reserve {
                risky,
                stable,
                liquidity,
                invariant,
            },
        })
    }

    /// Build a pool from a risky reserve per unit of liquidity, placing the
    /// stable reserve on the curve with a zero invariant
    pub fn initialize(
        calibration: Calibration,
        risky_per_liquidity: Decimal,
        liquidity: Wei,
    ) -> Result<Self> {
        ensure_decimals(&liquidity, DEFAULT_DECIMALS)?;
        let liquidity_fixed = liquidity.to_fixed()?;

        let risky = Wei::from_fixed(
            FixedPointX64::from_decimal(risky_per_liquidity)?.checked_mul(liquidity_fixed)?,
            calibration.decimals_risky(),
        )?;

        // The curve is evaluated at the risky amount actually held
        let stable_per_liquidity = ReplicationMath::trading_function(
            0.0,
            risky.per_liquidity(&liquidity)?.to_f64(),
            1.0,
            &calibration.curve(),
        )?;
        let target = FixedPointX64::from_f64(stable_per_liquidity)?.checked_mul(liquidity_fixed)?;

        // Round the stable reserve up so truncation never leaves it below the curve
        let mut stable = Wei::from_fixed(target, calibration.decimals_stable())?;
        if stable.to_fixed()? < target {
            stable = stable.checked_add(Wei::new(1, calibration.decimals_stable())?)?;
        }

        Self::from_reserves(calibration, risky, stable, liquidity)
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn reserve(&self) -> &Reserve {
        &self.reserve
    }

    pub fn invariant(&self) -> FixedPointX64 {
        self.reserve.invariant
    }

    pub fn state(&self) -> PoolState {
        self.calibration.state()
    }

    pub fn tau(&self) -> f64 {
        self.calibration.tau()
    }

    /// Advance the pool clock and re-derive the invariant at the new `tau`
    pub fn advance_time(&mut self, timestamp: u64) -> Result<()> {
        self.calibration.advance_to(timestamp)?;
        self.reserve.invariant = compute_invariant(
            &self.calibration,
            &self.reserve.risky,
            &self.reserve.stable,
            &self.reserve.liquidity,
        )?;
        debug!(
            timestamp,
            tau = self.calibration.tau(),
            invariant = %self.reserve.invariant,
            "Pool clock advanced"
        );
        Ok(())
    }

    /// Sell `delta_in` risky for stable, committing the new reserves
    pub fn swap_amount_in_risky(&mut self, delta_in: Wei) -> Result<SwapResult> {
        let result = self.virtual_swap_amount_in_risky(delta_in)?;
        self.reserve = result.reserve;
        Ok(result)
    }

    /// Buy risky with `delta_in` stable, committing the new reserves
    pub fn swap_amount_in_stable(&mut self, delta_in: Wei) -> Result<SwapResult> {
        let result = self.virtual_swap_amount_in_stable(delta_in)?;
        self.reserve = result.reserve;
        Ok(result)
    }

    /// Simulate selling `delta_in` risky without mutating the pool
    pub fn virtual_swap_amount_in_risky(&self, delta_in: Wei) -> Result<SwapResult> {
        self.ensure_tradeable()?;
        ensure_decimals(&delta_in, self.calibration.decimals_risky())?;
        ensure_non_negative(&delta_in)?;
        if delta_in.checked_cmp(&self.max_risky_in()?)? == Ordering::Greater {
            return Err(RmmError::InvalidReserves(format!(
                "risky input {} exceeds capacity {}",
                delta_in,
                self.max_risky_in()?
            )));
        }
        if delta_in.is_zero() {
            return self.finish_swap(
                SwapDirection::RiskyIn,
                delta_in,
                Wei::zero(self.calibration.decimals_stable()),
                delta_in,
            );
        }

        let reserve = &self.reserve;
        let liquidity = reserve.liquidity.to_fixed()?;
        let fee_adjusted = self.apply_fee(&delta_in)?;

        let risky_per_liquidity = reserve
            .risky
            .checked_add(fee_adjusted)?
            .per_liquidity(&reserve.liquidity)?;
        let stable_per_liquidity = ReplicationMath::trading_function(
            reserve.invariant.to_f64(),
            risky_per_liquidity.to_f64(),
            1.0,
            &self.curve(),
        )?;
        let next_stable = FixedPointX64::from_f64(stable_per_liquidity)?.checked_mul(liquidity)?;

        let delta_out = output_amount(
            reserve.stable.to_fixed()?.checked_sub(next_stable)?,
            self.calibration.decimals_stable(),
        )?;
        self.finish_swap(SwapDirection::RiskyIn, delta_in, delta_out, fee_adjusted)
    }

    /// Simulate buying risky with `delta_in` stable without mutating the pool
    pub fn virtual_swap_amount_in_stable(&self, delta_in: Wei) -> Result<SwapResult> {
        self.ensure_tradeable()?;
        ensure_decimals(&delta_in, self.calibration.decimals_stable())?;
        ensure_non_negative(&delta_in)?;
        if delta_in.checked_cmp(&self.max_stable_in()?)? == Ordering::Greater {
            return Err(RmmError::InvalidReserves(format!(
                "stable input {} exceeds capacity {}",
                delta_in,
                self.max_stable_in()?
            )));
        }
        if delta_in.is_zero() {
            return self.finish_swap(
                SwapDirection::StableIn,
                delta_in,
                Wei::zero(self.calibration.decimals_risky()),
                delta_in,
            );
        }

        let reserve = &self.reserve;
        let liquidity = reserve.liquidity.to_fixed()?;
        let fee_adjusted = self.apply_fee(&delta_in)?;

        let stable_per_liquidity = reserve
            .stable
            .checked_add(fee_adjusted)?
            .per_liquidity(&reserve.liquidity)?;
        let risky_per_liquidity = ReplicationMath::solve_risky_given_stable(
            reserve.invariant.to_f64(),
            stable_per_liquidity.to_f64(),
            1.0,
            &self.curve(),
        )?;
        let next_risky = FixedPointX64::from_f64(risky_per_liquidity)?.checked_mul(liquidity)?;

        let delta_out = output_amount(
            reserve.risky.to_fixed()?.checked_sub(next_risky)?,
            self.calibration.decimals_risky(),
        )?;
        self.finish_swap(SwapDirection::StableIn, delta_in, delta_out, fee_adjusted)
    }

    /// Fee-less marginal price of risky in stable
    pub fn spot_price(&self) -> Result<f64> {
        ReplicationMath::spot_price(
            self.reserve.risky.to_f64(),
            self.reserve.liquidity.to_f64(),
            &self.curve(),
        )
    }

    /// Marginal stable received per risky after `amount_in` risky (token
    /// units) has been sold; 0 for negative amounts
    pub fn marginal_price_swap_risky_in(&self, amount_in: f64) -> Result<f64> {
        ReplicationMath::marginal_price_swap_risky_in(
            amount_in,
            self.reserve.risky.to_f64(),
            self.reserve.liquidity.to_f64(),
            &self.curve(),
            self.calibration.gamma_f64(),
        )
    }

    /// Marginal stable paid per risky after `amount_in` stable (token units)
    /// has been spent; 0 for negative amounts
    pub fn marginal_price_swap_stable_in(&self, amount_in: f64) -> Result<f64> {
        ReplicationMath::marginal_price_swap_stable_in(
            amount_in,
            self.reserve.invariant.to_f64(),
            self.reserve.stable.to_f64(),
            self.reserve.liquidity.to_f64(),
            &self.curve(),
            self.calibration.gamma_f64(),
        )
    }

    /// Largest risky input keeping the risky reserve within liquidity and
    /// the stable reserve non-negative
    pub fn max_risky_in(&self) -> Result<Wei> {
        let liquidity = self.reserve.liquidity.to_fixed()?;
        let decimals = self.calibration.decimals_risky();
        let ceiling = Wei::from_fixed(liquidity, decimals)?;
        let capacity = clamp_zero(ceiling.checked_sub(self.reserve.risky)?)?;

        // A negative invariant empties the stable side before the risky
        // reserve reaches liquidity
        let invariant = self.reserve.invariant.to_f64();
        if invariant >= 0.0 {
            return Ok(capacity);
        }
        let floor = ReplicationMath::solve_risky_given_stable(invariant, 0.0, 1.0, &self.curve())?;
        let floor_risky = Wei::from_fixed(
            FixedPointX64::from_f64(floor * (1.0 - INVARIANT_TOLERANCE))?.checked_mul(liquidity)?,
            decimals,
        )?;

        // Only the fee-adjusted share of the input moves along the curve
        let gamma = self.gamma()?;
        let room = clamp_zero(floor_risky.checked_sub(self.reserve.risky)?)?;
        let room = Wei::from_fixed(room.to_fixed()?.checked_div(gamma)?, decimals)?;

        debug!(
            floor = %floor_risky,
            room = %room,
            capacity = %capacity,
            "Risky capacity bounded by empty stable reserve"
        );
        Ok(match room.checked_cmp(&capacity)? {
            Ordering::Less => room,
            _ => capacity,
        })
    }

    /// Largest stable input keeping the stable reserve within `(K + k) · L`
    pub fn max_stable_in(&self) -> Result<Wei> {
        let per_liquidity = self
            .calibration
            .strike()
            .to_fixed()?
            .checked_add(self.reserve.invariant)?;
        let capacity = Wei::from_fixed(
            per_liquidity.checked_mul(self.reserve.liquidity.to_fixed()?)?,
            self.calibration.decimals_stable(),
        )?;
        clamp_zero(capacity.checked_sub(self.reserve.stable)?)
    }

    pub fn max_risky_out(&self) -> Wei {
        self.reserve.risky
    }

    pub fn max_stable_out(&self) -> Wei {
        self.reserve.stable
    }

    fn curve(&self) -> CurveParams {
        self.calibration.curve()
    }

    fn ensure_tradeable(&self) -> Result<()> {
        if self.calibration.is_past_grace() {
            return Err(RmmError::PoolExpired {
                maturity: self.calibration.maturity(),
                timestamp: self.calibration.last_timestamp(),
            });
        }
        Ok(())
    }

    fn gamma(&self) -> Result<FixedPointX64> {
        FixedPointX64::from_ratio(self.calibration.gamma() as i128, PERCENTAGE as i128)
    }

    fn apply_fee(&self, delta_in: &Wei) -> Result<Wei> {
        Wei::from_fixed(
            delta_in.to_fixed()?.checked_mul(self.gamma()?)?,
            delta_in.decimals(),
        )
    }

    /// Reserves after paying `delta_in` and receiving `delta_out`
    fn next_reserve(
        &self,
        direction: SwapDirection,
        delta_in: Wei,
        delta_out: Wei,
    ) -> Result<Reserve> {
        let reserve = &self.reserve;
        Ok(match direction {
            SwapDirection::RiskyIn => Reserve {
                risky: reserve.risky.checked_add(delta_in)?,
                stable: reserve.stable.checked_sub(delta_out)?,
                ..*reserve
            },
            SwapDirection::StableIn => Reserve {
                risky: reserve.risky.checked_sub(delta_out)?,
                stable: reserve.stable.checked_add(delta_in)?,
                ..*reserve
            },
        })
    }

    /// Step the quoted output down until the invariant of the new reserves
    /// is no lower than before
    ///
    /// Steps start at a fraction of the quote and double. Reducing the output
    /// by more than [`INVARIANT_TOLERANCE`] per unit of strike and liquidity
    /// is an [`RmmError::InvariantViolation`]. A swap paying nothing only
    /// adds to the reserves, so its invariant is kept at least at the
    /// previous value.
    fn settle_output(
        &self,
        direction: SwapDirection,
        delta_in: Wei,
        quoted: Wei,
    ) -> Result<(Wei, Reserve)> {
        let before = self.reserve.invariant;
        let budget = Wei::from_f64(
            INVARIANT_TOLERANCE
                * self.calibration.strike().to_f64().max(1.0)
                * self.reserve.liquidity.to_f64(),
            quoted.decimals(),
        )?;

        let mut delta_out = quoted;
        let mut step = (quoted.raw() >> SETTLEMENT_STEP_SHIFT).max(1);
        loop {
            let mut next = self.next_reserve(direction, delta_in, delta_out)?;
            let after =
                compute_invariant(&self.calibration, &next.risky, &next.stable, &next.liquidity)?;

            if after >= before || delta_out.is_zero() {
                next.invariant = after.max(before);
                if delta_out != quoted {
                    debug!(
                        quoted = %quoted,
                        settled = %delta_out,
                        "Swap output reduced to hold the invariant"
                    );
                }
                return Ok((delta_out, next));
            }

            let reduced = Wei::new((delta_out.raw() - step).max(0), quoted.decimals())?;
            if quoted.raw() - reduced.raw() > budget.raw() {
                let (before, after) = (before.to_f64(), after.to_f64());
                error!(before, after, quoted = %quoted, "🚨 Invariant decreased across a swap");
                return Err(RmmError::InvariantViolation { before, after });
            }
            delta_out = reduced;
            step = step.saturating_mul(2);
        }
    }

    fn finish_swap(
        &self,
        direction: SwapDirection,
        delta_in: Wei,
        quoted_out: Wei,
        fee_adjusted_input: Wei,
    ) -> Result<SwapResult> {
        let available = match direction {
            SwapDirection::RiskyIn => self.max_stable_out(),
            SwapDirection::StableIn => self.max_risky_out(),
        };
        if quoted_out.checked_cmp(&available)? == Ordering::Greater {
            return Err(RmmError::InvalidReserves(format!(
                "output {} exceeds reserve {}",
                quoted_out, available
            )));
        }

        let invariant_before = self.reserve.invariant;
        let (delta_out, next) = self.settle_output(direction, delta_in, quoted_out)?;
        self.check_reserves(&next)?;
        let invariant_after = next.invariant;

        let effective_price = if delta_in.is_zero() {
            FixedPointX64::ZERO
        } else {
            let ratio = delta_out
                .to_decimal()?
                .checked_div(delta_in.to_decimal()?)
                .ok_or(RmmError::DivisionByZero)?;
            FixedPointX64::from_decimal(ratio)?
        };

        debug!(
            ?direction,
            delta_in = %delta_in,
            delta_out = %delta_out,
            invariant_before = %invariant_before,
            invariant_after = %invariant_after,
            "Swap simulated"
        );

        Ok(SwapResult {
            direction,
            delta_in,
            delta_out,
            fee_adjusted_input,
            reserve: next,
            effective_price,
            invariant_before,
            invariant_after,
        })
    }

    /// Risky within `[0, L]` and stable non-negative
    fn check_reserves(&self, next: &Reserve) -> Result<()> {
        let risky_ceiling = Wei::from_fixed(
            next.liquidity.to_fixed()?,
            self.calibration.decimals_risky(),
        )?;
        if next.risky.is_negative()
            || next.stable.is_negative()
            || next.risky.checked_cmp(&risky_ceiling)? == Ordering::Greater
        {
            error!(
                risky = %next.risky,
                stable = %next.stable,
                liquidity = %next.liquidity,
                "🚨 Swap would leave reserves outside the curve domain"
            );
            return Err(RmmError::InvalidReserves(format!(
                "reserves {} risky and {} stable outside the curve domain for liquidity {}",
                next.risky, next.stable, next.liquidity
            )));
        }
        Ok(())
    }
}

fn compute_invariant(
    calibration: &Calibration,
    risky: &Wei,
    stable: &Wei,
    liquidity: &Wei,
) -> Result<FixedPointX64> {
    let invariant = ReplicationMath::calc_invariant(
        risky.per_liquidity(liquidity)?.to_f64(),
        stable.per_liquidity(liquidity)?.to_f64(),
        1.0,
        &calibration.curve(),
    )?;
    FixedPointX64::from_f64(invariant)
}

/// Truncated payout; numerical noise never turns into a negative output
fn output_amount(delta: FixedPointX64, decimals: u8) -> Result<Wei> {
    if delta.is_negative() {
        return Ok(Wei::zero(decimals));
    }
    Wei::from_fixed(delta, decimals)
}

fn clamp_zero(amount: Wei) -> Result<Wei> {
    if amount.is_negative() {
        return Ok(Wei::zero(amount.decimals()));
    }
    Ok(amount)
}

fn ensure_decimals(amount: &Wei, expected: u8) -> Result<()> {
    if amount.decimals() != expected {
        return Err(RmmError::PrecisionMismatch {
            left: amount.decimals(),
            right: expected,
        });
    }
    Ok(())
}

fn ensure_non_negative(amount: &Wei) -> Result<()> {
    if amount.is_negative() {
        return Err(RmmError::NegativeAmount(format!(
            "swap input {} is negative",
            amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{BUFFER, SECONDS_PER_YEAR};
    use rust_decimal_macros::dec;

    fn calibration() -> Calibration {
        Calibration::new(
            Wei::from_decimal(dec!(10), 18).unwrap(),
            PERCENTAGE,
            SECONDS_PER_YEAR,
            0,
            9_985,
            18,
            18,
        )
        .unwrap()
    }

    fn reference_pool() -> Pool {
        Pool::from_reserves(
            calibration(),
            Wei::from_decimal(dec!(0.308537538726), 18).unwrap(),
            Wei::from_decimal(dec!(3.08537538726), 18).unwrap(),
            Wei::from_decimal(dec!(1), 18).unwrap(),
        )
        .unwrap()
    }

    fn initialized_pool() -> Pool {
        Pool::initialize(
            calibration(),
            dec!(0.308537538726),
            Wei::from_decimal(dec!(1), 18).unwrap(),
        )
        .unwrap()
    }

    fn no_fee_pool() -> Pool {
        let calibration = Calibration::new(
            Wei::from_decimal(dec!(10), 18).unwrap(),
            PERCENTAGE,
            SECONDS_PER_YEAR,
            0,
            PERCENTAGE,
            18,
            18,
        )
        .unwrap();
        Pool::initialize(
            calibration,
            dec!(0.308537538726),
            Wei::from_decimal(dec!(1), 18).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_initialize_places_reserves_on_curve() {
        let pool = Pool::initialize(
            calibration(),
            dec!(0.3085375387),
            Wei::from_decimal(dec!(1), 18).unwrap(),
        )
        .unwrap();

        assert!((pool.reserve().stable.to_f64() - 3.0853753).abs() < 1e-6);
        assert!(pool.invariant().to_f64().abs() < 1e-12);
    }

    #[test]
    fn test_initialize_uses_truncated_risky_amount() {
        let calibration = Calibration::new(
            Wei::from_decimal(dec!(2000), 6).unwrap(),
            PERCENTAGE,
            SECONDS_PER_YEAR,
            0,
            9_985,
            6,
            6,
        )
        .unwrap();
        let pool = Pool::initialize(
            calibration,
            dec!(0.3085375387),
            Wei::from_decimal(dec!(1), 18).unwrap(),
        )
        .unwrap();

        assert_eq!(pool.reserve().risky.raw(), 308_537);
        // Rounding the stable reserve up keeps the pool at or just above the
        // curve, within one stable unit
        let invariant = pool.invariant().to_f64();
        assert!(invariant > -1e-12, "invariant {}", invariant);
        assert!(invariant < 2e-6, "invariant {}", invariant);
    }

    #[test]
    fn test_swap_risky_in_reference_values() {
        let mut pool = reference_pool();
        let result = pool
            .swap_amount_in_risky(Wei::from_decimal(dec!(0.1), 18).unwrap())
            .unwrap();

        let delta_out = result.delta_out.to_f64();
        assert!((delta_out - 0.873845983593).abs() / 0.873845983593 < 0.01);
        assert!((result.reserve.risky.to_f64() - 0.408537538726).abs() < 1e-12);
        assert!((result.reserve.stable.to_f64() - 2.21038261359).abs() / 2.21038261359 < 0.01);
        assert!(result.invariant_after >= result.invariant_before);
        assert_eq!(pool.reserve(), &result.reserve);
        assert!((result.effective_price.to_f64() - delta_out / 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_virtual_swap_leaves_pool_untouched() {
        let pool = reference_pool();
        let before = pool.clone();

        let result = pool
            .virtual_swap_amount_in_stable(Wei::from_decimal(dec!(1), 18).unwrap())
            .unwrap();

        assert_eq!(pool, before);
        assert!(result.delta_out.raw() > 0);
        assert!(result.invariant_after >= result.invariant_before);
    }

    #[test]
    fn test_swap_stable_in_grows_invariant_by_fee() {
        let mut pool = reference_pool();
        let result = pool
            .swap_amount_in_stable(Wei::from_decimal(dec!(2), 18).unwrap())
            .unwrap();

        // The fee share of the input stays in the pool as invariant
        let growth = result.invariant_after.to_f64() - result.invariant_before.to_f64();
        assert!((growth - 2.0 * 0.0015).abs() < 1e-6);
        assert!((result.delta_out.to_f64() - 0.154827347).abs() < 1e-6);
    }

    #[test]
    fn test_negative_and_mismatched_inputs() {
        let mut pool = reference_pool();
        assert!(matches!(
            pool.swap_amount_in_risky(Wei::new(-1, 18).unwrap()),
            Err(RmmError::NegativeAmount(_))
        ));
        assert!(matches!(
            pool.swap_amount_in_stable(Wei::new(1, 6).unwrap()),
            Err(RmmError::PrecisionMismatch { left: 6, right: 18 })
        ));
    }

    #[test]
    fn test_swap_beyond_capacity_rejected() {
        let pool = reference_pool();
        let too_much = pool
            .max_risky_in()
            .unwrap()
            .checked_add(Wei::new(1, 18).unwrap())
            .unwrap();
        assert!(matches!(
            pool.virtual_swap_amount_in_risky(too_much),
            Err(RmmError::InvalidReserves(_))
        ));
    }

    #[test]
    fn test_zero_swap_is_a_no_op() {
        let pool = reference_pool();
        let result = pool.virtual_swap_amount_in_risky(Wei::zero(18)).unwrap();
        assert!(result.delta_out.is_zero());
        assert_eq!(result.effective_price, FixedPointX64::ZERO);
    }

    #[test]
    fn test_zero_input_pays_nothing_in_either_direction() {
        let mut decayed = reference_pool();
        decayed.advance_time(SECONDS_PER_YEAR / 2).unwrap();
        let mut near_expiry = initialized_pool();
        near_expiry.advance_time(SECONDS_PER_YEAR - 86_400).unwrap();

        for pool in [reference_pool(), initialized_pool(), no_fee_pool(), decayed, near_expiry] {
            for result in [
                pool.virtual_swap_amount_in_risky(Wei::zero(18)).unwrap(),
                pool.virtual_swap_amount_in_stable(Wei::zero(18)).unwrap(),
            ] {
                assert!(result.delta_out.is_zero(), "paid {} for nothing", result.delta_out);
                assert_eq!(&result.reserve, pool.reserve());
                assert_eq!(result.invariant_after, result.invariant_before);
            }
        }
    }

    #[test]
    fn test_swaps_without_fee_never_lower_invariant() {
        let pool = no_fee_pool();
        for amount in [dec!(0.000000001), dec!(0.001), dec!(0.05), dec!(0.3), dec!(0.6)] {
            let risky_in = pool
                .virtual_swap_amount_in_risky(Wei::from_decimal(amount, 18).unwrap())
                .unwrap();
            assert!(risky_in.invariant_after >= risky_in.invariant_before);
            assert_eq!(risky_in.reserve.invariant, risky_in.invariant_after);

            let stable_in = pool
                .virtual_swap_amount_in_stable(Wei::from_decimal(amount * dec!(10), 18).unwrap())
                .unwrap();
            assert!(stable_in.invariant_after >= stable_in.invariant_before);
        }

        let large = pool
            .virtual_swap_amount_in_risky(Wei::from_decimal(dec!(0.3), 18).unwrap())
            .unwrap();
        assert!(large.delta_out.to_f64() > 1.0);
    }

    #[test]
    fn test_output_beyond_reserve_rejected() {
        let pool = reference_pool();
        let delta_in = Wei::from_decimal(dec!(0.1), 18).unwrap();
        let too_much = pool
            .max_stable_out()
            .checked_add(Wei::new(1, 18).unwrap())
            .unwrap();

        assert!(matches!(
            pool.finish_swap(SwapDirection::RiskyIn, delta_in, too_much, delta_in),
            Err(RmmError::InvalidReserves(_))
        ));
    }

    #[test]
    fn test_decayed_pool_keeps_stable_reserve_non_negative() {
        let mut pool = initialized_pool();
        pool.advance_time(SECONDS_PER_YEAR - 86_400).unwrap();
        assert!(pool.invariant().to_f64() < -3.0);

        // The stable reserve empties near 0.616 risky per liquidity, well
        // before the risky reserve reaches liquidity
        let max_in = pool.max_risky_in().unwrap();
        assert!((max_in.to_f64() - (0.616 - 0.3085) / 0.9985).abs() < 0.01);

        let before = pool.clone();
        assert!(matches!(
            pool.swap_amount_in_risky(Wei::from_decimal(dec!(0.69), 18).unwrap()),
            Err(RmmError::InvalidReserves(_))
        ));
        assert_eq!(pool, before);

        let near_max = Wei::new(max_in.raw() / 100 * 99, 18).unwrap();
        let result = pool.swap_amount_in_risky(near_max).unwrap();
        assert!(!result.reserve.stable.is_negative());
        assert!(result.delta_out.to_f64() <= before.reserve().stable.to_f64());
        assert!(result.invariant_after >= result.invariant_before);

        let result = pool.swap_amount_in_risky(pool.max_risky_in().unwrap()).unwrap();
        assert!(!result.reserve.stable.is_negative());
    }

    #[test]
    fn test_bounds() {
        let pool = reference_pool();
        assert!((pool.max_risky_in().unwrap().to_f64() - (1.0 - 0.308537538726)).abs() < 1e-12);
        assert!((pool.max_stable_in().unwrap().to_f64() - (10.0 - 3.08537538726)).abs() < 1e-6);
        assert_eq!(pool.max_risky_out(), pool.reserve().risky);
    }

    #[test]
    fn test_prices() {
        let pool = reference_pool();
        let spot = pool.spot_price().unwrap();
        assert!((spot - 10.0).abs() < 1e-4);
        assert!(pool.marginal_price_swap_risky_in(0.0).unwrap() < spot);
        assert!(pool.marginal_price_swap_stable_in(0.0).unwrap() > spot);
        assert_eq!(pool.marginal_price_swap_risky_in(-0.5).unwrap(), 0.0);
    }

    #[test]
    fn test_expiry_lifecycle() {
        let mut pool = reference_pool();
        let amount = Wei::from_decimal(dec!(0.01), 18).unwrap();

        pool.advance_time(SECONDS_PER_YEAR).unwrap();
        assert_eq!(pool.state(), PoolState::Expired);

        // Within the grace window the degenerate curve pays out at most dust
        let result = pool.swap_amount_in_risky(amount).unwrap();
        assert!(result.delta_out.to_f64() < 1e-12);

        pool.advance_time(SECONDS_PER_YEAR + BUFFER + 1).unwrap();
        assert!(matches!(
            pool.swap_amount_in_risky(amount),
            Err(RmmError::PoolExpired { .. })
        ));
        assert!(matches!(
            pool.advance_time(0),
            Err(RmmError::TimestampRegression { .. })
        ));
    }

    #[test]
    fn test_time_decay_rederives_invariant() {
        let mut pool = reference_pool();
        let before = pool.invariant();
        pool.advance_time(SECONDS_PER_YEAR / 2).unwrap();

        // Lower σ√τ lifts the curve, so the same reserves sit further below it
        assert!(pool.invariant() < before);
    }
}
