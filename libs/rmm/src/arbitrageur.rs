//! Reference-price arbitrage against a replicating pool
//!
//! Compares the pool's marginal sell and buy prices with an external
//! reference, bisects for the trade size that moves the marginal price onto
//! the reference, and executes only when the simulated trade is profitable.

use crate::calibration::PoolState;
use crate::error::{Result, RmmError};
use crate::fixed_point::FixedPointX64;
use crate::pool::{Pool, SwapResult};
use crate::units::Wei;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Search parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrageConfig {
    /// Minimum gap between a marginal price and the reference before trading
    pub price_tolerance: f64,
    /// Distance kept from the ends of the input range, per unit of liquidity
    pub boundary_epsilon: f64,
    /// Bracket width at which bisection stops, per unit of liquidity
    pub bracket_tolerance: f64,
    /// Hard cap on bisection steps
    pub max_iterations: u32,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            price_tolerance: 1e-8,
            boundary_epsilon: 1e-8,
            bracket_tolerance: 1e-3,
            max_iterations: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArbitrageDirection {
    /// Pool pays more than the reference for risky: swap risky in
    SellRisky,
    /// Pool asks less than the reference for risky: swap stable in
    BuyRisky,
}

/// Candidate trade found by the search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub direction: ArbitrageDirection,
    pub amount_in: Wei,
    pub amount_out: Wei,
    /// Realized profit in stable units, valued at the reference price
    pub profit: f64,
    pub iterations: u32,
    /// Simulated swap backing the opportunity
    pub swap: SwapResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArbitrageOutcome {
    /// Marginal prices already within tolerance of the reference
    NoOpportunity,
    /// A trade size was found but would not make money
    Unprofitable(ArbitrageOpportunity),
    /// The trade was committed to the pool
    Executed(ArbitrageOpportunity),
}

impl ArbitrageOutcome {
    pub fn executed(&self) -> Option<&ArbitrageOpportunity> {
        match self {
            ArbitrageOutcome::Executed(opportunity) => Some(opportunity),
            _ => None,
        }
    }
}

/// Result of a bisection search
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bisection {
    root: f64,
    iterations: u32,
}

pub struct Arbitrageur {
    config: ArbitrageConfig,
}

impl Arbitrageur {
    pub fn new(config: ArbitrageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArbitrageConfig {
        &self.config
    }

    /// Find the profit-maximizing trade without touching the pool
    ///
    /// Returns `None` when the pool's marginal prices already bracket the
    /// reference price, the pool has expired, or the best trade rounds to
    /// nothing in token units.
    pub fn find_opportunity(
        &self,
        reference_price: f64,
        pool: &Pool,
    ) -> Result<Option<ArbitrageOpportunity>> {
        if pool.state() == PoolState::Expired {
            warn!("Skipping arbitrage on expired pool");
            return Ok(None);
        }

        let sell_price = pool.marginal_price_swap_risky_in(0.0)?;
        let buy_price = pool.marginal_price_swap_stable_in(0.0)?;
        debug!(sell_price, buy_price, reference_price, "Comparing marginal prices");

        if sell_price > reference_price + self.config.price_tolerance {
            self.sell_risky(reference_price, pool)
        } else if buy_price < reference_price - self.config.price_tolerance {
            self.buy_risky(reference_price, pool)
        } else {
            Ok(None)
        }
    }

    /// Find the best trade and commit it when its profit is strictly positive
    pub fn arbitrage_exactly(
        &self,
        reference_price: f64,
        pool: &mut Pool,
    ) -> Result<ArbitrageOutcome> {
        let opportunity = match self.find_opportunity(reference_price, pool)? {
            Some(opportunity) => opportunity,
            None => return Ok(ArbitrageOutcome::NoOpportunity),
        };

        if opportunity.profit <= 0.0 {
            debug!(profit = opportunity.profit, "Arbitrage trade not profitable");
            return Ok(ArbitrageOutcome::Unprofitable(opportunity));
        }

        match opportunity.direction {
            ArbitrageDirection::SellRisky => pool.swap_amount_in_risky(opportunity.amount_in)?,
            ArbitrageDirection::BuyRisky => pool.swap_amount_in_stable(opportunity.amount_in)?,
        };

        info!(
            direction = ?opportunity.direction,
            amount_in = %opportunity.amount_in,
            amount_out = %opportunity.amount_out,
            profit = opportunity.profit,
            "💰 Arbitrage executed"
        );
        Ok(ArbitrageOutcome::Executed(opportunity))
    }

    fn sell_risky(
        &self,
        reference_price: f64,
        pool: &Pool,
    ) -> Result<Option<ArbitrageOpportunity>> {
        let liquidity = pool.reserve().liquidity.to_f64();
        let max_in = pool.max_risky_in()?.to_f64() / liquidity;

        let search = self.search(max_in, |amount| {
            Ok(pool.marginal_price_swap_risky_in(amount * liquidity)? - reference_price)
        })?;

        let amount_in = scale_by_liquidity(
            search.root,
            pool,
            pool.calibration().decimals_risky(),
        )?;
        if amount_in.is_zero() {
            debug!(root = search.root, "Sell size rounds to zero risky units");
            return Ok(None);
        }
        let swap = pool.virtual_swap_amount_in_risky(amount_in)?;
        let profit = swap.delta_out.to_f64() - amount_in.to_f64() * reference_price;

        Ok(Some(ArbitrageOpportunity {
            direction: ArbitrageDirection::SellRisky,
            amount_in,
            amount_out: swap.delta_out,
            profit,
            iterations: search.iterations,
            swap,
        }))
    }

    fn buy_risky(
        &self,
        reference_price: f64,
        pool: &Pool,
    ) -> Result<Option<ArbitrageOpportunity>> {
        let liquidity = pool.reserve().liquidity.to_f64();
        let max_in = pool.max_stable_in()?.to_f64() / liquidity;

        let search = self.search(max_in, |amount| {
            Ok(pool.marginal_price_swap_stable_in(amount * liquidity)? - reference_price)
        })?;

        let amount_in = scale_by_liquidity(
            search.root,
            pool,
            pool.calibration().decimals_stable(),
        )?;
        if amount_in.is_zero() {
            debug!(root = search.root, "Buy size rounds to zero stable units");
            return Ok(None);
        }
        let swap = pool.virtual_swap_amount_in_stable(amount_in)?;
        let profit = swap.delta_out.to_f64() * reference_price - amount_in.to_f64();

        Ok(Some(ArbitrageOpportunity {
            direction: ArbitrageDirection::BuyRisky,
            amount_in,
            amount_out: swap.delta_out,
            profit,
            iterations: search.iterations,
            swap,
        }))
    }

    /// Search `[ε, max_in − ε]` for the root of `objective`
    fn search<F>(&self, max_in: f64, objective: F) -> Result<Bisection>
    where
        F: Fn(f64) -> Result<f64>,
    {
        let lower = self.config.boundary_epsilon;
        let upper = max_in - self.config.boundary_epsilon;
        if upper <= lower {
            return Ok(Bisection {
                root: 0.0,
                iterations: 0,
            });
        }
        self.bisect(objective, lower, upper)
    }

    /// Bisection that returns the bracket end which has not crossed the root
    ///
    /// Without a sign change across the interval the search is skipped and
    /// the upper bound is used.
    fn bisect<F>(&self, objective: F, mut lower: f64, mut upper: f64) -> Result<Bisection>
    where
        F: Fn(f64) -> Result<f64>,
    {
        let mut lower_value = objective(lower)?;
        let upper_value = objective(upper)?;

        if lower_value * upper_value > 0.0 {
            debug!(lower, upper, "Objective does not change sign, using upper bound");
            return Ok(Bisection {
                root: upper,
                iterations: 0,
            });
        }

        let mut iterations = 0;
        while upper - lower > self.config.bracket_tolerance {
            if iterations >= self.config.max_iterations {
                return Err(RmmError::NoConvergence { iterations });
            }
            iterations += 1;

            let mid = (lower + upper) / 2.0;
            let mid_value = objective(mid)?;
            if mid_value == 0.0 {
                return Ok(Bisection {
                    root: mid,
                    iterations,
                });
            }
            if mid_value.is_sign_negative() == lower_value.is_sign_negative() {
                lower = mid;
                lower_value = mid_value;
            } else {
                upper = mid;
            }
        }

        Ok(Bisection {
            root: lower,
            iterations,
        })
    }
}

impl Default for Arbitrageur {
    fn default() -> Self {
        Self::new(ArbitrageConfig::default())
    }
}

/// Per-liquidity amount to token units, truncated
fn scale_by_liquidity(amount: f64, pool: &Pool, decimals: u8) -> Result<Wei> {
    let liquidity = pool.reserve().liquidity.to_fixed()?;
    Wei::from_fixed(
        FixedPointX64::from_f64(amount)?.checked_mul(liquidity)?,
        decimals,
    )
}
