//! Arbitrage and time-decay loop over a reference price path
//!
//! Each step moves the pool clock to the price point's timestamp, lets the
//! arbitrageur trade the pool toward the reference price while the pool is
//! active, and records the resulting state.

use crate::price_path::PricePoint;
use anyhow::Context;
use rmm::{
    ArbitrageDirection, ArbitrageOutcome, Arbitrageur, Pool, PoolState, Result, RmmError, BUFFER,
};
use rmm_config::SimulationConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Pool state after one simulation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub step: usize,
    pub timestamp: u64,
    /// Years to maturity
    pub tau: f64,
    pub state: PoolState,
    pub reference_price: f64,
    /// `None` when the reserves sit on a boundary of the curve
    pub spot_price: Option<f64>,
    pub reserve_risky: f64,
    pub reserve_stable: f64,
    pub invariant: f64,
    pub arbitrage: Option<ArbitrageDirection>,
    pub amount_in: Option<f64>,
    pub amount_out: Option<f64>,
    pub profit: Option<f64>,
}

/// Aggregates over a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub steps: usize,
    pub trades: usize,
    pub sell_risky_trades: usize,
    pub buy_risky_trades: usize,
    pub total_profit: f64,
    pub initial_invariant: f64,
    pub final_invariant: f64,
    /// Mean `|spot - reference|` over steps with a defined spot price
    pub mean_price_gap: f64,
    pub max_price_gap: f64,
}

pub struct SimulationDriver {
    pool: Pool,
    arbitrageur: Arbitrageur,
}

impl SimulationDriver {
    pub fn new(pool: Pool, arbitrageur: Arbitrageur) -> Self {
        Self { pool, arbitrageur }
    }

    pub fn from_config(config: &SimulationConfig) -> anyhow::Result<Self> {
        let pool = config
            .pool
            .build_pool(config.price_path.start_timestamp)
            .context("Failed to build simulation pool")?;
        Ok(Self::new(pool, Arbitrageur::new(config.arbitrage)))
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Run over a price path until it ends or the pool leaves its grace window
    pub fn run<I>(&mut self, path: I) -> Result<Vec<SimulationRecord>>
    where
        I: IntoIterator<Item = PricePoint>,
    {
        let mut records = Vec::new();
        for (step, point) in path.into_iter().enumerate() {
            match self.step(step, point)? {
                Some(record) => records.push(record),
                None => break,
            }
        }

        info!(steps = records.len(), "✅ Simulation finished");
        Ok(records)
    }

    /// Advance to `point` and arbitrage once; `None` once the pool can no
    /// longer trade
    pub fn step(&mut self, step: usize, point: PricePoint) -> Result<Option<SimulationRecord>> {
        let maturity = self.pool.calibration().maturity();
        if point.timestamp > maturity.saturating_add(BUFFER) {
            info!(
                timestamp = point.timestamp,
                maturity, "Pool past its grace window, stopping"
            );
            return Ok(None);
        }

        self.pool.advance_time(point.timestamp)?;

        let outcome = if self.pool.state() == PoolState::Active {
            match self.arbitrageur.arbitrage_exactly(point.price, &mut self.pool) {
                Ok(outcome) => outcome,
                Err(err @ (RmmError::Domain { .. } | RmmError::NoConvergence { .. })) => {
                    warn!(step, error = %err, "Arbitrage search failed, skipping step");
                    ArbitrageOutcome::NoOpportunity
                }
                Err(err) => return Err(err),
            }
        } else {
            ArbitrageOutcome::NoOpportunity
        };

        let record = self.record(step, point, &outcome);
        debug!(
            step,
            reference = point.price,
            spot = ?record.spot_price,
            invariant = record.invariant,
            "Simulation step"
        );
        Ok(Some(record))
    }

    fn record(&self, step: usize, point: PricePoint, outcome: &ArbitrageOutcome) -> SimulationRecord {
        let reserve = self.pool.reserve();
        let trade = outcome.executed();

        SimulationRecord {
            step,
            timestamp: point.timestamp,
            tau: self.pool.tau(),
            state: self.pool.state(),
            reference_price: point.price,
            spot_price: self.pool.spot_price().ok(),
            reserve_risky: reserve.risky.to_f64(),
            reserve_stable: reserve.stable.to_f64(),
            invariant: reserve.invariant.to_f64(),
            arbitrage: trade.map(|t| t.direction),
            amount_in: trade.map(|t| t.amount_in.to_f64()),
            amount_out: trade.map(|t| t.amount_out.to_f64()),
            profit: trade.map(|t| t.profit),
        }
    }
}

pub fn summarize(records: &[SimulationRecord]) -> SimulationSummary {
    let (first, last) = match (records.first(), records.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return SimulationSummary::default(),
    };

    let gaps: Vec<f64> = records
        .iter()
        .filter_map(|r| r.spot_price.map(|spot| (spot - r.reference_price).abs()))
        .collect();
    let count = |direction| {
        records
            .iter()
            .filter(|r| r.arbitrage == Some(direction))
            .count()
    };

    SimulationSummary {
        steps: records.len(),
        trades: records.iter().filter(|r| r.arbitrage.is_some()).count(),
        sell_risky_trades: count(ArbitrageDirection::SellRisky),
        buy_risky_trades: count(ArbitrageDirection::BuyRisky),
        total_profit: records.iter().filter_map(|r| r.profit).sum(),
        initial_invariant: first.invariant,
        final_invariant: last.invariant,
        mean_price_gap: if gaps.is_empty() {
            0.0
        } else {
            gaps.iter().sum::<f64>() / gaps.len() as f64
        },
        max_price_gap: gaps.iter().copied().fold(0.0, f64::max),
    }
}
