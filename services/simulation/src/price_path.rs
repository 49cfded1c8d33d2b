//! Reference price path generation
//!
//! Geometric Brownian motion sampled at a fixed step, driven by a seeded
//! [`StdRng`] so that runs are reproducible.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rmm::SECONDS_PER_YEAR;
use rmm_config::PricePathSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PricePathError {
    #[error("Invalid price path parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// One sample of the reference price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: u64,
    pub price: f64,
}

/// Iterator over `steps + 1` points, starting with the initial price
pub struct GbmPricePath {
    rng: StdRng,
    drift: f64,
    volatility: f64,
    step_seconds: u64,
    dt: f64,
    current: Option<PricePoint>,
    remaining: usize,
}

impl GbmPricePath {
    pub fn new(settings: &PricePathSettings) -> Result<Self, PricePathError> {
        if !(settings.initial_price > 0.0) {
            return Err(PricePathError::InvalidParameter {
                name: "initial_price",
                value: settings.initial_price,
            });
        }
        if !(settings.volatility >= 0.0) {
            return Err(PricePathError::InvalidParameter {
                name: "volatility",
                value: settings.volatility,
            });
        }
        if settings.step_seconds == 0 {
            return Err(PricePathError::InvalidParameter {
                name: "step_seconds",
                value: 0.0,
            });
        }

        Ok(Self {
            rng: StdRng::seed_from_u64(settings.seed),
            drift: settings.drift,
            volatility: settings.volatility,
            step_seconds: settings.step_seconds,
            dt: settings.step_seconds as f64 / SECONDS_PER_YEAR as f64,
            current: Some(PricePoint {
                timestamp: settings.start_timestamp,
                price: settings.initial_price,
            }),
            remaining: settings.steps,
        })
    }

    fn advance(&mut self, point: PricePoint) -> PricePoint {
        let shock: f64 = StandardNormal.sample(&mut self.rng);
        let exponent = (self.drift - 0.5 * self.volatility * self.volatility) * self.dt
            + self.volatility * self.dt.sqrt() * shock;

        PricePoint {
            timestamp: point.timestamp.saturating_add(self.step_seconds),
            price: point.price * exponent.exp(),
        }
    }
}

impl Iterator for GbmPricePath {
    type Item = PricePoint;

    fn next(&mut self) -> Option<PricePoint> {
        let point = self.current.take()?;
        if self.remaining > 0 {
            self.remaining -= 1;
            self.current = Some(self.advance(point));
        }
        Some(point)
    }
}

/// Collect a full path
pub fn generate(settings: &PricePathSettings) -> Result<Vec<PricePoint>, PricePathError> {
    Ok(GbmPricePath::new(settings)?.collect())
}
