//! Simulation Configuration Module
//!
//! Loads simulation settings from TOML files with environment-specific
//! overrides and `RMM_`-prefixed environment variables.

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use rmm::{
    ArbitrageConfig, Calibration, Pool, Wei, DEFAULT_DECIMALS, MAX_TOKEN_DECIMALS,
    MIN_TOKEN_DECIMALS, PERCENTAGE,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Main simulation configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Pool calibration and initial reserves
    pub pool: PoolSettings,

    /// Reference price process
    pub price_path: PricePathSettings,

    /// Arbitrage search parameters
    pub arbitrage: ArbitrageConfig,

    /// Time series and logging output
    pub output: OutputSettings,
}

/// Pool calibration in natural units
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PoolSettings {
    pub strike: f64,
    /// Implied volatility, 1.0 = 100%
    pub sigma: f64,
    /// Swap fee, 0.0015 = 0.15%
    pub fee: f64,
    /// Seconds from the price path start until maturity
    pub maturity_seconds: u64,
    pub decimals_risky: u8,
    pub decimals_stable: u8,
    pub initial_risky_per_liquidity: f64,
    pub liquidity: f64,
}

/// Geometric Brownian motion parameters for the reference price
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PricePathSettings {
    pub initial_price: f64,
    /// Annualized drift
    pub drift: f64,
    /// Annualized volatility
    pub volatility: f64,
    pub step_seconds: u64,
    pub steps: usize,
    pub seed: u64,
    pub start_timestamp: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    pub path: String,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            strike: defaults::pool::STRIKE,
            sigma: defaults::pool::SIGMA,
            fee: defaults::pool::FEE,
            maturity_seconds: defaults::pool::MATURITY_SECONDS,
            decimals_risky: defaults::pool::DECIMALS_RISKY,
            decimals_stable: defaults::pool::DECIMALS_STABLE,
            initial_risky_per_liquidity: defaults::pool::INITIAL_RISKY_PER_LIQUIDITY,
            liquidity: defaults::pool::LIQUIDITY,
        }
    }
}

impl Default for PricePathSettings {
    fn default() -> Self {
        Self {
            initial_price: defaults::price_path::INITIAL_PRICE,
            drift: defaults::price_path::DRIFT,
            volatility: defaults::price_path::VOLATILITY,
            step_seconds: defaults::price_path::STEP_SECONDS,
            steps: defaults::price_path::STEPS,
            seed: defaults::price_path::SEED,
            start_timestamp: 0,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: defaults::output::PATH.to_string(),
            log_level: defaults::output::LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }
}

impl PoolSettings {
    /// Calibration for a pool created at `start_timestamp`
    pub fn calibration(&self, start_timestamp: u64) -> Result<Calibration> {
        let strike = Decimal::try_from(self.strike)
            .with_context(|| format!("Strike {} is not representable", self.strike))?;
        let strike = Wei::from_decimal(strike, self.decimals_stable)
            .context("Failed to encode strike")?;

        let scale = f64::from(PERCENTAGE);
        let sigma = (self.sigma * scale).round() as u32;
        let gamma = ((1.0 - self.fee) * scale).round() as u32;

        let maturity = start_timestamp
            .checked_add(self.maturity_seconds)
            .context("Maturity timestamp overflows")?;

        Calibration::new(
            strike,
            sigma,
            maturity,
            start_timestamp,
            gamma,
            self.decimals_risky,
            self.decimals_stable,
        )
        .context("Invalid pool calibration")
    }

    /// Pool with its stable reserve placed on the curve at `start_timestamp`
    pub fn build_pool(&self, start_timestamp: u64) -> Result<Pool> {
        let calibration = self.calibration(start_timestamp)?;

        let risky_per_liquidity = Decimal::try_from(self.initial_risky_per_liquidity)
            .context("Initial risky reserve is not representable")?;
        let liquidity = Decimal::try_from(self.liquidity)
            .context("Liquidity is not representable")?;
        let liquidity = Wei::from_decimal(liquidity, DEFAULT_DECIMALS)
            .context("Failed to encode liquidity")?;

        let pool = Pool::initialize(calibration, risky_per_liquidity, liquidity)
            .context("Failed to initialize pool")?;
        debug!(
            risky = %pool.reserve().risky,
            stable = %pool.reserve().stable,
            "Pool built from configuration"
        );
        Ok(pool)
    }
}

impl SimulationConfig {
    /// Load configuration from files with environment overrides
    ///
    /// The environment overlay is read from `environments/<env>.toml` next to
    /// the base file.
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let base = base_path.unwrap_or(Path::new("config/simulation.toml"));

        let mut builder = Config::builder().add_source(File::from(base).required(true));

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = base
                .parent()
                .unwrap_or(Path::new("."))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (RMM_SECTION__KEY)
        builder = builder.add_source(
            Environment::with_prefix("RMM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Expand environment variables in path values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        let expanded =
            shellexpand::env(&self.output.path).context("Failed to expand output path")?;
        self.output.path = expanded.to_string();
        Ok(())
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let pool = &self.pool;
        if !(pool.strike > 0.0) {
            bail!("pool.strike must be positive, got {}", pool.strike);
        }
        if !(pool.sigma > 0.0) {
            bail!("pool.sigma must be positive, got {}", pool.sigma);
        }
        if !(0.0..0.1).contains(&pool.fee) {
            bail!("pool.fee must lie in [0, 0.1), got {}", pool.fee);
        }
        if pool.maturity_seconds == 0 {
            bail!("pool.maturity_seconds must be positive");
        }
        for (name, decimals) in [
            ("pool.decimals_risky", pool.decimals_risky),
            ("pool.decimals_stable", pool.decimals_stable),
        ] {
            if !(MIN_TOKEN_DECIMALS..=MAX_TOKEN_DECIMALS).contains(&decimals) {
                bail!(
                    "{} must lie in {}..={}, got {}",
                    name,
                    MIN_TOKEN_DECIMALS,
                    MAX_TOKEN_DECIMALS,
                    decimals
                );
            }
        }
        if !(pool.initial_risky_per_liquidity > 0.0 && pool.initial_risky_per_liquidity < 1.0) {
            bail!(
                "pool.initial_risky_per_liquidity must lie in (0, 1), got {}",
                pool.initial_risky_per_liquidity
            );
        }
        if !(pool.liquidity > 0.0) {
            bail!("pool.liquidity must be positive, got {}", pool.liquidity);
        }

        let path = &self.price_path;
        if !(path.initial_price > 0.0) {
            bail!("price_path.initial_price must be positive, got {}", path.initial_price);
        }
        if !(path.volatility >= 0.0) {
            bail!("price_path.volatility must be non-negative, got {}", path.volatility);
        }
        if path.step_seconds == 0 {
            bail!("price_path.step_seconds must be positive");
        }

        let arbitrage = &self.arbitrage;
        if arbitrage.max_iterations == 0 {
            bail!("arbitrage.max_iterations must be positive");
        }
        if !(arbitrage.bracket_tolerance > 0.0) {
            bail!(
                "arbitrage.bracket_tolerance must be positive, got {}",
                arbitrage.bracket_tolerance
            );
        }

        Ok(())
    }
}

/// Convenience function to load, expand and validate configuration
pub fn load_config(base_path: Option<&Path>, environment: Option<&str>) -> Result<SimulationConfig> {
    let mut config = SimulationConfig::load(base_path, environment)?;
    config.expand_env_vars()?;
    config.validate()?;
    Ok(config)
}
