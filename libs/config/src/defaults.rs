//! Simulation defaults
//!
//! Default configuration values used when a section or key is missing from
//! the TOML file. The pool defaults describe an at-the-money call with a
//! one year maturity whose spot price matches the default price path.

/// Pool calibration defaults
pub mod pool {
    /// Strike in stable units
    pub const STRIKE: f64 = 10.0;

    /// Implied volatility (1.0 = 100%)
    pub const SIGMA: f64 = 1.0;

    /// Swap fee (0.15%)
    pub const FEE: f64 = 0.0015;

    /// Seconds from the simulation start until maturity
    pub const MATURITY_SECONDS: u64 = rmm::SECONDS_PER_YEAR;

    pub const DECIMALS_RISKY: u8 = 18;
    pub const DECIMALS_STABLE: u8 = 18;

    /// Risky reserve per unit of liquidity at creation, placing spot at the strike
    pub const INITIAL_RISKY_PER_LIQUIDITY: f64 = 0.308537538726;

    /// Liquidity in whole units
    pub const LIQUIDITY: f64 = 1.0;
}

/// Reference price path defaults
pub mod price_path {
    pub const INITIAL_PRICE: f64 = 10.0;

    /// Annualized drift
    pub const DRIFT: f64 = 0.0;

    /// Annualized volatility
    pub const VOLATILITY: f64 = 1.0;

    /// One day per step
    pub const STEP_SECONDS: u64 = 86_400;

    pub const STEPS: usize = 365;

    pub const SEED: u64 = 42;
}

/// Output defaults
pub mod output {
    /// JSON-lines time series destination
    pub const PATH: &str = "./output/simulation.jsonl";

    pub const LOG_LEVEL: &str = "info";
}
