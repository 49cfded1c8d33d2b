//! Error types for the replication engine

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RmmError {
    #[error("Domain error: {function} is undefined at {value}")]
    Domain { function: &'static str, value: f64 },

    #[error("Precision mismatch: {left} decimals vs {right} decimals")]
    PrecisionMismatch { left: u8, right: u8 },

    #[error("Unsupported precision: {decimals} decimals exceeds the maximum of {max}")]
    UnsupportedPrecision { decimals: u8, max: u8 },

    #[error("Value overflow: {0}")]
    Overflow(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Negative amount: {0}")]
    NegativeAmount(String),

    #[error("Pool expired: maturity {maturity}, timestamp {timestamp}")]
    PoolExpired { maturity: u64, timestamp: u64 },

    #[error("Invariant decreased from {before} to {after}")]
    InvariantViolation { before: f64, after: f64 },

    #[error("Bisection did not converge after {iterations} iterations")]
    NoConvergence { iterations: u32 },

    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("Invalid reserves: {0}")]
    InvalidReserves(String),

    #[error("Timestamp regression: last {last}, requested {requested}")]
    TimestampRegression { last: u64, requested: u64 },
}

pub type Result<T> = std::result::Result<T, RmmError>;
