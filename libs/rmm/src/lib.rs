//! # RMM - Replicating Market Maker Pricing Engine
//!
//! ## Purpose
//!
//! Reference engine for a constant-function market maker whose trading curve
//! replicates a covered call through a Black-Scholes derived invariant.
//! Computes how a pool's risky and stable reserves move under swaps and time
//! decay, derives marginal and spot prices, and searches for the arbitrage
//! trade that pulls the pool price onto an external reference.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Calibration parameters and observed reserves from a
//!   ledger or contract reader, reference prices from a market feed
//! - **Output Destinations**: Swap amounts for transaction builders, prices
//!   and invariant readings for verification suites and simulations
//! - **Precision**: Token amounts at native decimals (6 to 18) through
//!   [`Wei`], curve state in signed 64.64 through [`FixedPointX64`]
//! - **Validation**: Typed errors for domain, precision, overflow, expiry and
//!   invariant failures, propagated unchanged with `?`
//!
//! ## Architecture Role
//!
//! ```text
//! FixedPointX64 ─► cumulative_normal ─► ReplicationMath ─► Pool ─► Arbitrageur
//!      ▲                                                    ▲
//!     Wei ─────────────────────── Calibration ──────────────┘
//! ```
//!
//! Each [`Pool`] is an owned value; mutating swaps must be serialized by the
//! owner, while `virtual_*` swaps work on snapshots and never mutate.

pub mod arbitrageur;
pub mod calibration;
pub mod cumulative_normal;
pub mod error;
pub mod fixed_point;
pub mod pool;
pub mod replication_math;
pub mod units;

pub use arbitrageur::{
    ArbitrageConfig, ArbitrageDirection, ArbitrageOpportunity, ArbitrageOutcome, Arbitrageur,
};
pub use calibration::{
    Calibration, PoolState, BUFFER, MAX_TOKEN_DECIMALS, MIN_TOKEN_DECIMALS, PERCENTAGE,
    SECONDS_PER_YEAR,
};
pub use error::{Result, RmmError};
pub use fixed_point::FixedPointX64;
pub use pool::{Pool, Reserve, SwapDirection, SwapResult};
pub use replication_math::{CurveParams, ReplicationMath};
pub use units::{Wei, DEFAULT_DECIMALS};

/// Common types for amount handling
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;
