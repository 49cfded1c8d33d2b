//! # RMM Simulation
//!
//! Drives a replicating pool along a synthetic reference price path:
//! time decay moves the curve, an arbitrageur trades the pool back onto the
//! reference price, and every step is recorded as a time series.
//!
//! ```text
//! GbmPricePath ─► SimulationDriver ─► SimulationRecord ─► JSON lines
//!                   (Pool + Arbitrageur)      │
//!                                             └─► SimulationSummary
//! ```

pub mod driver;
pub mod output;
pub mod price_path;

pub use driver::{summarize, SimulationDriver, SimulationRecord, SimulationSummary};
pub use output::{write_jsonl, write_jsonl_file};
pub use price_path::{generate, GbmPricePath, PricePathError, PricePoint};
