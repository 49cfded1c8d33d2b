//! # RMM Simulation Configuration
//!
//! Layered configuration for the replicating pool simulation driver and the
//! defaults it falls back to.
//!
//! ## Features
//!
//! - **Layered Loading**: Base TOML file, optional environment overlay and
//!   `RMM_`-prefixed environment variables
//! - **Engine Builders**: Turns the `[pool]` section into a validated
//!   [`rmm::Calibration`] and an initialized [`rmm::Pool`]
//! - **Defaults**: Every key is optional; see [`defaults`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rmm_config::load_config;
//!
//! let config = load_config(None, Some("development")).unwrap();
//! let pool = config.pool.build_pool(config.price_path.start_timestamp).unwrap();
//! ```

pub mod defaults;
pub mod simulation_config;

// Re-export commonly used types
pub use simulation_config::{
    load_config, OutputSettings, PoolSettings, PricePathSettings, SimulationConfig,
};
