//! Simulation entry point

use anyhow::{Context, Result};
use clap::Parser;
use rmm_config::load_config;
use rmm_simulation::{summarize, write_jsonl_file, GbmPricePath, SimulationDriver};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/simulation.toml")]
    config: PathBuf,

    /// Environment overlay under `environments/` next to the config file
    #[arg(short, long)]
    environment: Option<String>,

    /// Output path for the JSON-lines time series
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Price path seed
    #[arg(long)]
    seed: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(Some(&args.config), args.environment.as_deref())
        .with_context(|| format!("Failed to load configuration from {:?}", args.config))?;
    if let Some(seed) = args.seed {
        config.price_path.seed = seed;
    }

    // Initialize tracing; RUST_LOG takes precedence over the configured level
    let json = args.json || config.output.json_logs;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.output.log_level)),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    info!("🚀 Starting RMM simulation");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        strike = config.pool.strike,
        sigma = config.pool.sigma,
        fee = config.pool.fee,
        steps = config.price_path.steps,
        seed = config.price_path.seed,
        "Configuration loaded"
    );

    let mut driver = SimulationDriver::from_config(&config)?;
    let path = GbmPricePath::new(&config.price_path).context("Invalid price path settings")?;
    let records = driver.run(path).context("Simulation failed")?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output.path));
    write_jsonl_file(&output, &records)?;
    info!("📂 Wrote {} records to {:?}", records.len(), output);

    let summary = summarize(&records);
    info!(
        trades = summary.trades,
        sell_risky = summary.sell_risky_trades,
        buy_risky = summary.buy_risky_trades,
        total_profit = summary.total_profit,
        initial_invariant = summary.initial_invariant,
        final_invariant = summary.final_invariant,
        mean_price_gap = summary.mean_price_gap,
        max_price_gap = summary.max_price_gap,
        "📊 Simulation summary"
    );

    Ok(())
}
