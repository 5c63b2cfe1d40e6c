//! tlock-cli: Command-line front end for Tlock staking pools.
//!
//! Queries multipliers from a pool configuration, replays timed command
//! scripts against an in-memory system, and inspects saved snapshots.

mod script;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tlock_core::asset::MemoryAssetLedger;
use tlock_core::clock::{ManualClock, SystemClock};
use tlock_core::constants::DEFAULT_LOG_LEVEL;
use tlock_core::math::format_wad;
use tlock_core::traits::Clock;
use tlock_core::types::AccountId;
use tlock_pool::{PoolSnapshot, PoolSystem, SnapshotStore, SystemConfig};
use tracing::{debug, info};

use crate::script::{Labels, Report, Script};

/// Tlock time-locked staking pools.
#[derive(Parser)]
#[command(name = "tlock-cli")]
#[command(version, about = "Time-locked staking with duration-weighted shares.")]
struct Cli {
    /// Log level (trace, debug, info, warn, error). Defaults to the
    /// configured `log_level`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the share multiplier of a pool for a lock duration.
    Multiplier(MultiplierArgs),
    /// Replay a command script against a fresh in-memory system.
    Simulate(SimulateArgs),
    /// Decode a snapshot file and print it as JSON.
    Inspect(InspectArgs),
}

#[derive(Args)]
struct MultiplierArgs {
    /// Pool configuration (default: ~/.config/tlock/tlock.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pool name.
    #[arg(short, long)]
    pool: String,

    /// Lock duration in seconds.
    #[arg(short, long)]
    duration: u64,
}

#[derive(Args)]
struct SimulateArgs {
    /// Pool configuration (default: ~/.config/tlock/tlock.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON command script.
    #[arg(short, long)]
    script: PathBuf,

    /// Write the final state as a snapshot to this path.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Args)]
struct InspectArgs {
    /// Snapshot file to decode.
    #[arg(short, long)]
    snapshot: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = cli.log_level.as_deref();

    match cli.command {
        Commands::Multiplier(args) => {
            let config = load_config(args.config.as_deref())?;
            init_logging(log_level.unwrap_or(&config.log_level), &cli.log_format);
            cmd_multiplier(args, &config)
        }
        Commands::Simulate(args) => {
            let config = load_config(args.config.as_deref())?;
            init_logging(log_level.unwrap_or(&config.log_level), &cli.log_format);
            cmd_simulate(args, &config)
        }
        Commands::Inspect(args) => {
            init_logging(log_level.unwrap_or(DEFAULT_LOG_LEVEL), &cli.log_format);
            cmd_inspect(args)
        }
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides `level`.
fn init_logging(level: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}

fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("tlock").join("tlock.toml");
    path.exists().then_some(path)
}

fn load_config(path: Option<&Path>) -> Result<SystemConfig> {
    let path = path.map(Path::to_path_buf).or_else(default_config_path);
    let config = SystemConfig::load(path.as_deref()).context("Failed to load configuration")?;
    anyhow::ensure!(!config.pools.is_empty(), "configuration defines no pools");
    Ok(config)
}

fn cmd_multiplier(args: MultiplierArgs, config: &SystemConfig) -> Result<()> {
    let pool = config
        .pool(&args.pool)
        .with_context(|| format!("Unknown pool {}", args.pool))?;
    let engine = pool.engine()?;
    let curve = pool.initial_curve()?;
    let multiplier = engine.get_multiplier(args.duration, &curve);

    println!("pool:       {}", pool.name);
    println!("duration:   {}s (effective {}s)", args.duration, engine.clamp_duration(args.duration));
    println!("multiplier: {}", format_wad(multiplier));
    Ok(())
}

fn cmd_simulate(args: SimulateArgs, config: &SystemConfig) -> Result<()> {
    let text = fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let script: Script = serde_json::from_str(&text).context("Failed to parse script")?;

    let start = script.start.unwrap_or_else(|| SystemClock.now());
    let clock = ManualClock::new(start);
    let mut labels = Labels::default();
    let owner: AccountId = labels.id(&script.owner);
    let mut system = PoolSystem::from_config(config, owner, MemoryAssetLedger::new(), clock.clone())?;
    script::fund(&mut system, &script.fund, &mut labels)?;
    debug!(owner = %owner, start, "pools created");
    info!(pools = system.pools().len(), steps = script.steps.len(), "simulation started");

    let steps = script::run(&mut system, &script.steps, &mut labels, |secs| clock.advance(secs));
    let failed = steps.iter().filter(|s| s.error.is_some()).count();
    let report = Report {
        steps,
        pools: script::report(&system, &labels),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(failed, "simulation finished");

    if let Some(path) = args.snapshot {
        SnapshotStore::new(&path)
            .save(&PoolSnapshot::capture(&system))
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        eprintln!("Snapshot written to {}", path.display());
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> Result<()> {
    let snapshot = SnapshotStore::new(&args.snapshot)
        .load()
        .with_context(|| format!("Failed to read snapshot {}", args.snapshot.display()))?;
    println!("{}", snapshot.to_json()?);
    Ok(())
}
