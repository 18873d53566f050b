//! # Talon OpMode
//!
//! Loads the host configuration, builds the hardware map and the claw
//! binding, performs RT setup and runs the scheduler tick loop until the
//! tick limit is reached or SIGINT/SIGTERM arrives.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use talon_common::prelude::*;
use talon_opmode::runner::rt_setup;
use talon_opmode::{OpModeConfig, OpModeError, OpModeRunner};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Talon OpMode: command scheduler host loop
#[derive(Parser, Debug)]
#[command(name = "talon_opmode")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Runs the command scheduler against simulated hardware")]
struct Args {
    /// Path to the op mode configuration TOML.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stop after N ticks (overrides loop.max_ticks; 0 = until interrupted).
    #[arg(long)]
    ticks: Option<u64>,

    /// Tick period in microseconds (overrides loop.tick_period_us).
    #[arg(long)]
    tick_period_us: Option<u64>,

    /// CPU core to pin the loop thread to (overrides loop.cpu_core).
    #[arg(long)]
    cpu_core: Option<usize>,

    /// SCHED_FIFO priority (overrides loop.rt_priority).
    #[arg(long)]
    rt_priority: Option<i32>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    /// Print the final scheduler state as JSON on exit.
    #[arg(long)]
    dump_state: bool,
}

fn main() {
    let args = Args::parse();
    let config = OpModeConfig::load_validated(&args.config);
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    info!("Talon OpMode v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| {
            format!(
                "failed to load {}: {e}",
                args.config.display()
            )
        })
        .and_then(|config| run(&args, config).map_err(|e| e.to_string()));

    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }
    info!("Talon OpMode shutdown complete");
}

fn run(args: &Args, mut config: OpModeConfig) -> Result<(), OpModeError> {
    if let Some(ticks) = args.ticks {
        config.loop_config.max_ticks = ticks;
    }
    if let Some(period) = args.tick_period_us {
        config.loop_config.tick_period_us = period;
    }
    if let Some(core) = args.cpu_core {
        config.loop_config.cpu_core = core;
    }
    if let Some(priority) = args.rt_priority {
        config.loop_config.rt_priority = priority;
    }

    info!(
        "Loaded '{}': {} servos, {} script steps, tick period {} µs",
        config.shared.service_name,
        config.servos.len(),
        config.script.len(),
        config.loop_config.tick_period_us
    );

    let mut runner = OpModeRunner::new(&config)?;
    runner.set_tick_period(Duration::from_micros(config.loop_config.tick_period_us));

    rt_setup(config.loop_config.cpu_core, config.loop_config.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        config.loop_config.cpu_core, config.loop_config.rt_priority
    );

    runner.install_signal_handler()?;

    runner.run()?;

    if args.dump_state {
        let snapshot = runner.snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    let summary = runner.shutdown();
    info!("Summary: {}", serde_json::to_string(&summary)?);
    Ok(())
}

/// Initialise the global subscriber.
///
/// `RUST_LOG` wins over the configured level; `--verbose` forces DEBUG.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
