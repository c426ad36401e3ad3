use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use temper_sens::{AppConfig, Dashboard};
use temper_sens_core::stop_pair;
use temper_sens_types::TemperatureUnit;

/// temper-sens - Poll USB temperature/humidity sensors and print changes
#[derive(Parser, Debug, Clone)]
#[command(name = "temper-sens")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file to load (defaults to the per-user config location)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,

    /// Override the unit system (metric or imperial)
    #[arg(short = 'u', long = "units", value_name = "UNITS")]
    units: Option<TemperatureUnit>,

    /// Stop after this many render ticks (runs forever if omitted)
    #[arg(short = 't', long = "ticks", value_name = "N")]
    ticks: Option<u64>,

    /// Print the effective configuration as JSON and exit
    #[arg(long = "print-config")]
    print_config: bool,
}

fn main() {
    let cli = Cli::parse();

    // Level 0 (default): warn only
    // Level 1: info
    // Level 2: debug
    // Level 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    if let Some(units) = cli.units {
        config.units = units;
    }

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    info!("Starting temper-sens v{}", env!("CARGO_PKG_VERSION"));

    let registry = temper_sens_sources::default_registry();
    let mut dashboard = Dashboard::from_config(&config, &registry);
    if dashboard.is_empty() {
        warn!("No sensor modules active (available: {})", registry.list_modules().join(", "));
        return Ok(());
    }
    info!("{} sensor module(s) active", dashboard.len());

    let (mut shutdown, interrupted) = stop_pair();
    ctrlc::set_handler(move || {
        info!("Interrupted, stopping sensor modules");
        shutdown.stop();
    })
    .context("installing signal handler")?;

    let render_interval = config.render_interval().max(Duration::from_millis(10));
    dashboard.run(render_interval, cli.ticks, &interrupted, |line| {
        println!("{}: {}", line.module, line.text);
    });
    Ok(())
}
