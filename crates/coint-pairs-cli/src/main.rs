mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::backtest::BacktestArgs;
use commands::cointegration::CointegrationArgs;
use commands::signals::SignalsArgs;
use commands::stationarity::StationarityArgs;

/// Cointegrated pairs-trading backtests
#[derive(Parser)]
#[command(
    name = "pairs",
    version,
    about = "Cointegrated pairs-trading backtests",
    long_about = "A CLI for Engle-Granger pairs trading with decimal precision. \
                  Aligns two price series, estimates the hedge ratio, tests the \
                  spread for stationarity, generates Z-score signals and backtests them."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log to stderr: -v for info, -vv for debug (RUST_LOG takes precedence)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: align, estimate, standardize, signal, backtest
    Backtest(BacktestArgs),
    /// Estimate the cointegrating relation between two price series
    Cointegration(CointegrationArgs),
    /// Augmented Dickey-Fuller unit-root test on a single series
    Stationarity(StationarityArgs),
    /// Generate positions from a Z-score series
    Signals(SignalsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Backtest(args) => commands::backtest::run_backtest(args),
        Commands::Cointegration(args) => commands::cointegration::run_cointegration(args),
        Commands::Stationarity(args) => commands::stationarity::run_stationarity(args),
        Commands::Signals(args) => commands::signals::run_signals(args),
        Commands::Version => {
            println!("pairs {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result.and_then(|value| output::format_output(&cli.output, &value)) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
