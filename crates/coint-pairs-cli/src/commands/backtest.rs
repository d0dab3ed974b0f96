use clap::Args;
use serde_json::Value;
use tracing::debug;

use coint_pairs_core::pipeline::{run_pairs_backtest, PairsBacktestInput};
use coint_pairs_core::PairsConfig;

use crate::input;

/// Arguments for a full pairs backtest
#[derive(Args)]
pub struct BacktestArgs {
    /// Path to JSON or YAML input file (series_a, series_b, optional config)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON or YAML config file; replaces any config in the input
    #[arg(long)]
    pub config: Option<String>,
}

pub fn run_backtest(args: BacktestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut backtest_input: PairsBacktestInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json|file.yaml> or stdin required for backtest".into());
    };
    if let Some(ref path) = args.config {
        let config: PairsConfig = input::file::read_document(path)?;
        debug!(path = %path, "config file overrides embedded config");
        backtest_input.config = config;
    }
    let result = run_pairs_backtest(&backtest_input)?;
    Ok(serde_json::to_value(result)?)
}
