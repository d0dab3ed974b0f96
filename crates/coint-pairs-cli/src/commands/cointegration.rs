use clap::Args;
use serde_json::Value;

use coint_pairs_core::cointegration::{self, CointegrationInput};

use crate::input;

/// Arguments for a cointegration analysis of two price series
#[derive(Args)]
pub struct CointegrationArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_cointegration(args: CointegrationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let coint_input: CointegrationInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json|file.yaml> or stdin required for cointegration analysis".into());
    };
    let result = cointegration::analyze_cointegration(&coint_input)?;
    Ok(serde_json::to_value(result)?)
}
