use clap::Args;
use serde_json::Value;

use coint_pairs_core::stationarity::{run_adf, AdfInput};

use crate::input;

/// Arguments for an augmented Dickey-Fuller test
#[derive(Args)]
pub struct StationarityArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_stationarity(args: StationarityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let adf_input: AdfInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json|file.yaml> or stdin required for ADF test".into());
    };
    let result = run_adf(&adf_input)?;
    Ok(serde_json::to_value(result)?)
}
