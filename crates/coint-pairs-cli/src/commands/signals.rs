use clap::Args;
use serde_json::Value;

use coint_pairs_core::signal::{generate_signals, SignalInput};

use crate::input;

/// Arguments for signal generation from a Z-score series
#[derive(Args)]
pub struct SignalsArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_signals(args: SignalsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let signal_input: SignalInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json|file.yaml> or stdin required for signal generation".into());
    };
    let result = generate_signals(&signal_input)?;
    Ok(serde_json::to_value(result)?)
}
