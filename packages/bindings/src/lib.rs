use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[napi]
pub fn run_pairs_backtest(input_json: String) -> NapiResult<String> {
    let input: coint_pairs_core::pipeline::PairsBacktestInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        coint_pairs_core::pipeline::run_pairs_backtest(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Individual stages
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_cointegration(input_json: String) -> NapiResult<String> {
    let input: coint_pairs_core::cointegration::CointegrationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = coint_pairs_core::cointegration::analyze_cointegration(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn adf_test(input_json: String) -> NapiResult<String> {
    let input: coint_pairs_core::stationarity::AdfInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = coint_pairs_core::stationarity::run_adf(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn generate_signals(input_json: String) -> NapiResult<String> {
    let input: coint_pairs_core::signal::SignalInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = coint_pairs_core::signal::generate_signals(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
