pub mod alignment;
pub mod backtest;
pub mod cointegration;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod signal;
pub mod spread;
pub mod stationarity;
pub mod stats;
pub mod types;

#[cfg(feature = "diagnostics")]
pub mod normality;

pub use config::PairsConfig;
pub use error::PairsError;
pub use pipeline::{run_pairs_backtest, PairsBacktestInput, PairsBacktestOutput};
pub use types::*;

/// Standard result type for all pairs-trading operations
pub type PairsResult<T> = Result<T, PairsError>;
