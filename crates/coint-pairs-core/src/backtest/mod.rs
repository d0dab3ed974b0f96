pub mod metrics;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PairsError;
use crate::signal::Position;
use crate::types::Return;
use crate::PairsResult;

pub use metrics::{compute_metrics, extract_trades, BacktestMetrics, Trade};

/// Per-period returns and the two cumulative curves derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnLCurve {
    /// r_t = e_t - e_{t-1}; zero at t = 0
    pub spread_returns: Vec<Return>,
    /// r_t times the position held at t-1; zero at t = 0
    pub strategy_returns: Vec<Return>,
    /// 1 + running sum of strategy returns
    pub additive: Vec<Decimal>,
    /// Running product of (1 + strategy return), held constant from the
    /// ruin period on
    pub compounding: Vec<Decimal>,
    /// First period at which the compounding curve is at or below zero.
    pub ruin_period: Option<usize>,
}

impl PnLCurve {
    pub fn len(&self) -> usize {
        self.strategy_returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategy_returns.is_empty()
    }

    pub fn final_additive(&self) -> Decimal {
        self.additive.last().copied().unwrap_or(Decimal::ONE)
    }

    pub fn final_compounding(&self) -> Decimal {
        self.compounding.last().copied().unwrap_or(Decimal::ONE)
    }
}

/// Simulate holding the spread according to `signals`.
///
/// A position decided at t earns the spread change from t to t+1, so the
/// return at t uses the signal at t-1. Neither the position sizes nor any
/// costs enter here.
pub fn run(residuals: &[Decimal], signals: &[Position]) -> PairsResult<PnLCurve> {
    if residuals.len() != signals.len() {
        return Err(PairsError::InvalidInput {
            field: "signals".into(),
            reason: format!(
                "Signal series has {} values but residual series has {}",
                signals.len(),
                residuals.len()
            ),
        });
    }
    if residuals.is_empty() {
        return Err(PairsError::InsufficientData(
            "Backtest needs at least one period".into(),
        ));
    }

    let n = residuals.len();
    let mut spread_returns = Vec::with_capacity(n);
    let mut strategy_returns = Vec::with_capacity(n);
    spread_returns.push(Decimal::ZERO);
    strategy_returns.push(Decimal::ZERO);
    for t in 1..n {
        let r = residuals[t]
            .checked_sub(residuals[t - 1])
            .ok_or_else(|| out_of_range("Spread return", t))?;
        spread_returns.push(r);
        // Multiplying by -1, 0 or 1 stays in range
        strategy_returns.push(r * signals[t - 1].as_decimal());
    }

    let mut additive = Vec::with_capacity(n);
    let mut total = Decimal::ONE;
    for (t, r) in strategy_returns.iter().enumerate() {
        total = total
            .checked_add(*r)
            .ok_or_else(|| out_of_range("Additive curve", t))?;
        additive.push(total);
    }

    // Ruin is absorbing: once the level is at or below zero it is held there.
    let mut compounding = Vec::with_capacity(n);
    let mut level = Decimal::ONE;
    let mut ruin_period = None;
    for (t, r) in strategy_returns.iter().enumerate() {
        if ruin_period.is_none() {
            level = Decimal::ONE
                .checked_add(*r)
                .and_then(|factor| level.checked_mul(factor))
                .ok_or_else(|| out_of_range("Compounding curve", t))?;
            if level <= Decimal::ZERO {
                warn!(period = t, "compounding curve reached zero or below");
                ruin_period = Some(t);
            }
        }
        compounding.push(level);
    }
    debug!(
        periods = n,
        additive = %additive[n - 1],
        compounding = %compounding[n - 1],
        "backtest complete"
    );

    Ok(PnLCurve {
        spread_returns,
        strategy_returns,
        additive,
        compounding,
        ruin_period,
    })
}

fn out_of_range(what: &str, period: usize) -> PairsError {
    PairsError::FinancialImpossibility(format!(
        "{what} leaves the Decimal range at period {period}; spread values are too large"
    ))
}
