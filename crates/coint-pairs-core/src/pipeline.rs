//! End-to-end pairs backtest: align, estimate, standardize, signal, simulate.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::alignment::{align, split};
use crate::backtest::{self, compute_metrics, BacktestMetrics};
use crate::cointegration::{choose_orientation, half_life, Orientation};
use crate::config::PairsConfig;
#[cfg(feature = "diagnostics")]
use crate::normality::{jarque_bera, JarqueBera};
use crate::signal::Position;
use crate::spread::standardize;
use crate::stationarity::CriticalValues;
use crate::types::{with_metadata, ComputationOutput, Price, PriceSeries, Return, ZScore};
use crate::PairsResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairsBacktestInput {
    pub series_a: PriceSeries,
    pub series_b: PriceSeries,
    #[serde(default)]
    pub config: PairsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Train,
    Test,
}

/// One aligned period of the backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRow {
    pub date: NaiveDate,
    pub segment: Segment,
    /// Transformed price of the dependent leg
    pub dependent: Price,
    /// Transformed price of the independent leg
    pub independent: Price,
    pub residual: Decimal,
    pub z_score: ZScore,
    pub signal: Position,
    pub strategy_return: Return,
    pub additive: Decimal,
    pub compounding: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairsBacktestOutput {
    pub dependent: String,
    pub independent: String,
    pub orientation: Orientation,
    pub hedge_ratio: Decimal,
    pub intercept: Decimal,
    pub adf_statistic: Decimal,
    pub alternative_adf_statistic: Decimal,
    pub lag_order: usize,
    pub critical_values: CriticalValues,
    pub is_stationary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub half_life: Option<Decimal>,
    /// Mean of the reference (training) residuals used for the Z-scores
    pub spread_mean: Decimal,
    /// Sample standard deviation of the reference residuals
    pub spread_std: Decimal,
    pub observations: usize,
    pub train_periods: usize,
    pub test_periods: usize,
    pub final_additive: Decimal,
    pub final_compounding: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ruin_period: Option<usize>,
    pub metrics: BacktestMetrics,
    #[cfg(feature = "diagnostics")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normality: Option<JarqueBera>,
    pub periods: Vec<PeriodRow>,
}

/// Run the full pipeline on two raw price series.
///
/// The hedge ratio and the Z-score reference statistics come from the
/// training segment only and are applied unchanged to the test segment.
/// Any stage error aborts the whole run.
pub fn run_pairs_backtest(
    input: &PairsBacktestInput,
) -> PairsResult<ComputationOutput<PairsBacktestOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let config = &input.config;
    config.validate()?;

    info!(
        a = %input.series_a.symbol,
        b = %input.series_b.symbol,
        "starting pairs backtest"
    );

    let pair = align(&input.series_a, &input.series_b, config.transform)?;
    let n = pair.len();
    let (fit_window, train_len) = match config.train_fraction {
        Some(fraction) => {
            let (train, _test) = split(&pair, fraction)?;
            let len = train.len();
            (train, len)
        }
        None => (pair.clone(), n),
    };
    debug!(observations = n, train = train_len, "aligned and split");

    let tester = config.tester();
    let choice = choose_orientation(
        fit_window.a(),
        fit_window.b(),
        &tester,
        config.lag_selection,
    )?;
    let chosen = &choice.chosen;
    let (dependent, independent) = chosen.orientation.legs(pair.a(), pair.b());
    let (dependent_symbol, independent_symbol) = match chosen.orientation {
        Orientation::ADependent => (pair.symbol_a(), pair.symbol_b()),
        Orientation::BDependent => (pair.symbol_b(), pair.symbol_a()),
    };

    let residuals = chosen.fit.residuals_for(dependent, independent)?;
    let z = standardize(&residuals, Some(0..train_len))?;
    let signals = config.signal_generator().generate(&z.values);
    let curve = backtest::run(&residuals, &signals)?;
    let metrics = compute_metrics(&curve, &signals, &z.values, config.periods_per_year)?;

    let is_stationary = chosen.report.rejects_null_at(config.significance);
    if !is_stationary {
        let msg = format!(
            "Spread not stationary at {:?}: statistic {} vs critical value {}",
            config.significance,
            chosen.report.statistic.round_dp(4),
            chosen.report.critical_values.at(config.significance).round_dp(4)
        );
        warn!("{msg}");
        warnings.push(msg);
    }
    if let Some(t) = curve.ruin_period {
        warnings.push(format!(
            "Compounding curve reached zero or below at period {t} ({}); it is held at that level",
            pair.dates()[t]
        ));
    }
    if metrics.trades.is_empty() {
        warn!("no trades generated");
        warnings.push("No trades generated: Z-scores never crossed an entry threshold".into());
    }

    #[cfg(feature = "diagnostics")]
    let normality = match jarque_bera(&chosen.fit.residuals) {
        Ok(jb) => Some(jb),
        Err(e) => {
            debug!(error = %e, "normality diagnostic unavailable");
            None
        }
    };

    let periods: Vec<PeriodRow> = (0..n)
        .map(|t| PeriodRow {
            date: pair.dates()[t],
            segment: if t < train_len {
                Segment::Train
            } else {
                Segment::Test
            },
            dependent: dependent[t],
            independent: independent[t],
            residual: residuals[t],
            z_score: z.values[t],
            signal: signals[t],
            strategy_return: curve.strategy_returns[t],
            additive: curve.additive[t],
            compounding: curve.compounding[t],
        })
        .collect();

    let output = PairsBacktestOutput {
        dependent: dependent_symbol.to_string(),
        independent: independent_symbol.to_string(),
        orientation: chosen.orientation,
        hedge_ratio: chosen.fit.slope,
        intercept: chosen.fit.intercept,
        adf_statistic: chosen.report.statistic,
        alternative_adf_statistic: choice.rejected.report.statistic,
        lag_order: chosen.report.lag_order,
        critical_values: chosen.report.critical_values,
        is_stationary,
        half_life: half_life(&chosen.fit.residuals),
        spread_mean: z.mean,
        spread_std: z.std_dev,
        observations: n,
        train_periods: train_len,
        test_periods: n - train_len,
        final_additive: curve.final_additive(),
        final_compounding: curve.final_compounding(),
        ruin_period: curve.ruin_period,
        metrics,
        #[cfg(feature = "diagnostics")]
        normality,
        periods,
    };

    info!(
        orientation = ?output.orientation,
        trades = output.metrics.trade_count,
        final_additive = %output.final_additive,
        "pairs backtest complete"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Engle-Granger pairs backtest: OLS hedge ratio and Z-score reference fitted in-sample, threshold signals, spread P&L",
        &input.config,
        warnings,
        elapsed,
        output,
    ))
}
