use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::{
    CriticalValueTable, CriticalValues, LagSelection, SignificanceLevel, StationarityReport,
    StationarityTester,
};
use crate::error::PairsError;
use crate::stats::{least_squares, ln_decimal, sqrt_decimal};
use crate::types::{with_metadata, ComputationOutput};
use crate::PairsResult;

/// Regressors besides the lagged differences: constant and lagged level.
const DETERMINISTIC_TERMS: usize = 2;

/// Augmented Dickey-Fuller test with a constant.
///
/// Test regression: dy_t = alpha + beta * y_{t-1} + sum_i gamma_i * dy_{t-i} + e_t.
/// The statistic is the t-ratio of beta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AugmentedDickeyFuller {
    /// Upper bound for the lag search. `None` uses the Schwert rule.
    pub max_lag: Option<usize>,
    pub table: CriticalValueTable,
}

impl AugmentedDickeyFuller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_lag(mut self, max_lag: Option<usize>) -> Self {
        self.max_lag = max_lag;
        self
    }

    pub fn with_table(mut self, table: CriticalValueTable) -> Self {
        self.table = table;
        self
    }

    /// Largest lag the sample supports: n/2 - 2 (one constant term).
    fn lag_cap(n: usize) -> PairsResult<usize> {
        (n / 2).checked_sub(2).ok_or_else(|| PairsError::StationarityTestError {
            reason: format!("Series of length {n} is too short for a unit-root test"),
        })
    }

    fn resolve_max_lag(&self, n: usize) -> PairsResult<usize> {
        let cap = Self::lag_cap(n)?;
        match self.max_lag {
            Some(lag) if lag > cap => Err(PairsError::StationarityTestError {
                reason: format!("max_lag {lag} exceeds {cap}, the most a series of length {n} supports"),
            }),
            Some(lag) => Ok(lag),
            None => Ok(schwert_max_lag(n - 1).min(cap)),
        }
    }
}

impl StationarityTester for AugmentedDickeyFuller {
    fn test(
        &self,
        series: &[Decimal],
        lag_selection: LagSelection,
    ) -> PairsResult<StationarityReport> {
        let n = series.len();
        let diffs: Vec<Decimal> = series
            .windows(2)
            .map(|w| w[1].checked_sub(w[0]))
            .collect::<Option<_>>()
            .ok_or_else(|| PairsError::StationarityTestError {
                reason: "First differences leave the Decimal range".into(),
            })?;

        let lag_order = match lag_selection {
            LagSelection::Fixed(lag) => {
                let cap = Self::lag_cap(n)?;
                if lag > cap {
                    return Err(PairsError::StationarityTestError {
                        reason: format!(
                            "Fixed lag {lag} exceeds {cap}, the most a series of length {n} supports"
                        ),
                    });
                }
                lag
            }
            LagSelection::Bic | LagSelection::Aic => {
                let max_lag = self.resolve_max_lag(n)?;
                select_lag(series, &diffs, max_lag, lag_selection)?
            }
        };

        let (rows, y) = design(series, &diffs, lag_order, lag_order);
        let nobs = y.len();
        let k = lag_order + DETERMINISTIC_TERMS;
        if nobs <= k {
            return Err(PairsError::StationarityTestError {
                reason: format!(
                    "{nobs} observations cannot support {k} regressors at lag {lag_order}"
                ),
            });
        }
        let fit = least_squares(&rows, &y).ok_or_else(|| PairsError::StationarityTestError {
            reason: format!("Singular test regression at lag {lag_order}"),
        })?;
        let se = fit
            .std_error(1, nobs - k)
            .ok_or_else(|| PairsError::StationarityTestError {
                reason: "Test regression has zero residual variance".into(),
            })?;
        let statistic = fit.coefficients[1].checked_div(se).ok_or_else(|| {
            PairsError::StationarityTestError {
                reason: "Test statistic leaves the Decimal range".into(),
            }
        })?;

        debug!(%statistic, lag_order, nobs, "augmented Dickey-Fuller");

        Ok(StationarityReport {
            statistic,
            lag_order,
            nobs,
            critical_values: self.table.critical_values(nobs),
        })
    }
}

/// Schwert (1989) rule: ceil(12 * (nobs / 100)^(1/4)).
fn schwert_max_lag(nobs: usize) -> usize {
    let ratio = Decimal::from(nobs) / dec!(100);
    let fourth_root = sqrt_decimal(sqrt_decimal(ratio));
    // Round away sqrt noise before taking the ceiling so exact powers stay exact
    (dec!(12) * fourth_root)
        .round_dp(10)
        .ceil()
        .to_usize()
        .unwrap_or(0)
}

/// Build the test regression for `lags` lagged differences using diff
/// indices `start..`. Row layout: [1, y_{t}, dy_{t-1}, .., dy_{t-lags}]
/// against dy_t, where dy_t = y_{t+1} - y_t.
fn design(
    series: &[Decimal],
    diffs: &[Decimal],
    lags: usize,
    start: usize,
) -> (Vec<Vec<Decimal>>, Vec<Decimal>) {
    let mut rows = Vec::new();
    let mut y = Vec::new();
    for t in start..diffs.len() {
        let mut row = Vec::with_capacity(lags + DETERMINISTIC_TERMS);
        row.push(Decimal::ONE);
        row.push(series[t]);
        for i in 1..=lags {
            row.push(diffs[t - i]);
        }
        rows.push(row);
        y.push(diffs[t]);
    }
    (rows, y)
}

/// Pick the lag minimising the information criterion. Every candidate is
/// fitted on the same sample (the one the largest lag allows) so the
/// criteria are comparable.
fn select_lag(
    series: &[Decimal],
    diffs: &[Decimal],
    max_lag: usize,
    criterion: LagSelection,
) -> PairsResult<usize> {
    let mut best: Option<(usize, Decimal)> = None;

    for lag in 0..=max_lag {
        let (rows, y) = design(series, diffs, lag, max_lag);
        let nobs = y.len();
        let k = lag + DETERMINISTIC_TERMS;
        if nobs <= k {
            return Err(PairsError::StationarityTestError {
                reason: format!("Lag search ran out of observations at lag {lag}"),
            });
        }
        let fit = least_squares(&rows, &y).ok_or_else(|| PairsError::StationarityTestError {
            reason: format!("Singular regression during lag search at lag {lag}"),
        })?;

        let n_dec = Decimal::from(nobs);
        let log_sigma2 = ln_decimal(fit.ssr / n_dec).ok_or_else(|| {
            PairsError::StationarityTestError {
                reason: format!("Zero residual variance during lag search at lag {lag}"),
            }
        })?;
        let penalty = match criterion {
            LagSelection::Aic => dec!(2) * Decimal::from(k),
            _ => {
                Decimal::from(k)
                    * ln_decimal(n_dec).ok_or_else(|| PairsError::StationarityTestError {
                        reason: "Empty lag-search sample".into(),
                    })?
            }
        };
        let ic = n_dec * log_sigma2 + penalty;

        if best.map_or(true, |(_, b)| ic < b) {
            best = Some((lag, ic));
        }
    }

    best.map(|(lag, _)| lag)
        .ok_or_else(|| PairsError::StationarityTestError {
            reason: "Lag search produced no candidate".into(),
        })
}

// ---------------------------------------------------------------------------
// Standalone operation
// ---------------------------------------------------------------------------

/// Input for a standalone ADF test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdfInput {
    /// Series to test, oldest first
    pub series: Vec<Decimal>,
    #[serde(default)]
    pub lag_selection: LagSelection,
    /// Upper bound for the lag search (default: Schwert rule)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lag: Option<usize>,
    #[serde(default)]
    pub critical_values: CriticalValueTable,
}

#[derive(Serialize)]
struct AdfAssumptions {
    lag_selection: LagSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_lag: Option<usize>,
    critical_values: CriticalValueTable,
    observations: usize,
}

/// Output of a standalone ADF test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdfOutput {
    pub statistic: Decimal,
    pub lag_order: usize,
    pub nobs: usize,
    pub critical_values: CriticalValues,
    pub stationary_at_1pct: bool,
    pub stationary_at_5pct: bool,
    pub stationary_at_10pct: bool,
}

/// Run an augmented Dickey-Fuller test on a single series.
pub fn run_adf(input: &AdfInput) -> PairsResult<ComputationOutput<AdfOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let tester = AugmentedDickeyFuller::new()
        .with_max_lag(input.max_lag)
        .with_table(input.critical_values);
    let report = tester.test(&input.series, input.lag_selection)?;

    if report.nobs < 50 {
        warnings.push(format!(
            "Only {} observations in the test regression; ADF has low power in short samples",
            report.nobs
        ));
    }

    let output = AdfOutput {
        statistic: report.statistic,
        lag_order: report.lag_order,
        nobs: report.nobs,
        critical_values: report.critical_values,
        stationary_at_1pct: report.rejects_null_at(SignificanceLevel::OnePercent),
        stationary_at_5pct: report.rejects_null_at(SignificanceLevel::FivePercent),
        stationary_at_10pct: report.rejects_null_at(SignificanceLevel::TenPercent),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Augmented Dickey-Fuller (constant, information-criterion lag selection)",
        &AdfAssumptions {
            lag_selection: input.lag_selection,
            max_lag: input.max_lag,
            critical_values: input.critical_values,
            observations: input.series.len(),
        },
        warnings,
        elapsed,
        output,
    ))
}
