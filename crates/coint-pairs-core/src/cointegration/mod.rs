//! Engle-Granger style estimation of the cointegrating relation between two
//! legs: static OLS for the hedge ratio, a unit-root test on the residuals,
//! and choice of which leg is the dependent variable.

pub mod regression;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::alignment::{align, Transform};
use crate::stationarity::{
    AugmentedDickeyFuller, CriticalValueTable, CriticalValues, LagSelection, SignificanceLevel,
    StationarityReport, StationarityTester,
};
use crate::stats::{ln_decimal, mean, out_of_range, pearson_correlation, sample_std_dev};
use crate::types::{with_metadata, ComputationOutput, PriceSeries};
use crate::PairsResult;

pub use regression::{fit, RegressionFit};

/// Which leg plays the dependent variable in the cointegrating regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// A regressed on B
    ADependent,
    /// B regressed on A
    BDependent,
}

impl Orientation {
    /// Returns `(dependent, independent)` for this orientation.
    pub fn legs<'a, T>(self, a: &'a [T], b: &'a [T]) -> (&'a [T], &'a [T]) {
        match self {
            Orientation::ADependent => (a, b),
            Orientation::BDependent => (b, a),
        }
    }
}

/// One fitted orientation together with its residual unit-root test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationCandidate {
    pub orientation: Orientation,
    pub fit: RegressionFit,
    pub report: StationarityReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationChoice {
    pub chosen: OrientationCandidate,
    pub rejected: OrientationCandidate,
}

/// Keep the candidate with the more negative statistic. On a tie the first
/// candidate wins.
pub fn select_orientation(
    first: OrientationCandidate,
    second: OrientationCandidate,
) -> OrientationChoice {
    if second.report.statistic < first.report.statistic {
        OrientationChoice {
            chosen: second,
            rejected: first,
        }
    } else {
        OrientationChoice {
            chosen: first,
            rejected: second,
        }
    }
}

fn candidate(
    orientation: Orientation,
    a: &[Decimal],
    b: &[Decimal],
    tester: &dyn StationarityTester,
    lag_selection: LagSelection,
) -> PairsResult<OrientationCandidate> {
    let (dependent, independent) = orientation.legs(a, b);
    let fit = fit(dependent, independent)?;
    let report = tester.test(&fit.residuals, lag_selection)?;
    debug!(?orientation, hedge_ratio = %fit.slope, statistic = %report.statistic, "fitted orientation");
    Ok(OrientationCandidate {
        orientation,
        fit,
        report,
    })
}

/// Fit both orientations and keep the one whose residuals reject the unit
/// root more strongly. A-dependent is evaluated first and wins ties.
pub fn choose_orientation(
    a: &[Decimal],
    b: &[Decimal],
    tester: &dyn StationarityTester,
    lag_selection: LagSelection,
) -> PairsResult<OrientationChoice> {
    let a_dep = candidate(Orientation::ADependent, a, b, tester, lag_selection)?;
    let b_dep = candidate(Orientation::BDependent, a, b, tester, lag_selection)?;
    let choice = select_orientation(a_dep, b_dep);
    info!(
        orientation = ?choice.chosen.orientation,
        statistic = %choice.chosen.report.statistic,
        alternative = %choice.rejected.report.statistic,
        "selected cointegration orientation"
    );
    Ok(choice)
}

/// Mean-reversion half-life of a spread, in periods.
///
/// Regresses ds_t on (s_{t-1} - mean) and returns -ln 2 / ln(1 + phi).
/// `None` unless -1 < phi < 0, i.e. the spread actually mean-reverts.
pub fn half_life(spread: &[Decimal]) -> Option<Decimal> {
    if spread.len() < 3 {
        return None;
    }
    let m = mean(spread)?;
    let lagged: Vec<Decimal> = spread[..spread.len() - 1]
        .iter()
        .map(|s| s.checked_sub(m))
        .collect::<Option<_>>()?;
    let deltas: Vec<Decimal> = spread
        .windows(2)
        .map(|w| w[1].checked_sub(w[0]))
        .collect::<Option<_>>()?;
    let phi = fit(&deltas, &lagged).ok()?.slope;
    if phi >= Decimal::ZERO || phi <= -Decimal::ONE {
        return None;
    }
    let ln2 = ln_decimal(dec!(2))?;
    let ln_decay = ln_decimal(Decimal::ONE + phi)?;
    if ln_decay.is_zero() {
        return None;
    }
    Some(-ln2 / ln_decay)
}

// ---------------------------------------------------------------------------
// Standalone operation
// ---------------------------------------------------------------------------

/// Input for a cointegration analysis of two price series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CointegrationInput {
    pub series_a: PriceSeries,
    pub series_b: PriceSeries,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub lag_selection: LagSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lag: Option<usize>,
    #[serde(default)]
    pub critical_values: CriticalValueTable,
    #[serde(default)]
    pub significance: SignificanceLevel,
}

/// Parameters echoed in the output envelope; the price series stay out.
#[derive(Serialize)]
struct CointegrationAssumptions {
    transform: Transform,
    lag_selection: LagSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_lag: Option<usize>,
    critical_values: CriticalValueTable,
    significance: SignificanceLevel,
}

impl From<&CointegrationInput> for CointegrationAssumptions {
    fn from(input: &CointegrationInput) -> Self {
        Self {
            transform: input.transform,
            lag_selection: input.lag_selection,
            max_lag: input.max_lag,
            critical_values: input.critical_values,
            significance: input.significance,
        }
    }
}

/// Output of a cointegration analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CointegrationOutput {
    pub dependent: String,
    pub independent: String,
    pub orientation: Orientation,
    pub hedge_ratio: Decimal,
    pub intercept: Decimal,
    /// ADF statistic of the chosen orientation's residuals
    pub adf_statistic: Decimal,
    /// ADF statistic of the other orientation
    pub alternative_adf_statistic: Decimal,
    pub lag_order: usize,
    pub critical_values: CriticalValues,
    pub is_cointegrated: bool,
    /// Pearson correlation of the transformed legs
    pub correlation: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub half_life: Option<Decimal>,
    pub spread_mean: Decimal,
    pub spread_std: Decimal,
    pub observations: usize,
}

/// Align two series and run the two-orientation Engle-Granger procedure.
pub fn analyze_cointegration(
    input: &CointegrationInput,
) -> PairsResult<ComputationOutput<CointegrationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let pair = align(&input.series_a, &input.series_b, input.transform)?;
    let tester = AugmentedDickeyFuller::new()
        .with_max_lag(input.max_lag)
        .with_table(input.critical_values);
    let choice = choose_orientation(pair.a(), pair.b(), &tester, input.lag_selection)?;
    let chosen = &choice.chosen;

    let (dependent, independent) = match chosen.orientation {
        Orientation::ADependent => (pair.symbol_a(), pair.symbol_b()),
        Orientation::BDependent => (pair.symbol_b(), pair.symbol_a()),
    };
    let correlation = pearson_correlation(pair.a(), pair.b())?;
    let is_cointegrated = chosen.report.rejects_null_at(input.significance);
    let half_life = half_life(&chosen.fit.residuals);

    if !is_cointegrated {
        warnings.push(format!(
            "Residual unit root not rejected at {:?} (statistic {}, critical value {})",
            input.significance,
            chosen.report.statistic.round_dp(4),
            chosen.report.critical_values.at(input.significance).round_dp(4)
        ));
    }
    if half_life.is_none() {
        warnings.push("Spread shows no mean reversion; half-life undefined".into());
    }

    let output = CointegrationOutput {
        dependent: dependent.to_string(),
        independent: independent.to_string(),
        orientation: chosen.orientation,
        hedge_ratio: chosen.fit.slope,
        intercept: chosen.fit.intercept,
        adf_statistic: chosen.report.statistic,
        alternative_adf_statistic: choice.rejected.report.statistic,
        lag_order: chosen.report.lag_order,
        critical_values: chosen.report.critical_values,
        is_cointegrated,
        correlation,
        half_life,
        spread_mean: mean(&chosen.fit.residuals).ok_or_else(|| out_of_range("Spread mean"))?,
        spread_std: sample_std_dev(&chosen.fit.residuals)
            .ok_or_else(|| out_of_range("Spread standard deviation"))?,
        observations: pair.len(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Engle-Granger two-step: static OLS, ADF on residuals, best of both orientations",
        &CointegrationAssumptions::from(input),
        warnings,
        elapsed,
        output,
    ))
}
