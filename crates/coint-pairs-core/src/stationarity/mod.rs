//! Unit-root testing of spread series.
//!
//! The rest of the pipeline only depends on the [`StationarityTester`] trait;
//! [`AugmentedDickeyFuller`] is the implementation used by default.

pub mod adf;
pub mod critical_values;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PairsResult;

pub use adf::{run_adf, AdfInput, AdfOutput, AugmentedDickeyFuller};
pub use critical_values::{CriticalValueTable, CriticalValues};

/// How the number of lagged differences in the test regression is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LagSelection {
    /// Minimise the Bayesian information criterion.
    #[default]
    Bic,
    /// Minimise the Akaike information criterion.
    Aic,
    /// Use exactly this many lags.
    Fixed(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceLevel {
    OnePercent,
    #[default]
    FivePercent,
    TenPercent,
}

/// Result of a unit-root test on one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityReport {
    /// Test statistic; more negative means stronger evidence against a unit root.
    pub statistic: Decimal,
    /// Number of lagged differences used in the final regression
    pub lag_order: usize,
    /// Observations in the final regression
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

impl StationarityReport {
    /// True when the unit-root null is rejected at `level`.
    pub fn rejects_null_at(&self, level: SignificanceLevel) -> bool {
        self.statistic < self.critical_values.at(level)
    }
}

/// A unit-root test over a residual series.
pub trait StationarityTester {
    fn test(&self, series: &[Decimal], lag_selection: LagSelection)
        -> PairsResult<StationarityReport>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn report(statistic: Decimal) -> StationarityReport {
        StationarityReport {
            statistic,
            lag_order: 0,
            nobs: 100,
            critical_values: CriticalValues {
                one_percent: dec!(-3.5),
                five_percent: dec!(-2.9),
                ten_percent: dec!(-2.6),
            },
        }
    }

    #[test]
    fn test_rejects_null_strictly_below_critical_value() {
        let r = report(dec!(-3.0));
        assert!(!r.rejects_null_at(SignificanceLevel::OnePercent));
        assert!(r.rejects_null_at(SignificanceLevel::FivePercent));
        assert!(r.rejects_null_at(SignificanceLevel::TenPercent));
        assert!(!report(dec!(-2.9)).rejects_null_at(SignificanceLevel::FivePercent));
    }

    #[test]
    fn test_lag_selection_serde() {
        assert_eq!(serde_json::to_string(&LagSelection::Bic).unwrap(), "\"bic\"");
        let fixed: LagSelection = serde_json::from_str(r#"{"fixed":3}"#).unwrap();
        assert_eq!(fixed, LagSelection::Fixed(3));
    }
}
