use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::alignment::Transform;
use crate::error::PairsError;
use crate::signal::{SignalGenerator, StopLoss, DEFAULT_LONG_THRESHOLD, DEFAULT_SHORT_THRESHOLD};
use crate::stationarity::{AugmentedDickeyFuller, CriticalValueTable, LagSelection, SignificanceLevel};
use crate::PairsResult;

fn default_long_threshold() -> Decimal {
    DEFAULT_LONG_THRESHOLD
}

fn default_short_threshold() -> Decimal {
    DEFAULT_SHORT_THRESHOLD
}

fn default_train_fraction() -> Option<Decimal> {
    Some(dec!(0.7))
}

fn default_periods_per_year() -> u32 {
    252
}

/// Parameters of a pairs backtest run. Every field has a default, so an
/// empty document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairsConfig {
    #[serde(default = "default_long_threshold")]
    pub long_threshold: Decimal,
    #[serde(default = "default_short_threshold")]
    pub short_threshold: Decimal,
    /// Share of the aligned sample used to fit and standardize. `None` uses
    /// the whole sample for both.
    #[serde(default = "default_train_fraction")]
    pub train_fraction: Option<Decimal>,
    #[serde(default)]
    pub lag_selection: LagSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lag: Option<usize>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub significance: SignificanceLevel,
    #[serde(default)]
    pub critical_values: CriticalValueTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<StopLoss>,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: u32,
}

impl Default for PairsConfig {
    fn default() -> Self {
        Self {
            long_threshold: default_long_threshold(),
            short_threshold: default_short_threshold(),
            train_fraction: default_train_fraction(),
            lag_selection: LagSelection::default(),
            max_lag: None,
            transform: Transform::default(),
            significance: SignificanceLevel::default(),
            critical_values: CriticalValueTable::default(),
            stop_loss: None,
            periods_per_year: default_periods_per_year(),
        }
    }
}

impl PairsConfig {
    pub fn validate(&self) -> PairsResult<()> {
        self.signal_generator().validate()?;
        if let Some(fraction) = self.train_fraction {
            if fraction <= Decimal::ZERO || fraction >= Decimal::ONE {
                return Err(PairsError::InvalidInput {
                    field: "train_fraction".into(),
                    reason: format!("Must lie strictly between 0 and 1, got {fraction}"),
                });
            }
        }
        if self.periods_per_year == 0 {
            return Err(PairsError::InvalidInput {
                field: "periods_per_year".into(),
                reason: "Must be positive".into(),
            });
        }
        Ok(())
    }

    pub fn signal_generator(&self) -> SignalGenerator {
        SignalGenerator {
            long_threshold: self.long_threshold,
            short_threshold: self.short_threshold,
            stop_loss: self.stop_loss,
        }
    }

    pub fn tester(&self) -> AugmentedDickeyFuller {
        AugmentedDickeyFuller::new()
            .with_max_lag(self.max_lag)
            .with_table(self.critical_values)
    }
}
