use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::SignificanceLevel;

/// Which response surface to read critical values from.
///
/// `DickeyFuller` is the plain single-series ADF table. `EngleGranger`
/// accounts for the cointegrating vector having been estimated from two
/// series, which pushes the critical values further left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalValueTable {
    #[default]
    DickeyFuller,
    EngleGranger,
}

/// Critical values of the tau statistic at the three conventional levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_percent: Decimal,
    pub five_percent: Decimal,
    pub ten_percent: Decimal,
}

impl CriticalValues {
    pub fn at(&self, level: SignificanceLevel) -> Decimal {
        match level {
            SignificanceLevel::OnePercent => self.one_percent,
            SignificanceLevel::FivePercent => self.five_percent,
            SignificanceLevel::TenPercent => self.ten_percent,
        }
    }
}

// MacKinnon (2010) response surfaces, constant-only regression.
// cv(T) = b0 + b1/T + b2/T^2 + b3/T^3, rows are 1%, 5%, 10%.
const DICKEY_FULLER: [[Decimal; 4]; 3] = [
    [dec!(-3.43035), dec!(-6.5393), dec!(-16.786), dec!(-79.433)],
    [dec!(-2.86154), dec!(-2.8903), dec!(-4.234), dec!(-40.040)],
    [dec!(-2.56677), dec!(-1.5384), dec!(-2.809), dec!(0)],
];

const ENGLE_GRANGER: [[Decimal; 4]; 3] = [
    [dec!(-3.89644), dec!(-10.9519), dec!(-22.527), dec!(0)],
    [dec!(-3.33613), dec!(-6.1101), dec!(-6.823), dec!(0)],
    [dec!(-3.04445), dec!(-4.2412), dec!(-2.720), dec!(0)],
];

impl CriticalValueTable {
    /// Finite-sample critical values for a regression with `nobs` observations.
    pub fn critical_values(self, nobs: usize) -> CriticalValues {
        let table = match self {
            CriticalValueTable::DickeyFuller => &DICKEY_FULLER,
            CriticalValueTable::EngleGranger => &ENGLE_GRANGER,
        };
        let inv_t = if nobs == 0 {
            Decimal::ZERO
        } else {
            Decimal::ONE / Decimal::from(nobs)
        };
        let surface = |b: &[Decimal; 4]| {
            b[0] + b[1] * inv_t + b[2] * inv_t * inv_t + b[3] * inv_t * inv_t * inv_t
        };
        CriticalValues {
            one_percent: surface(&table[0]),
            five_percent: surface(&table[1]),
            ten_percent: surface(&table[2]),
        }
    }
}
