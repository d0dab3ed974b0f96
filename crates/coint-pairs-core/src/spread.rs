use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::PairsError;
use crate::stats::{mean, out_of_range, sample_std_dev};
use crate::types::ZScore;
use crate::PairsResult;

/// A residual spread standardized against fixed reference statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZScoreSeries {
    /// Mean of the reference window
    pub mean: Decimal,
    /// Sample standard deviation of the reference window
    pub std_dev: Decimal,
    pub values: Vec<ZScore>,
}

/// Standardize `residuals` as z_t = (e_t - mu) / sigma.
///
/// mu and sigma come from `reference_window` when given (typically the
/// training indices) and are applied unchanged to every element, test
/// segment included. Without a window the whole series is the reference.
pub fn standardize(
    residuals: &[Decimal],
    reference_window: Option<Range<usize>>,
) -> PairsResult<ZScoreSeries> {
    let window = reference_window.unwrap_or(0..residuals.len());
    if window.start > window.end || window.end > residuals.len() {
        return Err(PairsError::InvalidInput {
            field: "reference_window".into(),
            reason: format!(
                "{}..{} is outside a series of length {}",
                window.start,
                window.end,
                residuals.len()
            ),
        });
    }
    let reference = &residuals[window];
    if reference.len() < 2 {
        return Err(PairsError::InsufficientData(format!(
            "Reference window has {} values; standardization needs at least 2",
            reference.len()
        )));
    }

    let overflow = || out_of_range("Spread standardization");
    let mu = mean(reference).ok_or_else(overflow)?;
    let sigma = sample_std_dev(reference).ok_or_else(overflow)?;
    if sigma.is_zero() {
        return Err(PairsError::DegenerateSpread {
            context: "spread standardization".into(),
        });
    }

    Ok(ZScoreSeries {
        mean: mu,
        std_dev: sigma,
        values: residuals
            .iter()
            .map(|e| e.checked_sub(mu).and_then(|d| d.checked_div(sigma)))
            .collect::<Option<_>>()
            .ok_or_else(overflow)?,
    })
}
