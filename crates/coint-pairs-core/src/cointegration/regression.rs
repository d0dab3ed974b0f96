use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PairsError;
use crate::stats::{mean, out_of_range};
use crate::PairsResult;

/// Static least-squares fit `dependent = intercept + slope * independent + e`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionFit {
    pub intercept: Decimal,
    /// Hedge ratio (gamma)
    pub slope: Decimal,
    /// Residuals over the window the fit was estimated on
    pub residuals: Vec<Decimal>,
}

impl RegressionFit {
    /// Residual for a single observation.
    pub fn residual(&self, dependent: Decimal, independent: Decimal) -> PairsResult<Decimal> {
        self.slope
            .checked_mul(independent)
            .and_then(|hedge| self.intercept.checked_add(hedge))
            .and_then(|fitted| dependent.checked_sub(fitted))
            .ok_or_else(|| out_of_range("Regression residual"))
    }

    /// Apply the estimated coefficients to another window.
    ///
    /// This is the out-of-sample variant: the coefficients stay those of the
    /// estimation window, whatever window is passed here.
    pub fn residuals_for(
        &self,
        dependent: &[Decimal],
        independent: &[Decimal],
    ) -> PairsResult<Vec<Decimal>> {
        check_lengths(dependent, independent)?;
        dependent
            .iter()
            .zip(independent)
            .map(|(y, x)| self.residual(*y, *x))
            .collect()
    }
}

fn check_lengths(dependent: &[Decimal], independent: &[Decimal]) -> PairsResult<()> {
    if dependent.len() != independent.len() {
        return Err(PairsError::InvalidInput {
            field: "independent".into(),
            reason: format!(
                "Independent series has {} values but dependent has {}",
                independent.len(),
                dependent.len()
            ),
        });
    }
    Ok(())
}

/// Ordinary least squares of `dependent` on `independent` with intercept.
///
/// slope = Cov(dep, indep) / Var(indep), intercept = mean(dep) - slope * mean(indep).
pub fn fit(dependent: &[Decimal], independent: &[Decimal]) -> PairsResult<RegressionFit> {
    check_lengths(dependent, independent)?;
    let n = dependent.len();
    if n < 2 {
        return Err(PairsError::InsufficientData(format!(
            "Regression needs at least 2 observations, got {n}"
        )));
    }

    let overflow = || out_of_range("OLS hedge ratio");
    let mean_dep = mean(dependent).ok_or_else(overflow)?;
    let mean_indep = mean(independent).ok_or_else(overflow)?;

    let mut cov = Decimal::ZERO;
    let mut var = Decimal::ZERO;
    for i in 0..n {
        let (dx, dy) = independent[i]
            .checked_sub(mean_indep)
            .zip(dependent[i].checked_sub(mean_dep))
            .ok_or_else(overflow)?;
        cov = dx
            .checked_mul(dy)
            .and_then(|p| cov.checked_add(p))
            .ok_or_else(overflow)?;
        var = dx
            .checked_mul(dx)
            .and_then(|p| var.checked_add(p))
            .ok_or_else(overflow)?;
    }

    if var == Decimal::ZERO {
        return Err(PairsError::DegenerateInput {
            context: "OLS hedge ratio: independent series is constant".into(),
        });
    }

    let slope = cov.checked_div(var).ok_or_else(overflow)?;
    let intercept = slope
        .checked_mul(mean_indep)
        .and_then(|shift| mean_dep.checked_sub(shift))
        .ok_or_else(overflow)?;

    let mut fit = RegressionFit {
        intercept,
        slope,
        residuals: Vec::with_capacity(n),
    };
    fit.residuals = fit.residuals_for(dependent, independent)?;
    Ok(fit)
}
