use rust_decimal::{Decimal, MathematicalOps};

use crate::error::PairsError;
use crate::PairsResult;

/// Pivots smaller than this are treated as zero when inverting.
const PIVOT_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 20);

// ---------------------------------------------------------------------------
// Moments
// ---------------------------------------------------------------------------

// The moment helpers return `None` when an intermediate leaves the Decimal
// range; callers turn that into `out_of_range`.

pub(crate) fn out_of_range(context: &str) -> PairsError {
    PairsError::FinancialImpossibility(format!("{context} leaves the Decimal range"))
}

pub(crate) fn checked_sum<'a>(values: impl IntoIterator<Item = &'a Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
}

/// Arithmetic mean. Zero for an empty slice.
pub(crate) fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return Some(Decimal::ZERO);
    }
    Some(checked_sum(values)? / Decimal::from(values.len()))
}

/// Sample variance (n - 1 denominator). Zero for fewer than two values.
pub(crate) fn sample_variance(values: &[Decimal]) -> Option<Decimal> {
    let n = values.len();
    if n < 2 {
        return Some(Decimal::ZERO);
    }
    let m = mean(values)?;
    let squares = values.iter().try_fold(Decimal::ZERO, |acc, v| {
        let d = v.checked_sub(m)?;
        acc.checked_add(d.checked_mul(d)?)
    })?;
    Some(squares / Decimal::from(n - 1))
}

pub(crate) fn sample_std_dev(values: &[Decimal]) -> Option<Decimal> {
    sample_variance(values).map(sqrt_decimal)
}

pub(crate) fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}

/// Natural log, `None` outside the domain.
pub(crate) fn ln_decimal(val: Decimal) -> Option<Decimal> {
    if val <= Decimal::ZERO {
        return None;
    }
    val.checked_ln()
}

/// Pearson correlation coefficient between two equal-length series.
pub fn pearson_correlation(x: &[Decimal], y: &[Decimal]) -> PairsResult<Decimal> {
    if x.len() != y.len() {
        return Err(PairsError::InvalidInput {
            field: "y".into(),
            reason: format!("Length {} does not match x length {}", y.len(), x.len()),
        });
    }
    let n = x.len();
    if n < 2 {
        return Err(PairsError::InsufficientData(
            "Correlation needs at least 2 observations".into(),
        ));
    }
    let overflow = || out_of_range("Pearson correlation");
    let mean_x = mean(x).ok_or_else(overflow)?;
    let mean_y = mean(y).ok_or_else(overflow)?;

    let mut cov = Decimal::ZERO;
    let mut var_x = Decimal::ZERO;
    let mut var_y = Decimal::ZERO;
    for i in 0..n {
        let (dx, dy) = x[i]
            .checked_sub(mean_x)
            .zip(y[i].checked_sub(mean_y))
            .ok_or_else(overflow)?;
        cov = dx
            .checked_mul(dy)
            .and_then(|p| cov.checked_add(p))
            .ok_or_else(overflow)?;
        var_x = dx
            .checked_mul(dx)
            .and_then(|p| var_x.checked_add(p))
            .ok_or_else(overflow)?;
        var_y = dy
            .checked_mul(dy)
            .and_then(|p| var_y.checked_add(p))
            .ok_or_else(overflow)?;
    }

    let denom = sqrt_decimal(var_x) * sqrt_decimal(var_y);
    if denom == Decimal::ZERO {
        return Err(PairsError::DegenerateInput {
            context: "Pearson correlation".into(),
        });
    }
    Ok(cov / denom)
}

// ---------------------------------------------------------------------------
// Dense least squares
// ---------------------------------------------------------------------------

/// Solution of `y = X·b + e` by the normal equations.
#[derive(Debug, Clone)]
pub(crate) struct LeastSquares {
    pub coefficients: Vec<Decimal>,
    /// Sum of squared residuals.
    pub ssr: Decimal,
    /// `(X'X)^-1`, needed for coefficient standard errors.
    pub xtx_inv: Vec<Vec<Decimal>>,
}

impl LeastSquares {
    /// Standard error of coefficient `idx` given the residual degrees of freedom.
    pub fn std_error(&self, idx: usize, dof: usize) -> Option<Decimal> {
        if dof == 0 {
            return None;
        }
        let sigma2 = self.ssr.checked_div(Decimal::from(dof))?;
        let var = sigma2.checked_mul(self.xtx_inv[idx][idx])?;
        if var <= Decimal::ZERO {
            return None;
        }
        var.sqrt()
    }
}

/// Ordinary least squares over design rows. `None` when the design is
/// singular or the arithmetic leaves Decimal range.
pub(crate) fn least_squares(rows: &[Vec<Decimal>], y: &[Decimal]) -> Option<LeastSquares> {
    let k = rows.first()?.len();
    if k == 0 || rows.len() != y.len() || rows.len() < k {
        return None;
    }

    let mut xtx = vec![vec![Decimal::ZERO; k]; k];
    let mut xty = vec![Decimal::ZERO; k];
    for (row, target) in rows.iter().zip(y) {
        for i in 0..k {
            xty[i] = xty[i].checked_add(row[i].checked_mul(*target)?)?;
            for j in i..k {
                xtx[i][j] = xtx[i][j].checked_add(row[i].checked_mul(row[j])?)?;
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    let xtx_inv = invert(xtx)?;

    let mut coefficients = vec![Decimal::ZERO; k];
    for i in 0..k {
        for j in 0..k {
            coefficients[i] = coefficients[i].checked_add(xtx_inv[i][j].checked_mul(xty[j])?)?;
        }
    }

    let mut ssr = Decimal::ZERO;
    for (row, target) in rows.iter().zip(y) {
        let mut fitted = Decimal::ZERO;
        for i in 0..k {
            fitted = fitted.checked_add(row[i].checked_mul(coefficients[i])?)?;
        }
        let e = target.checked_sub(fitted)?;
        ssr = ssr.checked_add(e.checked_mul(e)?)?;
    }

    Some(LeastSquares {
        coefficients,
        ssr,
        xtx_inv,
    })
}

/// Gauss-Jordan inverse with partial pivoting.
fn invert(mut a: Vec<Vec<Decimal>>) -> Option<Vec<Vec<Decimal>>> {
    let n = a.len();
    let mut inv: Vec<Vec<Decimal>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| if i == j { Decimal::ONE } else { Decimal::ZERO })
                .collect()
        })
        .collect();

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| a[i][col].abs().cmp(&a[j][col].abs()))?;
        if a[pivot_row][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        let pivot = a[col][col];
        for j in 0..n {
            a[col][j] = a[col][j].checked_div(pivot)?;
            inv[col][j] = inv[col][j].checked_div(pivot)?;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor.is_zero() {
                continue;
            }
            for j in 0..n {
                a[row][j] = a[row][j].checked_sub(factor.checked_mul(a[col][j])?)?;
                inv[row][j] = inv[row][j].checked_sub(factor.checked_mul(inv[col][j])?)?;
            }
        }
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mean_and_sample_variance() {
        let v = vec![dec!(2), dec!(4), dec!(4), dec!(4), dec!(5), dec!(5), dec!(7), dec!(9)];
        assert_eq!(mean(&v), Some(dec!(5)));
        // Sum of squared deviations is 32 over 7 degrees of freedom
        assert_eq!(sample_variance(&v), Some(dec!(32) / dec!(7)));
    }

    #[test]
    fn test_variance_of_single_value_is_zero() {
        assert_eq!(sample_variance(&[dec!(3)]), Some(Decimal::ZERO));
    }

    #[test]
    fn test_moments_out_of_range_are_none() {
        assert_eq!(mean(&[Decimal::MAX, Decimal::MAX]), None);
        assert_eq!(sample_variance(&[Decimal::MAX, -Decimal::MAX]), None);
        assert!(matches!(
            pearson_correlation(&[Decimal::MAX, -Decimal::MAX], &[dec!(1), dec!(2)]),
            Err(PairsError::FinancialImpossibility(_))
        ));
    }

    #[test]
    fn test_sqrt_decimal() {
        assert!((sqrt_decimal(dec!(16)) - dec!(4)).abs() < dec!(0.0000001));
        assert_eq!(sqrt_decimal(dec!(-1)), Decimal::ZERO);
    }

    #[test]
    fn test_ln_decimal_domain() {
        assert!(ln_decimal(Decimal::ZERO).is_none());
        assert!(ln_decimal(dec!(-2)).is_none());
        let e = ln_decimal(dec!(2.718281828459045)).unwrap();
        assert!((e - Decimal::ONE).abs() < dec!(0.000001));
    }

    #[test]
    fn test_pearson_perfect_positive() {
        let x: Vec<Decimal> = (1..=10).map(Decimal::from).collect();
        let y: Vec<Decimal> = (1..=10).map(|i| Decimal::from(i * 2)).collect();
        let r = pearson_correlation(&x, &y).unwrap();
        assert!(r > dec!(0.999));
    }

    #[test]
    fn test_pearson_zero_variance() {
        let x = vec![dec!(1); 5];
        let y: Vec<Decimal> = (1..=5).map(Decimal::from).collect();
        assert!(matches!(
            pearson_correlation(&x, &y),
            Err(PairsError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn test_least_squares_exact_line() {
        // y = 1 + 2x
        let rows: Vec<Vec<Decimal>> = (0..6)
            .map(|i| vec![Decimal::ONE, Decimal::from(i)])
            .collect();
        let y: Vec<Decimal> = (0..6).map(|i| Decimal::from(1 + 2 * i)).collect();
        let fit = least_squares(&rows, &y).unwrap();
        assert!((fit.coefficients[0] - dec!(1)).abs() < dec!(0.0000001));
        assert!((fit.coefficients[1] - dec!(2)).abs() < dec!(0.0000001));
        assert!(fit.ssr.abs() < dec!(0.0000001));
    }

    #[test]
    fn test_least_squares_singular_design() {
        let rows: Vec<Vec<Decimal>> = (0..5)
            .map(|i| vec![Decimal::from(i), Decimal::from(2 * i)])
            .collect();
        let y: Vec<Decimal> = (0..5).map(Decimal::from).collect();
        assert!(least_squares(&rows, &y).is_none());
    }

    #[test]
    fn test_invert_two_by_two() {
        let m = vec![vec![dec!(4), dec!(7)], vec![dec!(2), dec!(6)]];
        let inv = invert(m).unwrap();
        assert!((inv[0][0] - dec!(0.6)).abs() < dec!(0.0000001));
        assert!((inv[0][1] - dec!(-0.7)).abs() < dec!(0.0000001));
        assert!((inv[1][0] - dec!(-0.2)).abs() < dec!(0.0000001));
        assert!((inv[1][1] - dec!(0.4)).abs() < dec!(0.0000001));
    }
}
