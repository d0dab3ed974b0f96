use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::PairsError;
use crate::stats::{mean, out_of_range, sqrt_decimal};
use crate::PairsResult;

/// Jarque-Bera normality test of a residual spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JarqueBera {
    pub statistic: Decimal,
    /// Upper tail of chi-squared with 2 degrees of freedom
    pub p_value: Decimal,
    pub skewness: Decimal,
    /// Kurtosis minus 3
    pub excess_kurtosis: Decimal,
    pub nobs: usize,
}

impl JarqueBera {
    pub fn is_normal_at(&self, alpha: Decimal) -> bool {
        self.p_value >= alpha
    }
}

pub fn jarque_bera(series: &[Decimal]) -> PairsResult<JarqueBera> {
    let n = series.len();
    if n < 3 {
        return Err(PairsError::InsufficientData(format!(
            "Jarque-Bera needs at least 3 observations, got {n}"
        )));
    }
    let n_dec = Decimal::from(n);
    let overflow = || out_of_range("Jarque-Bera moments");
    let mu = mean(series).ok_or_else(overflow)?;
    let (mut m2, mut m3, mut m4) = (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
    for x in series {
        let d = x.checked_sub(mu).ok_or_else(overflow)?;
        let d2 = d.checked_mul(d).ok_or_else(overflow)?;
        m2 = m2.checked_add(d2).ok_or_else(overflow)?;
        m3 = d2
            .checked_mul(d)
            .and_then(|d3| m3.checked_add(d3))
            .ok_or_else(overflow)?;
        m4 = d2
            .checked_mul(d2)
            .and_then(|d4| m4.checked_add(d4))
            .ok_or_else(overflow)?;
    }
    m2 /= n_dec;
    m3 /= n_dec;
    m4 /= n_dec;

    if m2.is_zero() {
        return Err(PairsError::DegenerateSpread {
            context: "Jarque-Bera moments".into(),
        });
    }

    let m2_squared = m2.checked_mul(m2).ok_or_else(overflow)?;
    let skewness = m2
        .checked_mul(sqrt_decimal(m2))
        .and_then(|scale| m3.checked_div(scale))
        .ok_or_else(overflow)?;
    let excess_kurtosis = m4.checked_div(m2_squared).ok_or_else(overflow)? - dec!(3);
    let statistic = skewness
        .checked_mul(skewness)
        .zip(excess_kurtosis.checked_mul(excess_kurtosis))
        .and_then(|(s2, k2)| s2.checked_add(k2 / dec!(4)))
        .and_then(|jb| jb.checked_mul(n_dec / dec!(6)))
        .ok_or_else(overflow)?;

    let chi2 = ChiSquared::new(2.0).map_err(|e| PairsError::InvalidInput {
        field: "degrees_of_freedom".into(),
        reason: e.to_string(),
    })?;
    let tail = 1.0 - chi2.cdf(statistic.to_f64().unwrap_or(f64::MAX));
    let p_value = Decimal::from_f64(tail).unwrap_or(Decimal::ZERO);

    Ok(JarqueBera {
        statistic,
        p_value,
        skewness,
        excess_kurtosis,
        nobs: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_symmetric_sample_has_zero_skew() {
        let x = vec![dec!(-2), dec!(-1), dec!(0), dec!(1), dec!(2)];
        let jb = jarque_bera(&x).unwrap();
        assert_eq!(jb.skewness, Decimal::ZERO);
        // m2 = 2, m4 = 6.8, kurtosis 1.7
        assert_eq!(jb.excess_kurtosis, dec!(-1.3));
    }

    #[test]
    fn test_gaussian_like_sample_not_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        // Sum of 12 uniforms minus 6 is close to standard normal
        let x: Vec<Decimal> = (0..500)
            .map(|_| {
                let s: f64 = (0..12).map(|_| rng.gen::<f64>()).sum::<f64>() - 6.0;
                Decimal::from_f64(s).unwrap().round_dp(8)
            })
            .collect();
        let jb = jarque_bera(&x).unwrap();
        assert!(jb.is_normal_at(dec!(0.01)), "p-value {}", jb.p_value);
    }

    #[test]
    fn test_heavily_skewed_sample_rejected() {
        let mut x = vec![dec!(0); 95];
        x.extend(vec![dec!(50); 5]);
        let jb = jarque_bera(&x).unwrap();
        assert!(jb.skewness > Decimal::ZERO);
        assert!(!jb.is_normal_at(dec!(0.05)));
    }

    #[test]
    fn test_constant_series() {
        assert!(matches!(
            jarque_bera(&[dec!(1); 10]),
            Err(PairsError::DegenerateSpread { .. })
        ));
    }

    #[test]
    fn test_fourth_moment_out_of_range_is_an_error() {
        // d^4 = 6.25e26 per point sums past Decimal::MAX
        let x: Vec<Decimal> = (0..2000)
            .map(|i| if i % 2 == 0 { dec!(5000000) } else { dec!(-5000000) })
            .collect();
        assert!(matches!(
            jarque_bera(&x),
            Err(PairsError::FinancialImpossibility(_))
        ));
    }

    #[test]
    fn test_too_short() {
        assert!(jarque_bera(&[dec!(1), dec!(2)]).is_err());
    }
}
