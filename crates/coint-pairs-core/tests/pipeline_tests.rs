use chrono::NaiveDate;
use coint_pairs_core::alignment::Transform;
use coint_pairs_core::cointegration::{choose_orientation, Orientation};
use coint_pairs_core::signal::Position;
use coint_pairs_core::stationarity::{
    AugmentedDickeyFuller, CriticalValues, LagSelection, SignificanceLevel, StationarityReport,
    StationarityTester,
};
use coint_pairs_core::{
    run_pairs_backtest, PairsBacktestInput, PairsConfig, PairsError, PairsResult, PricePoint,
    PriceSeries,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn trading_days(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
    (0..n)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect()
}

fn uniform(rng: &mut StdRng) -> Decimal {
    Decimal::from_f64(rng.gen_range(-1.0..1.0)).unwrap().round_dp(4)
}

/// A tracks 1.25 * B + 10 with mean-reverting noise; B is a random walk.
fn cointegrated_pair(n: usize, seed: u64) -> (PriceSeries, PriceSeries) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut b = dec!(80);
    let mut u = Decimal::ZERO;
    let (mut pa, mut pb) = (Vec::new(), Vec::new());
    for d in trading_days(n) {
        b += uniform(&mut rng);
        u = dec!(0.6) * u + uniform(&mut rng) * dec!(0.1);
        pa.push(PricePoint::new(d, dec!(1.25) * b + dec!(10) + u));
        pb.push(PricePoint::new(d, b));
    }
    (PriceSeries::new("PEP", pa), PriceSeries::new("KO", pb))
}

fn identity_config() -> PairsConfig {
    PairsConfig {
        transform: Transform::Identity,
        ..PairsConfig::default()
    }
}

// ---------------------------------------------------------------------------
// End-to-end
// ---------------------------------------------------------------------------

#[test]
fn test_backtest_from_json_document() {
    let (a, b) = cointegrated_pair(250, 21);
    let doc = serde_json::json!({
        "series_a": a,
        "series_b": b,
        "config": { "transform": "identity", "train_fraction": "0.6" }
    });
    let input: PairsBacktestInput = serde_json::from_value(doc).unwrap();
    assert_eq!(input.config.long_threshold, dec!(-1.6));

    let out = run_pairs_backtest(&input).unwrap();
    assert_eq!(out.result.train_periods, 150);
    assert_eq!(out.result.test_periods, 100);
    assert_eq!(out.metadata.precision, "rust_decimal_128bit");

    let json = serde_json::to_value(&out).unwrap();
    let signal = &json["result"]["periods"][0]["signal"];
    assert!(signal.is_i64(), "signal serialized as {signal}");
}

#[test]
fn test_cointegrated_pair_is_stationary_with_trades() {
    let (a, b) = cointegrated_pair(400, 8);
    let input = PairsBacktestInput {
        series_a: a,
        series_b: b,
        config: identity_config(),
    };
    let r = run_pairs_backtest(&input).unwrap().result;
    assert!(r.is_stationary, "ADF statistic {}", r.adf_statistic);
    assert!(r.metrics.trade_count > 0);
    assert!(r.adf_statistic <= r.alternative_adf_statistic);
    assert!(r.half_life.is_some());
}

#[test]
fn test_swapping_legs_keeps_the_chosen_regression() {
    let (a, b) = cointegrated_pair(300, 13);
    let forward = run_pairs_backtest(&PairsBacktestInput {
        series_a: a.clone(),
        series_b: b.clone(),
        config: identity_config(),
    })
    .unwrap()
    .result;
    let swapped = run_pairs_backtest(&PairsBacktestInput {
        series_a: b,
        series_b: a,
        config: identity_config(),
    })
    .unwrap()
    .result;

    assert_eq!(forward.dependent, swapped.dependent);
    assert_eq!(forward.hedge_ratio, swapped.hedge_ratio);
    assert_ne!(forward.orientation, swapped.orientation);
}

#[test]
fn test_pnl_identities_hold_per_period() {
    let (a, b) = cointegrated_pair(200, 5);
    let r = run_pairs_backtest(&PairsBacktestInput {
        series_a: a,
        series_b: b,
        config: identity_config(),
    })
    .unwrap()
    .result;

    let rows = &r.periods;
    assert_eq!(rows[0].strategy_return, Decimal::ZERO);
    assert_eq!(rows[0].additive, Decimal::ONE);
    for t in 1..rows.len() {
        let expected =
            (rows[t].residual - rows[t - 1].residual) * Decimal::from(rows[t - 1].signal.value());
        assert_eq!(rows[t].strategy_return, expected);
        assert_eq!(rows[t].additive, rows[t - 1].additive + expected);
        let compounded = match r.ruin_period {
            Some(ruin) if t > ruin => rows[t - 1].compounding,
            _ => rows[t - 1].compounding * (Decimal::ONE + expected),
        };
        assert_eq!(rows[t].compounding, compounded);
    }
}

#[test]
fn test_test_segment_uses_training_statistics() {
    let (a, b) = cointegrated_pair(200, 17);
    let r = run_pairs_backtest(&PairsBacktestInput {
        series_a: a,
        series_b: b,
        config: identity_config(),
    })
    .unwrap()
    .result;
    for row in &r.periods {
        let z = (row.residual - r.spread_mean) / r.spread_std;
        assert_eq!(row.z_score, z);
    }
}

#[test]
fn test_too_short_for_split() {
    let (a, b) = cointegrated_pair(3, 1);
    let result = run_pairs_backtest(&PairsBacktestInput {
        series_a: a,
        series_b: b,
        config: identity_config(),
    });
    assert!(matches!(result, Err(PairsError::InsufficientData(_))));
}

#[test]
fn test_unordered_dates_rejected() {
    let (mut a, b) = cointegrated_pair(60, 2);
    a.points.swap(4, 5);
    let result = run_pairs_backtest(&PairsBacktestInput {
        series_a: a,
        series_b: b,
        config: identity_config(),
    });
    assert!(matches!(result, Err(PairsError::InvalidInput { .. })));
}

// ---------------------------------------------------------------------------
// Pluggable stationarity test
// ---------------------------------------------------------------------------

/// Scores a series by the variance of its first half, so the orientation
/// with the tighter residuals always wins.
struct VarianceTester;

impl StationarityTester for VarianceTester {
    fn test(&self, series: &[Decimal], _lag_selection: LagSelection) -> PairsResult<StationarityReport> {
        let half = &series[..series.len() / 2];
        let n = Decimal::from(half.len());
        let mean = half.iter().copied().sum::<Decimal>() / n;
        let var = half.iter().map(|x| (*x - mean) * (*x - mean)).sum::<Decimal>() / n;
        Ok(StationarityReport {
            statistic: var,
            lag_order: 0,
            nobs: series.len(),
            critical_values: CriticalValues {
                one_percent: dec!(-3.43),
                five_percent: dec!(-2.86),
                ten_percent: dec!(-2.57),
            },
        })
    }
}

#[test]
fn test_custom_tester_drives_orientation() {
    let a: Vec<Decimal> = (0..50).map(|i| Decimal::from(i) * dec!(2)).collect();
    let b: Vec<Decimal> = (0..50)
        .map(|i| Decimal::from(i) + if i % 2 == 0 { dec!(0.5) } else { dec!(-0.5) })
        .collect();
    let choice = choose_orientation(&a, &b, &VarianceTester, LagSelection::Bic).unwrap();
    // Residuals of A on B scale with the slope of 2, so the B-dependent fit
    // has the smaller variance and the lower score
    assert_eq!(choice.chosen.orientation, Orientation::BDependent);
}

#[test]
fn test_adf_distinguishes_random_walk_from_noise() {
    let mut rng = StdRng::seed_from_u64(99);
    let noise: Vec<Decimal> = (0..300).map(|_| uniform(&mut rng)).collect();
    let walk: Vec<Decimal> = noise
        .iter()
        .scan(Decimal::ZERO, |acc, e| {
            *acc += *e;
            Some(*acc)
        })
        .collect();

    let adf = AugmentedDickeyFuller::new();
    let noise_report = adf.test(&noise, LagSelection::Bic).unwrap();
    let walk_report = adf.test(&walk, LagSelection::Bic).unwrap();
    assert!(noise_report.rejects_null_at(SignificanceLevel::OnePercent));
    assert!(!walk_report.rejects_null_at(SignificanceLevel::OnePercent));
}

#[test]
fn test_positions_only_take_three_values() {
    let (a, b) = cointegrated_pair(150, 30);
    let r = run_pairs_backtest(&PairsBacktestInput {
        series_a: a,
        series_b: b,
        config: PairsConfig {
            long_threshold: dec!(-0.5),
            short_threshold: dec!(0.5),
            ..identity_config()
        },
    })
    .unwrap()
    .result;
    assert!(r
        .periods
        .iter()
        .all(|p| matches!(p.signal, Position::Long | Position::Flat | Position::Short)));
    assert!(r.metrics.trade_count > 0);
}
