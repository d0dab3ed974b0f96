use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PnLCurve;
use crate::error::PairsError;
use crate::signal::Position;
use crate::stats::{checked_sum, mean, out_of_range, sample_std_dev, sqrt_decimal};
use crate::types::ZScore;
use crate::PairsResult;

/// One round trip in the spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_period: usize,
    /// Period at which the position was closed, or the last period when
    /// the trade is still open at the end of the sample
    pub exit_period: usize,
    pub direction: Position,
    /// Sum of strategy returns earned while the position was held
    pub pnl: Decimal,
    pub holding_periods: usize,
    pub entry_z: ZScore,
    pub exit_z: ZScore,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub trades: Vec<Trade>,
    pub trade_count: usize,
    /// Share of closed trades with positive P&L; zero with no closed trades
    pub win_rate: Decimal,
    /// mean / sample std of strategy returns, scaled by sqrt(periods_per_year)
    pub sharpe_ratio: Decimal,
    /// Largest peak-to-trough fall of the additive curve, in spread units
    pub max_drawdown: Decimal,
    pub total_return_additive: Decimal,
    pub total_return_compounding: Decimal,
    pub periods_in_market: usize,
}

/// Split a position path into trades.
///
/// A trade opens at the period its position is first taken and closes at the
/// period the position goes back to Flat (or changes side). Its P&L is the
/// strategy return from the period after entry through the exit period.
pub fn extract_trades(
    signals: &[Position],
    strategy_returns: &[Decimal],
    z_scores: &[ZScore],
) -> PairsResult<Vec<Trade>> {
    if strategy_returns.len() != signals.len() || z_scores.len() != signals.len() {
        return Err(PairsError::InvalidInput {
            field: "signals".into(),
            reason: format!(
                "Signals ({}), strategy returns ({}) and z-scores ({}) must have equal length",
                signals.len(),
                strategy_returns.len(),
                z_scores.len()
            ),
        });
    }

    let mut trades = Vec::new();
    let mut open: Option<(usize, Position)> = None;

    for (t, position) in signals.iter().enumerate() {
        if let Some((entry, direction)) = open {
            if *position != direction {
                trades.push(close_trade(entry, t, direction, strategy_returns, z_scores, true)?);
                open = None;
            }
        }
        if open.is_none() && *position != Position::Flat {
            open = Some((t, *position));
        }
    }

    if let Some((entry, direction)) = open {
        let last = signals.len() - 1;
        trades.push(close_trade(entry, last, direction, strategy_returns, z_scores, false)?);
    }

    Ok(trades)
}

fn close_trade(
    entry: usize,
    exit: usize,
    direction: Position,
    strategy_returns: &[Decimal],
    z_scores: &[ZScore],
    closed: bool,
) -> PairsResult<Trade> {
    let pnl = checked_sum(&strategy_returns[entry + 1..=exit])
        .ok_or_else(|| out_of_range("Trade P&L"))?;
    Ok(Trade {
        entry_period: entry,
        exit_period: exit,
        direction,
        pnl,
        holding_periods: exit - entry,
        entry_z: z_scores[entry],
        exit_z: z_scores[exit],
        closed,
    })
}

/// Annualized Sharpe ratio of per-period returns. Zero when fewer than two
/// returns or no dispersion.
pub fn sharpe_ratio(returns: &[Decimal], periods_per_year: u32) -> PairsResult<Decimal> {
    let n = returns.len();
    if n < 2 {
        return Ok(Decimal::ZERO);
    }
    let overflow = || out_of_range("Sharpe ratio");
    let std = sample_std_dev(returns).ok_or_else(overflow)?;
    if std.is_zero() {
        return Ok(Decimal::ZERO);
    }
    mean(returns)
        .ok_or_else(overflow)?
        .checked_div(std)
        .and_then(|ratio| ratio.checked_mul(sqrt_decimal(Decimal::from(periods_per_year))))
        .ok_or_else(overflow)
}

/// Maximum drawdown of a level curve, as an absolute difference.
pub fn max_drawdown(curve: &[Decimal]) -> PairsResult<Decimal> {
    let mut peak = match curve.first() {
        Some(v) => *v,
        None => return Ok(Decimal::ZERO),
    };
    let mut max_dd = Decimal::ZERO;
    for value in curve {
        if *value > peak {
            peak = *value;
        }
        let fall = peak
            .checked_sub(*value)
            .ok_or_else(|| out_of_range("Max drawdown"))?;
        max_dd = max_dd.max(fall);
    }
    Ok(max_dd)
}

pub fn compute_metrics(
    curve: &PnLCurve,
    signals: &[Position],
    z_scores: &[ZScore],
    periods_per_year: u32,
) -> PairsResult<BacktestMetrics> {
    let trades = extract_trades(signals, &curve.strategy_returns, z_scores)?;

    let closed: Vec<&Trade> = trades.iter().filter(|t| t.closed).collect();
    let win_rate = if closed.is_empty() {
        Decimal::ZERO
    } else {
        let wins = closed.iter().filter(|t| t.pnl > Decimal::ZERO).count();
        Decimal::from(wins) / Decimal::from(closed.len())
    };

    Ok(BacktestMetrics {
        trade_count: trades.len(),
        win_rate,
        sharpe_ratio: sharpe_ratio(&curve.strategy_returns, periods_per_year)?,
        max_drawdown: max_drawdown(&curve.additive)?,
        total_return_additive: curve
            .final_additive()
            .checked_sub(Decimal::ONE)
            .ok_or_else(|| out_of_range("Additive total return"))?,
        total_return_compounding: curve
            .final_compounding()
            .checked_sub(Decimal::ONE)
            .ok_or_else(|| out_of_range("Compounding total return"))?,
        periods_in_market: signals.iter().filter(|p| **p != Position::Flat).count(),
        trades,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::run;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn positions(values: &[i8]) -> Vec<Position> {
        values
            .iter()
            .map(|v| Position::try_from(*v).unwrap())
            .collect()
    }

    #[test]
    fn test_extract_single_closed_trade() {
        let e = vec![dec!(10), dec!(11), dec!(9), dec!(9)];
        let s = positions(&[1, 1, 0, 0]);
        let z = vec![dec!(-2), dec!(-1), dec!(0.5), dec!(0.2)];
        let curve = run(&e, &s).unwrap();
        let trades = extract_trades(&s, &curve.strategy_returns, &z).unwrap();
        assert_eq!(trades.len(), 1);
        let trade = &trades[0];
        assert_eq!(trade.entry_period, 0);
        assert_eq!(trade.exit_period, 2);
        assert_eq!(trade.direction, Position::Long);
        assert_eq!(trade.pnl, dec!(-1));
        assert_eq!(trade.holding_periods, 2);
        assert_eq!(trade.entry_z, dec!(-2));
        assert_eq!(trade.exit_z, dec!(0.5));
        assert!(trade.closed);
    }

    #[test]
    fn test_open_trade_at_end() {
        let e = vec![dec!(1), dec!(2), dec!(1), dec!(0)];
        let s = positions(&[0, -1, -1, -1]);
        let z = vec![dec!(0); 4];
        let curve = run(&e, &s).unwrap();
        let trades = extract_trades(&s, &curve.strategy_returns, &z).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_period, 1);
        assert_eq!(trades[0].exit_period, 3);
        assert_eq!(trades[0].pnl, dec!(2));
        assert!(!trades[0].closed);
    }

    #[test]
    fn test_side_change_closes_and_reopens() {
        let s = positions(&[1, -1, 0]);
        let r = vec![dec!(0), dec!(0.5), dec!(0.25)];
        let z = vec![dec!(0); 3];
        let trades = extract_trades(&s, &r, &z).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].direction, Position::Long);
        assert_eq!(trades[0].exit_period, 1);
        assert_eq!(trades[1].direction, Position::Short);
        assert_eq!(trades[1].entry_period, 1);
        assert_eq!(trades[1].pnl, dec!(0.25));
    }

    #[test]
    fn test_no_trades() {
        let s = positions(&[0, 0, 0]);
        let r = vec![dec!(0); 3];
        assert!(extract_trades(&s, &r, &r).unwrap().is_empty());
    }

    #[test]
    fn test_length_mismatch() {
        let s = positions(&[0, 0]);
        let r = vec![dec!(0); 3];
        assert!(extract_trades(&s, &r, &r).is_err());
    }

    #[test]
    fn test_max_drawdown_of_curve() {
        let curve = vec![dec!(1), dec!(2), dec!(0), dec!(1.5), dec!(-0.5)];
        assert_eq!(max_drawdown(&curve).unwrap(), dec!(2.5));
        assert_eq!(max_drawdown(&[dec!(1), dec!(2), dec!(3)]).unwrap(), Decimal::ZERO);
        assert_eq!(max_drawdown(&[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_sharpe_degenerate_cases() {
        assert_eq!(sharpe_ratio(&[dec!(0.1)], 252).unwrap(), Decimal::ZERO);
        assert_eq!(sharpe_ratio(&[dec!(0.1); 5], 252).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_sharpe_sign_follows_mean() {
        let up = vec![dec!(0.01), dec!(0.02), dec!(-0.005), dec!(0.015)];
        let down: Vec<Decimal> = up.iter().map(|r| -*r).collect();
        assert!(sharpe_ratio(&up, 252).unwrap() > Decimal::ZERO);
        assert!(sharpe_ratio(&down, 252).unwrap() < Decimal::ZERO);
    }

    #[test]
    fn test_metrics_out_of_range_are_errors() {
        let extremes = [Decimal::MAX, -Decimal::MAX];
        assert!(matches!(
            sharpe_ratio(&extremes, 252),
            Err(PairsError::FinancialImpossibility(_))
        ));
        assert!(matches!(
            max_drawdown(&extremes),
            Err(PairsError::FinancialImpossibility(_))
        ));
    }

    #[test]
    fn test_compute_metrics_on_extreme_curve_is_an_error() {
        // Short a rising spread: ruin at t = 1, and the squared deviations of
        // the returns leave the Decimal range
        let e = vec![Decimal::ZERO, Decimal::MAX - dec!(2)];
        let s = positions(&[-1, 0]);
        let curve = run(&e, &s).unwrap();
        assert_eq!(curve.ruin_period, Some(1));
        let z = vec![dec!(0); 2];
        assert!(matches!(
            compute_metrics(&curve, &s, &z, 252),
            Err(PairsError::FinancialImpossibility(_))
        ));
    }
}
