use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use tracing::debug;

use crate::error::PairsError;
use crate::stats::ln_decimal;
use crate::types::{Price, PriceSeries};
use crate::PairsResult;

/// Minimum length of any segment produced by [`split`].
pub const MIN_SEGMENT_LEN: usize = 2;

/// Elementwise transform applied to both legs after alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Prices as given. Spread returns are then in price units; once one
    /// falls to -1 or below the compounding curve is ruined and held there.
    Identity,
    /// Natural log. Requires strictly positive prices.
    #[default]
    Log,
}

impl Transform {
    fn apply(self, symbol: &str, date: NaiveDate, value: Price) -> PairsResult<Price> {
        match self {
            Transform::Identity => Ok(value),
            Transform::Log => ln_decimal(value).ok_or_else(|| PairsError::InvalidTransform {
                transform: "log".into(),
                reason: format!("{symbol} has non-positive price {value} on {date}"),
            }),
        }
    }
}

/// Two price legs trimmed to their common dates, index-aligned 1:1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedSeriesPair {
    symbol_a: String,
    symbol_b: String,
    dates: Vec<NaiveDate>,
    a: Vec<Price>,
    b: Vec<Price>,
}

impl AlignedSeriesPair {
    pub fn new(
        symbol_a: impl Into<String>,
        symbol_b: impl Into<String>,
        dates: Vec<NaiveDate>,
        a: Vec<Price>,
        b: Vec<Price>,
    ) -> PairsResult<Self> {
        if a.len() != dates.len() || b.len() != dates.len() {
            return Err(PairsError::InvalidInput {
                field: "aligned pair".into(),
                reason: format!(
                    "Leg lengths {} / {} must both equal the date count {}",
                    a.len(),
                    b.len(),
                    dates.len()
                ),
            });
        }
        Ok(Self {
            symbol_a: symbol_a.into(),
            symbol_b: symbol_b.into(),
            dates,
            a,
            b,
        })
    }

    pub fn symbol_a(&self) -> &str {
        &self.symbol_a
    }

    pub fn symbol_b(&self) -> &str {
        &self.symbol_b
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn a(&self) -> &[Price] {
        &self.a
    }

    pub fn b(&self) -> &[Price] {
        &self.b
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    fn slice(&self, range: Range<usize>) -> Self {
        Self {
            symbol_a: self.symbol_a.clone(),
            symbol_b: self.symbol_b.clone(),
            dates: self.dates[range.clone()].to_vec(),
            a: self.a[range.clone()].to_vec(),
            b: self.b[range].to_vec(),
        }
    }
}

/// Inner-join two series on date, then apply `transform` to both legs.
///
/// Output is ascending by date. Dates present in only one series are dropped.
pub fn align(
    series_a: &PriceSeries,
    series_b: &PriceSeries,
    transform: Transform,
) -> PairsResult<AlignedSeriesPair> {
    series_a.validate()?;
    series_b.validate()?;

    let b_by_date: HashMap<NaiveDate, Price> = series_b
        .points
        .iter()
        .map(|p| (p.date, p.price))
        .collect();

    let mut dates = Vec::new();
    let mut a = Vec::new();
    let mut b = Vec::new();
    // series_a is validated as strictly increasing, so the join stays ordered
    for point in &series_a.points {
        if let Some(&price_b) = b_by_date.get(&point.date) {
            a.push(transform.apply(&series_a.symbol, point.date, point.price)?);
            b.push(transform.apply(&series_b.symbol, point.date, price_b)?);
            dates.push(point.date);
        }
    }

    if dates.is_empty() {
        return Err(PairsError::InsufficientData(format!(
            "'{}' and '{}' share no dates",
            series_a.symbol, series_b.symbol
        )));
    }

    debug!(
        symbol_a = %series_a.symbol,
        symbol_b = %series_b.symbol,
        len_a = series_a.len(),
        len_b = series_b.len(),
        aligned = dates.len(),
        "aligned price series"
    );

    AlignedSeriesPair::new(
        series_a.symbol.clone(),
        series_b.symbol.clone(),
        dates,
        a,
        b,
    )
}

/// Number of leading observations that go to the training segment:
/// `round_half_up(train_fraction * len)`.
pub fn train_length(len: usize, train_fraction: Decimal) -> PairsResult<usize> {
    if train_fraction <= Decimal::ZERO || train_fraction >= Decimal::ONE {
        return Err(PairsError::InvalidInput {
            field: "train_fraction".into(),
            reason: format!("Must lie strictly between 0 and 1, got {train_fraction}"),
        });
    }
    (train_fraction * Decimal::from(len))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_usize()
        .ok_or_else(|| PairsError::InvalidInput {
            field: "train_fraction".into(),
            reason: "Training length does not fit in usize".into(),
        })
}

/// Split an aligned pair into leading train and trailing test segments.
pub fn split(
    pair: &AlignedSeriesPair,
    train_fraction: Decimal,
) -> PairsResult<(AlignedSeriesPair, AlignedSeriesPair)> {
    let n = pair.len();
    let train_len = train_length(n, train_fraction)?;
    let test_len = n - train_len.min(n);
    if train_len < MIN_SEGMENT_LEN || test_len < MIN_SEGMENT_LEN {
        return Err(PairsError::InsufficientData(format!(
            "Splitting {n} observations at fraction {train_fraction} gives train {train_len} / test {test_len}; each needs at least {MIN_SEGMENT_LEN}"
        )));
    }
    Ok((pair.slice(0..train_len), pair.slice(train_len..n)))
}
