use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PairsError;
use crate::PairsResult;

/// Prices, raw or transformed. Wraps Decimal to prevent accidental f64 usage.
pub type Price = Decimal;

/// Standardized spread values.
pub type ZScore = Decimal;

/// Per-period returns, in spread units.
pub type Return = Decimal;

/// One observation of a traded instrument.
///
/// `price` is the value the pipeline works with (normally the close). The
/// OHLC and volume fields are accepted so full bars can be passed straight
/// through from a data source, but nothing in the pairs pipeline reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: Price) -> Self {
        Self {
            date,
            price,
            open: None,
            high: None,
            low: None,
            volume: None,
        }
    }
}

/// An ordered price history for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Checks that the series is non-empty and its dates strictly increase.
    pub fn validate(&self) -> PairsResult<()> {
        if self.points.is_empty() {
            return Err(PairsError::InsufficientData(format!(
                "Series '{}' has no observations",
                self.symbol
            )));
        }
        for (i, pair) in self.points.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(PairsError::InvalidInput {
                    field: format!("{}.points[{}].date", self.symbol, i + 1),
                    reason: format!(
                        "Dates must be strictly increasing ({} follows {})",
                        pair[1].date, pair[0].date
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
