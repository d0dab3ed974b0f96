//! Z-score driven position state machine.
//!
//! Baseline transitions (first match wins):
//!
//! | From  | Condition  | To    |
//! |-------|------------|-------|
//! | Flat  | z <= long  | Long  |
//! | Flat  | z >= short | Short |
//! | Long  | z >= 0     | Flat  |
//! | Short | z <= 0     | Flat  |
//!
//! Anything else keeps the current state. The first observation is evaluated
//! as if the previous state were Flat. An optional stop-loss adds forced
//! exits; without it the machine is exactly the table above.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::PairsError;
use crate::types::{with_metadata, ComputationOutput, ZScore};
use crate::PairsResult;

pub const DEFAULT_LONG_THRESHOLD: Decimal = dec!(-1.6);
pub const DEFAULT_SHORT_THRESHOLD: Decimal = dec!(1.6);

/// Position in the spread. Serialized as -1, 0 or +1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl Position {
    pub fn value(self) -> i8 {
        match self {
            Position::Short => -1,
            Position::Flat => 0,
            Position::Long => 1,
        }
    }

    pub fn as_decimal(self) -> Decimal {
        Decimal::from(self.value())
    }
}

impl From<Position> for i8 {
    fn from(p: Position) -> i8 {
        p.value()
    }
}

impl TryFrom<i8> for Position {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            -1 => Ok(Position::Short),
            0 => Ok(Position::Flat),
            1 => Ok(Position::Long),
            other => Err(format!("position must be -1, 0 or 1, got {other}")),
        }
    }
}

/// Forced exits beyond the entry thresholds.
///
/// Off by default: enabling it changes backtest results relative to the
/// baseline machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLoss {
    /// A Long position is closed once z falls to or below this level.
    pub long_stop: Decimal,
    /// A Short position is closed once z rises to or above this level.
    pub short_stop: Decimal,
}

/// Internal machine state. The stopped states emit Flat but block
/// re-entry on the stopped side until z leaves that entry zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Flat,
    Long,
    Short,
    StoppedLong,
    StoppedShort,
}

impl State {
    fn position(self) -> Position {
        match self {
            State::Long => Position::Long,
            State::Short => Position::Short,
            State::Flat | State::StoppedLong | State::StoppedShort => Position::Flat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalGenerator {
    pub long_threshold: Decimal,
    pub short_threshold: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<StopLoss>,
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self {
            long_threshold: DEFAULT_LONG_THRESHOLD,
            short_threshold: DEFAULT_SHORT_THRESHOLD,
            stop_loss: None,
        }
    }
}

impl SignalGenerator {
    pub fn new(long_threshold: Decimal, short_threshold: Decimal) -> PairsResult<Self> {
        let generator = Self {
            long_threshold,
            short_threshold,
            stop_loss: None,
        };
        generator.validate()?;
        Ok(generator)
    }

    pub fn with_stop_loss(mut self, stop_loss: StopLoss) -> PairsResult<Self> {
        self.stop_loss = Some(stop_loss);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> PairsResult<()> {
        if self.long_threshold >= Decimal::ZERO {
            return Err(PairsError::InvalidInput {
                field: "long_threshold".into(),
                reason: format!("Must be negative, got {}", self.long_threshold),
            });
        }
        if self.short_threshold <= Decimal::ZERO {
            return Err(PairsError::InvalidInput {
                field: "short_threshold".into(),
                reason: format!("Must be positive, got {}", self.short_threshold),
            });
        }
        if let Some(stop) = self.stop_loss {
            if stop.long_stop >= self.long_threshold {
                return Err(PairsError::InvalidInput {
                    field: "stop_loss.long_stop".into(),
                    reason: format!(
                        "Must lie below long_threshold {}, got {}",
                        self.long_threshold, stop.long_stop
                    ),
                });
            }
            if stop.short_stop <= self.short_threshold {
                return Err(PairsError::InvalidInput {
                    field: "stop_loss.short_stop".into(),
                    reason: format!(
                        "Must lie above short_threshold {}, got {}",
                        self.short_threshold, stop.short_stop
                    ),
                });
            }
        }
        Ok(())
    }

    fn from_flat(&self, z: ZScore) -> State {
        if z <= self.long_threshold {
            State::Long
        } else if z >= self.short_threshold {
            State::Short
        } else {
            State::Flat
        }
    }

    fn step(&self, state: State, z: ZScore) -> State {
        match state {
            State::Flat => self.from_flat(z),
            State::Long => match self.stop_loss {
                Some(stop) if z <= stop.long_stop => State::StoppedLong,
                _ if z >= Decimal::ZERO => State::Flat,
                _ => State::Long,
            },
            State::Short => match self.stop_loss {
                Some(stop) if z >= stop.short_stop => State::StoppedShort,
                _ if z <= Decimal::ZERO => State::Flat,
                _ => State::Short,
            },
            State::StoppedLong => {
                if z > self.long_threshold {
                    self.from_flat(z)
                } else {
                    State::StoppedLong
                }
            }
            State::StoppedShort => {
                if z < self.short_threshold {
                    self.from_flat(z)
                } else {
                    State::StoppedShort
                }
            }
        }
    }

    /// Map a Z-score sequence to one position per observation.
    pub fn generate(&self, z_scores: &[ZScore]) -> Vec<Position> {
        z_scores
            .iter()
            .scan(State::Flat, |state, z| {
                *state = self.step(*state, *z);
                Some(state.position())
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Standalone operation
// ---------------------------------------------------------------------------

fn default_long_threshold() -> Decimal {
    DEFAULT_LONG_THRESHOLD
}

fn default_short_threshold() -> Decimal {
    DEFAULT_SHORT_THRESHOLD
}

/// Input for signal generation from a precomputed Z-score series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalInput {
    pub z_scores: Vec<ZScore>,
    #[serde(default = "default_long_threshold")]
    pub long_threshold: Decimal,
    #[serde(default = "default_short_threshold")]
    pub short_threshold: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<StopLoss>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalOutput {
    pub signals: Vec<Position>,
    pub long_periods: usize,
    pub short_periods: usize,
    pub flat_periods: usize,
    /// Number of Flat -> Long/Short entries
    pub entries: usize,
    pub final_position: Position,
}

/// Run the position state machine over a Z-score series.
pub fn generate_signals(input: &SignalInput) -> PairsResult<ComputationOutput<SignalOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let generator = SignalGenerator {
        long_threshold: input.long_threshold,
        short_threshold: input.short_threshold,
        stop_loss: input.stop_loss,
    };
    generator.validate()?;
    let signals = generator.generate(&input.z_scores);

    let count = |p: Position| signals.iter().filter(|s| **s == p).count();
    let entries = signals
        .iter()
        .enumerate()
        .filter(|(t, s)| {
            **s != Position::Flat && (*t == 0 || signals[*t - 1] == Position::Flat)
        })
        .count();

    if entries == 0 {
        warnings.push("Z-scores never crossed an entry threshold; no positions taken".into());
    }
    debug!(periods = signals.len(), entries, "generated signals");

    let output = SignalOutput {
        long_periods: count(Position::Long),
        short_periods: count(Position::Short),
        flat_periods: count(Position::Flat),
        entries,
        final_position: signals.last().copied().unwrap_or_default(),
        signals,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Z-score threshold state machine (enter at thresholds, exit at zero cross)",
        input,
        warnings,
        elapsed,
        output,
    ))
}
