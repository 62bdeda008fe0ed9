use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the channel an event is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    UpBreakout,
    DownBreakout,
    RetestSuccess,
    RetestFailed,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::UpBreakout => "UP_BREAKOUT",
            SignalKind::DownBreakout => "DOWN_BREAKOUT",
            SignalKind::RetestSuccess => "RETEST_SUCCESS",
            SignalKind::RetestFailed => "RETEST_FAILED",
        }
    }

    pub fn all() -> [SignalKind; 4] {
        [
            SignalKind::UpBreakout,
            SignalKind::DownBreakout,
            SignalKind::RetestSuccess,
            SignalKind::RetestFailed,
        ]
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candle closing decisively outside the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutEvent {
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub price: f64,
    pub channel_level: f64,
    /// Candles before the event that respected the crossed level
    pub strength: u32,
    pub confidence: f64,
    pub volume_confirmed: bool,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetestOutcome {
    Success,
    Failed,
}

/// A later candle revisiting a recently broken level.
///
/// `direction` is the direction of the breakout being retested, so an upward
/// retest is judged against the upper band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetestEvent {
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: RetestOutcome,
    pub direction: Direction,
    pub price: f64,
    pub channel_level: f64,
    pub strength: u32,
    pub confidence: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SignalEvent {
    Breakout(BreakoutEvent),
    Retest(RetestEvent),
}

/// Classified event tagged with the RSI at its candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Index of the candle inside the series handed to the detector
    pub index: usize,
    pub rsi: f64,
    #[serde(flatten)]
    pub event: SignalEvent,
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match &self.event {
            SignalEvent::Breakout(b) => match b.direction {
                Direction::Up => SignalKind::UpBreakout,
                Direction::Down => SignalKind::DownBreakout,
            },
            SignalEvent::Retest(r) => match r.outcome {
                RetestOutcome::Success => SignalKind::RetestSuccess,
                RetestOutcome::Failed => SignalKind::RetestFailed,
            },
        }
    }

    /// Direction of the breakout this signal is about
    pub fn direction(&self) -> Direction {
        match &self.event {
            SignalEvent::Breakout(b) => b.direction,
            SignalEvent::Retest(r) => r.direction,
        }
    }

    pub fn instrument(&self) -> &str {
        match &self.event {
            SignalEvent::Breakout(b) => &b.instrument,
            SignalEvent::Retest(r) => &r.instrument,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match &self.event {
            SignalEvent::Breakout(b) => b.timestamp,
            SignalEvent::Retest(r) => r.timestamp,
        }
    }

    pub fn price(&self) -> f64 {
        match &self.event {
            SignalEvent::Breakout(b) => b.price,
            SignalEvent::Retest(r) => r.price,
        }
    }

    pub fn channel_level(&self) -> f64 {
        match &self.event {
            SignalEvent::Breakout(b) => b.channel_level,
            SignalEvent::Retest(r) => r.channel_level,
        }
    }

    pub fn strength(&self) -> u32 {
        match &self.event {
            SignalEvent::Breakout(b) => b.strength,
            SignalEvent::Retest(r) => r.strength,
        }
    }

    pub fn confidence(&self) -> f64 {
        match &self.event {
            SignalEvent::Breakout(b) => b.confidence,
            SignalEvent::Retest(r) => r.confidence,
        }
    }

    pub fn description(&self) -> &str {
        match &self.event {
            SignalEvent::Breakout(b) => &b.description,
            SignalEvent::Retest(r) => &r.description,
        }
    }
}
