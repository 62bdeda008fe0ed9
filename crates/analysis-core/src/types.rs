use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// OHLCV candle for one fixed time bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Green candle: closed above its open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Red candle: closed below its open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Absolute body size |close - open|
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Full high-low range
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Reject candles the engine cannot reason about: non-finite or negative OHLCV.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(AnalysisError::InvalidData(format!(
                    "candle at {} has non-finite {}",
                    self.open_time, name
                )));
            }
            if value < 0.0 {
                return Err(AnalysisError::InvalidData(format!(
                    "candle at {} has negative {} ({})",
                    self.open_time, name, value
                )));
            }
        }
        Ok(())
    }
}

/// Candle timeframe. The scanner defaults to hourly candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    #[default]
    Hour1,
    Hour4,
    Day1,
}

impl Timeframe {
    pub fn to_minutes(&self) -> i64 {
        match self {
            Timeframe::Minute1 => 1,
            Timeframe::Minute5 => 5,
            Timeframe::Minute15 => 15,
            Timeframe::Minute30 => 30,
            Timeframe::Hour1 => 60,
            Timeframe::Hour4 => 240,
            Timeframe::Day1 => 1440,
        }
    }

    /// Duration covered by one candle
    pub fn to_duration(&self) -> Duration {
        Duration::minutes(self.to_minutes())
    }

    /// Exchange-style interval label ("1h", "15m", ...)
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Day1 => "1d",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "1m" => Some(Timeframe::Minute1),
            "5m" => Some(Timeframe::Minute5),
            "15m" => Some(Timeframe::Minute15),
            "30m" => Some(Timeframe::Minute30),
            "1h" => Some(Timeframe::Hour1),
            "4h" => Some(Timeframe::Hour4),
            "1d" => Some(Timeframe::Day1),
            _ => None,
        }
    }
}
