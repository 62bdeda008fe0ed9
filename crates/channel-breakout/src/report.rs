//! Signal Reporting
//!
//! Presentation helpers over detected signals: text rendering, aggregate
//! summary, ranking and a one-line snapshot per instrument.

use std::cmp::Ordering;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::signal::{Direction, Signal, SignalKind};

/// Confidence at or above which a signal counts as high-confidence
pub const HIGH_CONFIDENCE: f64 = 0.70;

/// Directional bias derived from breakout counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketSentiment {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl MarketSentiment {
    pub fn from_breakouts(up: usize, down: usize) -> Self {
        let (up, down) = (up as f64, down as f64);
        if up > down * 1.5 {
            MarketSentiment::StrongBullish
        } else if up > down {
            MarketSentiment::Bullish
        } else if down > up * 1.5 {
            MarketSentiment::StrongBearish
        } else if down > up {
            MarketSentiment::Bearish
        } else {
            MarketSentiment::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSentiment::StrongBullish => "STRONG BULLISH",
            MarketSentiment::Bullish => "BULLISH",
            MarketSentiment::Neutral => "NEUTRAL",
            MarketSentiment::Bearish => "BEARISH",
            MarketSentiment::StrongBearish => "STRONG BEARISH",
        }
    }
}

/// Aggregate view of a batch of signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub total: usize,
    pub up_breakouts: usize,
    pub down_breakouts: usize,
    pub retest_successes: usize,
    pub retest_failures: usize,
    pub average_confidence: f64,
    pub high_confidence: usize,
    pub sentiment: MarketSentiment,
}

impl SignalSummary {
    pub fn from_signals(signals: &[Signal]) -> Self {
        let count = |kind: SignalKind| signals.iter().filter(|s| s.kind() == kind).count();
        let up_breakouts = count(SignalKind::UpBreakout);
        let down_breakouts = count(SignalKind::DownBreakout);

        let average_confidence = if signals.is_empty() {
            0.0
        } else {
            signals.iter().map(|s| s.confidence()).sum::<f64>() / signals.len() as f64
        };

        Self {
            total: signals.len(),
            up_breakouts,
            down_breakouts,
            retest_successes: count(SignalKind::RetestSuccess),
            retest_failures: count(SignalKind::RetestFailed),
            average_confidence,
            high_confidence: signals.iter().filter(|s| s.confidence() >= HIGH_CONFIDENCE).count(),
            sentiment: MarketSentiment::from_breakouts(up_breakouts, down_breakouts),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Signal summary");
        let _ = writeln!(out, "  Total signals:      {}", self.total);
        let _ = writeln!(out, "  Up breakouts:       {}", self.up_breakouts);
        let _ = writeln!(out, "  Down breakouts:     {}", self.down_breakouts);
        let _ = writeln!(out, "  Successful retests: {}", self.retest_successes);
        let _ = writeln!(out, "  Failed retests:     {}", self.retest_failures);
        let _ = writeln!(out, "  Avg confidence:     {:.1}%", self.average_confidence * 100.0);
        let _ = writeln!(out, "  High confidence:    {}", self.high_confidence);
        let _ = writeln!(out, "  Market sentiment:   {}", self.sentiment.as_str());
        out
    }
}

/// Direction a snapshot points in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotDirection {
    Up,
    Down,
    Neutral,
}

impl From<Direction> for SnapshotDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => SnapshotDirection::Up,
            Direction::Down => SnapshotDirection::Down,
        }
    }
}

/// Latest signal condensed for a dashboard or another strategy's input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakoutSnapshot {
    pub has_breakout: bool,
    pub direction: SnapshotDirection,
    pub confidence: f64,
}

impl BreakoutSnapshot {
    pub fn from_signals(signals: &[Signal]) -> Self {
        // max_by keeps the last of equal timestamps
        let Some(latest) = signals.iter().max_by(|a, b| a.timestamp().cmp(&b.timestamp())) else {
            return Self {
                has_breakout: false,
                direction: SnapshotDirection::Neutral,
                confidence: 0.0,
            };
        };

        // a failed retest points against the breakout it invalidated
        let direction = match latest.kind() {
            SignalKind::RetestFailed => latest.direction().opposite(),
            _ => latest.direction(),
        };

        Self {
            has_breakout: true,
            direction: direction.into(),
            confidence: latest.confidence(),
        }
    }
}

/// Newest first
pub fn sort_by_time_desc(signals: &mut [Signal]) {
    signals.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
}

/// Highest confidence first; ties keep their input order
pub fn sort_by_confidence_desc(signals: &mut [Signal]) {
    signals.sort_by(|a, b| b.confidence().partial_cmp(&a.confidence()).unwrap_or(Ordering::Equal));
}

pub fn top_opportunities(signals: &[Signal], n: usize) -> Vec<Signal> {
    let mut ranked = signals.to_vec();
    sort_by_confidence_desc(&mut ranked);
    ranked.truncate(n);
    ranked
}

fn format_signal(out: &mut String, signal: &Signal) {
    let _ = writeln!(
        out,
        "[{}] {} @ {}",
        signal.kind(),
        signal.instrument(),
        signal.timestamp().format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(
        out,
        "  Price: {:.4}  Level: {:.4}  Strength: {}",
        signal.price(),
        signal.channel_level(),
        signal.strength()
    );
    let _ = writeln!(
        out,
        "  Confidence: {:.1}%  RSI: {:.1}",
        signal.confidence() * 100.0,
        signal.rsi
    );
    let _ = writeln!(out, "  {}", signal.description());
}

/// Human-readable block per signal, newest first
pub fn format_signals(signals: &[Signal]) -> String {
    if signals.is_empty() {
        return "No breakout signals detected\n".to_string();
    }

    let mut ordered = signals.to_vec();
    sort_by_time_desc(&mut ordered);

    let mut out = String::new();
    for (i, signal) in ordered.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        format_signal(&mut out, signal);
    }
    out
}
