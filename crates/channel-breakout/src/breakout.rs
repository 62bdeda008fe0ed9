use analysis_core::Candle;

use crate::channel::RegressionChannel;
use crate::config::DetectorConfig;
use crate::signal::{BreakoutEvent, Direction};

/// Count candles in the `lookback` before `index` that stayed on their side of
/// `level`: above it when it acts as support, below it when it acts as
/// resistance.
pub fn count_respecting(candles: &[Candle], index: usize, level: f64, is_support: bool, lookback: usize) -> u32 {
    let end = index.min(candles.len());
    let start = index.saturating_sub(lookback).min(end);
    candles[start..end]
        .iter()
        .filter(|c| if is_support { c.low >= level } else { c.high <= level })
        .count() as u32
}

/// Average of normalized strength and normalized distance beyond the band
pub fn breakout_confidence(strength: u32, distance: f64, deviation: f64, normalizer: usize) -> f64 {
    let strength_confidence = (strength as f64 / normalizer.max(1) as f64).min(1.0);

    // Zero-width channel: any strict crossing is a full-distance move.
    let distance_confidence = if deviation > 0.0 {
        (distance / deviation).clamp(0.0, 1.0)
    } else if distance > 0.0 {
        1.0
    } else {
        0.0
    };

    ((strength_confidence + distance_confidence) / 2.0).clamp(0.0, 1.0)
}

/// Minimum distance beyond a band that counts as a breakout close
pub fn breakout_margin(channel: &RegressionChannel, config: &DetectorConfig) -> f64 {
    channel.deviation * config.breakout_margin
}

/// Direction of a close-only breakout test against the channel, ignoring
/// candle colour. Used to locate the breakout a retest refers back to.
pub fn close_breaks_channel(close: f64, channel: &RegressionChannel, config: &DetectorConfig) -> Option<Direction> {
    let margin = breakout_margin(channel, config);
    if close > channel.upper + margin {
        Some(Direction::Up)
    } else if close < channel.lower - margin {
        Some(Direction::Down)
    } else {
        None
    }
}

/// Classify the candle at `index` against a previously fitted channel.
///
/// UP requires a green candle closing above `upper + margin`, DOWN a red one
/// closing below `lower - margin`.
pub fn classify_breakout(
    instrument: &str,
    candles: &[Candle],
    index: usize,
    channel: &RegressionChannel,
    config: &DetectorConfig,
) -> Option<BreakoutEvent> {
    let candle = candles.get(index)?;
    let margin = breakout_margin(channel, config);

    let up = candle.is_bullish() && candle.close > channel.upper + margin;
    let down = candle.is_bearish() && candle.close < channel.lower - margin;

    let direction = match (up, down) {
        (true, false) => Direction::Up,
        (false, true) => Direction::Down,
        (false, false) => return None,
        (true, true) => {
            tracing::warn!(
                "{}: candle {} at {} satisfies both breakout tests (close={} bands=[{}, {}]); skipping",
                instrument,
                index,
                candle.open_time,
                candle.close,
                channel.lower,
                channel.upper
            );
            return None;
        }
    };

    let (level, distance, is_support) = match direction {
        Direction::Up => (channel.upper, candle.close - channel.upper, false),
        Direction::Down => (channel.lower, channel.lower - candle.close, true),
    };

    let strength = count_respecting(candles, index, level, is_support, config.strength_lookback);
    let mut confidence = breakout_confidence(strength, distance, channel.deviation, config.strength_normalizer);

    let volume_confirmed = match index.checked_sub(1).and_then(|i| candles.get(i)) {
        Some(prev) => candle.volume > prev.volume * config.volume_surge_ratio,
        None => true,
    };
    if volume_confirmed {
        confidence = (confidence * config.volume_bonus).min(1.0);
    }

    let range = candle.range();
    if range > 0.0 && candle.body() / range > config.decisive_body_ratio {
        confidence = (confidence * config.decisive_bonus).min(1.0);
    }

    let volume_note = if volume_confirmed { "confirmed" } else { "weak" };
    let description = match direction {
        Direction::Up => format!(
            "Green candle broke above upper channel at {:.4} (strength: {}, volume: {})",
            level, strength, volume_note
        ),
        Direction::Down => format!(
            "Red candle broke below lower channel at {:.4} (strength: {}, volume: {})",
            level, strength, volume_note
        ),
    };

    Some(BreakoutEvent {
        instrument: instrument.to_string(),
        timestamp: candle.open_time,
        direction,
        price: candle.close,
        channel_level: level,
        strength,
        confidence: confidence.clamp(0.0, 1.0),
        volume_confirmed,
        description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{candle, flat_channel};

    fn channel(middle: f64, deviation: f64) -> RegressionChannel {
        RegressionChannel {
            slope: 0.0,
            intercept: middle,
            middle,
            deviation,
            upper: middle + 2.0 * deviation,
            lower: middle - 2.0 * deviation,
        }
    }

    #[test]
    fn test_breakout_confidence_formula() {
        // strength 5 -> 0.5, distance half a deviation -> 0.5
        assert!((breakout_confidence(5, 0.5, 1.0, 10) - 0.5).abs() < 1e-12);
        // both components saturate
        assert!((breakout_confidence(25, 7.0, 1.0, 10) - 1.0).abs() < 1e-12);
        // zero-width channel counts a strict crossing as full distance
        assert!((breakout_confidence(0, 0.01, 0.0, 10) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_count_respecting() {
        let candles = vec![
            candle(99.0, 100.0, 98.0, 99.5, 1000.0),
            candle(99.5, 101.0, 99.0, 100.5, 1000.0),
            candle(100.0, 100.0, 99.0, 99.0, 1000.0),
            candle(99.0, 105.0, 98.0, 104.0, 1000.0),
        ];
        // resistance at 100: candles 0 and 2 stayed at or below it
        assert_eq!(count_respecting(&candles, 3, 100.0, false, 10), 2);
        // lookback of one only sees candle 2
        assert_eq!(count_respecting(&candles, 3, 100.0, false, 1), 1);
        // support at 98.5: candles 1 and 2 stayed above it
        assert_eq!(count_respecting(&candles, 3, 98.5, true, 10), 2);

        // index past the end counts what is there instead of panicking
        assert_eq!(count_respecting(&candles, 10, 100.0, false, 10), 2);
        assert_eq!(count_respecting(&candles, 20, 100.0, false, 3), 0);
    }

    #[test]
    fn test_up_breakout_with_bonuses() {
        let ch = channel(100.0, 1.0);
        let candles = vec![
            candle(100.0, 101.0, 99.0, 100.5, 1000.0),
            // closes 1 deviation above upper (102), body ~82% of range, 2x volume
            candle(102.1, 103.1, 102.0, 103.0, 2000.0),
        ];

        let event = classify_breakout("ETHUSDT", &candles, 1, &ch, &DetectorConfig::default()).unwrap();
        assert_eq!(event.direction, Direction::Up);
        assert!((event.channel_level - 102.0).abs() < 1e-12);
        assert_eq!(event.strength, 1);
        assert!(event.volume_confirmed);
        // (0.1 + 1.0) / 2 * 1.1 * 1.05
        assert!((event.confidence - 0.55 * 1.1 * 1.05).abs() < 1e-9);
        assert!(event.description.contains("confirmed"));
    }

    #[test]
    fn test_down_breakout() {
        let ch = channel(100.0, 1.0);
        let candles = vec![
            candle(100.0, 100.5, 99.0, 99.5, 1000.0),
            candle(98.0, 98.2, 97.0, 97.5, 900.0),
        ];

        let event = classify_breakout("ETHUSDT", &candles, 1, &ch, &DetectorConfig::default()).unwrap();
        assert_eq!(event.direction, Direction::Down);
        assert!((event.channel_level - 98.0).abs() < 1e-12);
        assert!(!event.volume_confirmed);
        assert!(event.description.contains("weak"));
        assert!(event.confidence >= 0.0 && event.confidence <= 1.0);
    }

    #[test]
    fn test_margin_suppresses_noise_crossing() {
        let ch = channel(100.0, 1.0);
        // above upper (102) but inside the 0.1 margin
        let candles = vec![candle(101.5, 102.1, 101.4, 102.05, 1000.0)];
        assert!(classify_breakout("X", &candles, 0, &ch, &DetectorConfig::default()).is_none());
    }

    #[test]
    fn test_wrong_colour_is_not_a_breakout() {
        let ch = channel(100.0, 1.0);
        // red candle closing far above the upper band
        let candles = vec![candle(106.0, 106.5, 104.0, 105.0, 1000.0)];
        assert!(classify_breakout("X", &candles, 0, &ch, &DetectorConfig::default()).is_none());
    }

    #[test]
    fn test_flat_channel_needs_strict_crossing() {
        let ch = flat_channel(100.0);
        let config = DetectorConfig::default();

        let touching = vec![candle(99.0, 100.0, 99.0, 100.0, 1000.0)];
        assert!(classify_breakout("X", &touching, 0, &ch, &config).is_none());

        let crossing = vec![candle(99.0, 100.02, 99.0, 100.01, 1000.0)];
        let event = classify_breakout("X", &crossing, 0, &ch, &config).unwrap();
        assert_eq!(event.direction, Direction::Up);
        assert!(event.confidence <= 1.0);
    }

    #[test]
    fn test_close_breaks_channel_ignores_colour() {
        let ch = channel(100.0, 1.0);
        let config = DetectorConfig::default();
        assert_eq!(close_breaks_channel(102.5, &ch, &config), Some(Direction::Up));
        assert_eq!(close_breaks_channel(97.5, &ch, &config), Some(Direction::Down));
        assert_eq!(close_breaks_channel(102.05, &ch, &config), None);
    }
}
