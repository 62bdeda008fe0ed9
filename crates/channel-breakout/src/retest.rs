use analysis_core::Candle;

use crate::breakout::close_breaks_channel;
use crate::channel::RegressionChannel;
use crate::config::DetectorConfig;
use crate::signal::{Direction, RetestEvent, RetestOutcome};

/// Breakout located by looking back from a candle under test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorBreakout {
    pub direction: Direction,
    pub index: usize,
    pub price: f64,
    pub level: f64,
}

/// Most recent close beyond a band (plus margin) within `lookback` candles
/// before `index`, searching backwards.
///
/// The breakout test is recomputed from closes; it does not depend on an
/// emitted breakout signal, so a vetoed breakout can still be retested.
pub fn find_recent_breakout(
    candles: &[Candle],
    index: usize,
    channel: &RegressionChannel,
    config: &DetectorConfig,
) -> Option<PriorBreakout> {
    let start = index.saturating_sub(config.retest_lookback);
    (start..index.min(candles.len())).rev().find_map(|i| {
        let close = candles[i].close;
        close_breaks_channel(close, channel, config).map(|direction| PriorBreakout {
            direction,
            index: i,
            price: close,
            level: match direction {
                Direction::Up => channel.upper,
                Direction::Down => channel.lower,
            },
        })
    })
}

/// Count how often `level` held in the `lookback` candles before `index`:
/// dipped to it and closed above (support) or poked to it and closed below
/// (resistance). Touches are judged with a tolerance proportional to the level.
pub fn count_level_holds(
    candles: &[Candle],
    index: usize,
    level: f64,
    is_support: bool,
    lookback: usize,
    tolerance_pct: f64,
) -> u32 {
    let end = index.min(candles.len());
    let start = index.saturating_sub(lookback).min(end);
    let tolerance = level.abs() * tolerance_pct;
    candles[start..end]
        .iter()
        .filter(|c| {
            if is_support {
                c.low <= level + tolerance && c.close > level
            } else {
                c.high >= level - tolerance && c.close < level
            }
        })
        .count() as u32
}

fn success_confidence(strength: u32, bounce: f64, config: &DetectorConfig) -> f64 {
    let normalized = strength as f64 / config.strength_normalizer.max(1) as f64;
    let mut confidence = config.retest_base_confidence + normalized * config.retest_strength_weight;
    if bounce > config.strong_bounce_ratio {
        confidence *= config.strong_bounce_bonus;
    }
    confidence.clamp(0.0, 1.0)
}

/// Classify the candle at `index` as a retest of a breakout found within the
/// retest lookback.
///
/// Returns `None` when no prior breakout is locatable or when price is still
/// hovering around the level without a decisive close either way.
pub fn classify_retest(
    instrument: &str,
    candles: &[Candle],
    index: usize,
    channel: &RegressionChannel,
    config: &DetectorConfig,
) -> Option<RetestEvent> {
    let candle = candles.get(index)?;
    let prior = find_recent_breakout(candles, index, channel, config)?;
    let tolerance = channel.deviation * config.retest_tolerance;
    let level = prior.level;
    let range = candle.range();

    let event = |outcome: RetestOutcome, strength: u32, confidence: f64, description: String| RetestEvent {
        instrument: instrument.to_string(),
        timestamp: candle.open_time,
        outcome,
        direction: prior.direction,
        price: candle.close,
        channel_level: level,
        strength,
        confidence,
        description,
    };

    match prior.direction {
        Direction::Up => {
            if candle.low <= level + tolerance && candle.close > level {
                if range <= 0.0 {
                    return None;
                }
                let bounce = (candle.close - candle.low) / range;
                if bounce < config.min_bounce_ratio {
                    return None;
                }

                let strength = count_level_holds(
                    candles,
                    index,
                    level,
                    true,
                    config.strength_lookback,
                    config.retest_level_tolerance_pct,
                );
                return Some(event(
                    RetestOutcome::Success,
                    strength,
                    success_confidence(strength, bounce, config),
                    format!(
                        "Successful retest of upper channel support ({:.4}) - price bounced from {:.4} to {:.4}",
                        level, candle.low, candle.close
                    ),
                ));
            }

            if candle.close < level - tolerance {
                return Some(event(
                    RetestOutcome::Failed,
                    0,
                    config.retest_failed_confidence.clamp(0.0, 1.0),
                    format!(
                        "Failed retest of upper channel support ({:.4}) - price fell to {:.4}",
                        level, candle.close
                    ),
                ));
            }
        }
        Direction::Down => {
            if candle.high >= level - tolerance && candle.close < level {
                if range <= 0.0 {
                    return None;
                }
                let rejection = (candle.high - candle.close) / range;
                if rejection < config.min_bounce_ratio {
                    return None;
                }

                let strength = count_level_holds(
                    candles,
                    index,
                    level,
                    false,
                    config.strength_lookback,
                    config.retest_level_tolerance_pct,
                );
                return Some(event(
                    RetestOutcome::Success,
                    strength,
                    success_confidence(strength, rejection, config),
                    format!(
                        "Successful retest of lower channel resistance ({:.4}) - price rejected from {:.4} to {:.4}",
                        level, candle.high, candle.close
                    ),
                ));
            }

            if candle.close > level + tolerance {
                return Some(event(
                    RetestOutcome::Failed,
                    0,
                    config.retest_failed_confidence.clamp(0.0, 1.0),
                    format!(
                        "Failed retest of lower channel resistance ({:.4}) - price rose to {:.4}",
                        level, candle.close
                    ),
                ));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::candle;

    // middle 100, deviation 1 -> bands [98, 102], margin 0.1, tolerance 0.15
    fn channel() -> RegressionChannel {
        RegressionChannel {
            slope: 0.0,
            intercept: 100.0,
            middle: 100.0,
            deviation: 1.0,
            upper: 102.0,
            lower: 98.0,
        }
    }

    fn quiet() -> Candle {
        candle(99.8, 100.3, 99.7, 100.1, 1000.0)
    }

    fn up_breakout() -> Candle {
        candle(101.0, 104.2, 100.9, 104.0, 3000.0)
    }

    fn down_breakout() -> Candle {
        candle(99.0, 99.1, 95.8, 96.0, 3000.0)
    }

    #[test]
    fn test_find_recent_breakout_prefers_most_recent() {
        let candles = vec![down_breakout(), quiet(), up_breakout(), quiet(), quiet()];
        let prior = find_recent_breakout(&candles, 4, &channel(), &DetectorConfig::default()).unwrap();
        assert_eq!(prior.direction, Direction::Up);
        assert_eq!(prior.index, 2);
        assert!((prior.level - 102.0).abs() < 1e-12);
    }

    #[test]
    fn test_up_retest_success() {
        // dips to 102.05 (inside tolerance), closes at 102.9 near the high
        let touch = candle(102.3, 103.0, 102.05, 102.9, 1000.0);
        let candles = vec![quiet(), up_breakout(), quiet(), touch];

        let event = classify_retest("SOLUSDT", &candles, 3, &channel(), &DetectorConfig::default()).unwrap();
        assert_eq!(event.outcome, RetestOutcome::Success);
        assert_eq!(event.direction, Direction::Up);
        assert!((event.channel_level - 102.0).abs() < 1e-12);
        // bounce (102.9 - 102.05) / 0.95 ~= 0.89 -> strong bounce bonus
        let expected = ((0.70 + event.strength as f64 / 10.0 * 0.25) * 1.1).min(1.0);
        assert!((event.confidence - expected).abs() < 1e-9);
        assert!(event.confidence >= 0.70);
    }

    #[test]
    fn test_weak_bounce_is_not_reported() {
        // touches and closes above the level but in the lower half of its range
        let weak = candle(103.5, 104.0, 102.0, 102.5, 1000.0);
        let candles = vec![quiet(), up_breakout(), quiet(), weak];
        assert!(classify_retest("X", &candles, 3, &channel(), &DetectorConfig::default()).is_none());
    }

    #[test]
    fn test_up_retest_failed() {
        let breakdown = candle(102.5, 102.6, 101.0, 101.2, 1000.0);
        let candles = vec![quiet(), up_breakout(), breakdown];

        let event = classify_retest("X", &candles, 2, &channel(), &DetectorConfig::default()).unwrap();
        assert_eq!(event.outcome, RetestOutcome::Failed);
        assert_eq!(event.strength, 0);
        assert!((event.confidence - 0.80).abs() < 1e-12);
    }

    #[test]
    fn test_hovering_near_level_is_ambiguous() {
        // closes just under the level but within tolerance: neither outcome
        let hover = candle(102.4, 102.5, 101.9, 101.9, 1000.0);
        let candles = vec![quiet(), up_breakout(), hover];
        assert!(classify_retest("X", &candles, 2, &channel(), &DetectorConfig::default()).is_none());
    }

    #[test]
    fn test_down_retest_success_and_failure() {
        let config = DetectorConfig::default();

        // pokes up to 97.95, closes at 97.1 near the low
        let rejection = candle(97.6, 97.95, 97.0, 97.1, 1000.0);
        let candles = vec![quiet(), down_breakout(), rejection];
        let event = classify_retest("X", &candles, 2, &channel(), &config).unwrap();
        assert_eq!(event.outcome, RetestOutcome::Success);
        assert_eq!(event.direction, Direction::Down);
        assert!((event.channel_level - 98.0).abs() < 1e-12);

        let reclaim = candle(97.5, 99.2, 97.4, 99.0, 1000.0);
        let candles = vec![quiet(), down_breakout(), reclaim];
        let event = classify_retest("X", &candles, 2, &channel(), &config).unwrap();
        assert_eq!(event.outcome, RetestOutcome::Failed);
        assert!((event.confidence - 0.80).abs() < 1e-12);
    }

    #[test]
    fn test_breakout_outside_lookback_yields_no_retest() {
        let config = DetectorConfig::default();
        let touch = candle(102.3, 103.0, 102.05, 102.9, 1000.0);

        // breakout exactly `retest_lookback` candles back: found
        let mut candles = vec![up_breakout()];
        candles.extend(std::iter::repeat_with(quiet).take(config.retest_lookback - 1));
        candles.push(touch.clone());
        let index = candles.len() - 1;
        assert!(classify_retest("X", &candles, index, &channel(), &config).is_some());

        // one candle further back: out of reach
        let mut candles = vec![up_breakout()];
        candles.extend(std::iter::repeat_with(quiet).take(config.retest_lookback));
        candles.push(touch);
        let index = candles.len() - 1;
        assert!(classify_retest("X", &candles, index, &channel(), &config).is_none());
    }

    #[test]
    fn test_zero_range_candle_is_not_a_bounce() {
        let flat = candle(102.05, 102.05, 102.05, 102.05, 1000.0);
        let candles = vec![up_breakout(), flat];
        assert!(classify_retest("X", &candles, 1, &channel(), &DetectorConfig::default()).is_none());
    }

    #[test]
    fn test_count_level_holds() {
        let candles = vec![
            candle(102.5, 103.0, 102.1, 102.8, 1000.0), // low within 0.5% of 102, closed above
            candle(102.5, 103.0, 101.0, 101.5, 1000.0), // closed below
            candle(104.0, 105.0, 103.5, 104.5, 1000.0), // never came near
            quiet(),
        ];
        assert_eq!(count_level_holds(&candles, 3, 102.0, true, 10, 0.005), 1);

        // index past the end is clamped to the series
        assert_eq!(count_level_holds(&candles, 9, 102.0, true, 10, 0.005), 1);
        assert_eq!(count_level_holds(&candles, 50, 102.0, true, 10, 0.005), 0);
    }
}
