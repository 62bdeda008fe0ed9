//! Candle builders shared by the unit and scenario tests.

use analysis_core::{Candle, Timeframe};
use chrono::{DateTime, TimeZone, Utc};

use crate::channel::RegressionChannel;
use crate::config::DetectorConfig;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Hourly candle at the base time
pub fn candle(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
    let open_time = base_time();
    Candle {
        open_time,
        close_time: open_time + Timeframe::Hour1.to_duration(),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Restamp a series so candle `i` opens `i` hours after the base time
pub fn sequenced(mut candles: Vec<Candle>) -> Vec<Candle> {
    for (i, c) in candles.iter_mut().enumerate() {
        let step = Timeframe::Hour1.to_duration();
        c.open_time = base_time() + step * i as i32;
        c.close_time = c.open_time + step;
    }
    candles
}

/// Zero-width channel pinned at `level`
pub fn flat_channel(level: f64) -> RegressionChannel {
    RegressionChannel {
        slope: 0.0,
        intercept: level,
        middle: level,
        deviation: 0.0,
        upper: level,
        lower: level,
    }
}

/// Gently rising zig-zag used as the channel-fitting window.
///
/// Closes alternate one unit above and below `100 + 0.05 * i`, which fits to
/// a deviation of almost exactly 1.
pub fn fit_candles(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let even = i % 2 == 0;
            let close = 100.0 + 0.05 * i as f64 + if even { 1.0 } else { -1.0 };
            let open = if even { close - 0.25 } else { close + 0.25 };
            candle(open, open.max(close) + 0.25, open.min(close) - 0.25, close, 1000.0)
        })
        .collect()
}

/// Channel fitted over [`fit_candles`] with the default configuration
pub fn fitted_channel(fit: &[Candle]) -> RegressionChannel {
    let config = DetectorConfig::default();
    let closes: Vec<f64> = fit.iter().map(|c| c.close).collect();
    RegressionChannel::fit(&closes, config.channel_length, config.deviation_multiplier).unwrap()
}

/// `count` small candles oscillating half a deviation around the middle
pub fn hover(channel: &RegressionChannel, count: usize) -> Vec<Candle> {
    let dev = channel.deviation;
    (0..count)
        .map(|j| {
            let even = j % 2 == 0;
            let close = channel.middle + if even { 0.5 } else { -0.5 } * dev;
            let open = if even { close - 0.3 * dev } else { close + 0.3 * dev };
            candle(
                open,
                open.max(close) + 0.2 * dev,
                open.min(close) - 0.2 * dev,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Green candle opening at `prev_close` and closing five deviations above the
/// upper band on triple volume, with a 90% body.
pub fn breakout_after(channel: &RegressionChannel, prev_close: f64) -> Candle {
    let close = channel.upper + 5.0 * channel.deviation;
    let open = prev_close;
    let range = (close - open) / 0.9;
    candle(open, close + range * 0.05, open - range * 0.05, close, 3000.0)
}

/// Nine rising candles climbing to just under the upper band, then a green
/// candle closing ten deviations above it.
pub fn overheated_run(channel: &RegressionChannel, prev_close: f64) -> Vec<Candle> {
    let dev = channel.deviation;
    let step = (channel.upper - 0.1 * dev - prev_close) / 9.5;
    let mut prev = prev_close;
    let mut out = Vec::with_capacity(10);
    for _ in 0..9 {
        let close = prev + step;
        out.push(candle(prev, close + 0.05 * dev, prev - 0.05 * dev, close, 1000.0));
        prev = close;
    }
    let close = channel.upper + 10.0 * dev;
    out.push(candle(prev, close + 0.2 * dev, prev - 0.2 * dev, close, 3000.0));
    out
}

pub fn flat_series(price: f64, count: usize) -> Vec<Candle> {
    (0..count).map(|_| candle(price, price, price, price, 1000.0)).collect()
}
