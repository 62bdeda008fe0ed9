use analysis_core::AnalysisError;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Inclusive RSI acceptance band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiBand {
    pub min: f64,
    pub max: f64,
}

impl RsiBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, rsi: f64) -> bool {
        rsi >= self.min && rsi <= self.max
    }
}

/// Tuning knobs for the channel breakout engine.
///
/// The thresholds were tuned empirically against hourly crypto futures candles;
/// keep them as they are unless you are re-tuning on fresh data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    // Channel
    pub channel_length: usize, // 100 candles
    pub deviation_multiplier: f64, // 2.0
    pub analysis_window: usize, // 10 most recent candles

    // Breakout
    pub breakout_margin: f64, // 0.10 x deviation beyond the band
    pub strength_lookback: usize, // 10 candles before the event
    pub strength_normalizer: usize, // strength / 10 -> [0, 1]
    pub volume_surge_ratio: f64, // volume > 1.10 x previous candle
    pub volume_bonus: f64, // x1.10
    pub decisive_body_ratio: f64, // body > 70% of range
    pub decisive_bonus: f64, // x1.05

    // Retest
    pub retest_tolerance: f64, // 0.15 x deviation
    pub retest_lookback: usize, // 5 candles back for the prior breakout
    pub min_bounce_ratio: f64, // close in the top 40% of the range
    pub strong_bounce_ratio: f64, // 0.80
    pub strong_bounce_bonus: f64, // x1.10
    pub retest_base_confidence: f64, // 0.70
    pub retest_strength_weight: f64, // +0.25 x strength / 10
    pub retest_failed_confidence: f64, // 0.80
    pub retest_level_tolerance_pct: f64, // 0.5% of the level when counting holds

    // Momentum filter
    pub rsi_period: usize, // 14
    pub up_rsi_band: RsiBand, // [30, 80]
    pub down_rsi_band: RsiBand, // [20, 70]
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            channel_length: 100,
            deviation_multiplier: 2.0,
            analysis_window: 10,

            breakout_margin: 0.10,
            strength_lookback: 10,
            strength_normalizer: 10,
            volume_surge_ratio: 1.10,
            volume_bonus: 1.10,
            decisive_body_ratio: 0.70,
            decisive_bonus: 1.05,

            retest_tolerance: 0.15,
            retest_lookback: 5,
            min_bounce_ratio: 0.60,
            strong_bounce_ratio: 0.80,
            strong_bounce_bonus: 1.10,
            retest_base_confidence: 0.70,
            retest_strength_weight: 0.25,
            retest_failed_confidence: 0.80,
            retest_level_tolerance_pct: 0.005,

            rsi_period: 14,
            up_rsi_band: RsiBand::new(30.0, 80.0),
            down_rsi_band: RsiBand::new(20.0, 70.0),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, AnalysisError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AnalysisError::InvalidConfig(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}

impl DetectorConfig {
    /// Minimum number of candles a series needs: the fitting window plus the
    /// analysis window, which never overlap.
    pub fn required_candles(&self) -> usize {
        self.channel_length.saturating_add(self.analysis_window)
    }

    /// Load from `BREAKOUT_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let d = Self::default();
        let config = Self {
            channel_length: env_or("BREAKOUT_CHANNEL_LENGTH", d.channel_length)?,
            deviation_multiplier: env_or("BREAKOUT_DEVIATION_MULTIPLIER", d.deviation_multiplier)?,
            analysis_window: env_or("BREAKOUT_ANALYSIS_WINDOW", d.analysis_window)?,

            breakout_margin: env_or("BREAKOUT_MARGIN", d.breakout_margin)?,
            strength_lookback: env_or("BREAKOUT_STRENGTH_LOOKBACK", d.strength_lookback)?,
            strength_normalizer: d.strength_normalizer,
            volume_surge_ratio: env_or("BREAKOUT_VOLUME_SURGE_RATIO", d.volume_surge_ratio)?,
            volume_bonus: d.volume_bonus,
            decisive_body_ratio: env_or("BREAKOUT_DECISIVE_BODY_RATIO", d.decisive_body_ratio)?,
            decisive_bonus: d.decisive_bonus,

            retest_tolerance: env_or("BREAKOUT_RETEST_TOLERANCE", d.retest_tolerance)?,
            retest_lookback: env_or("BREAKOUT_RETEST_LOOKBACK", d.retest_lookback)?,
            min_bounce_ratio: env_or("BREAKOUT_MIN_BOUNCE_RATIO", d.min_bounce_ratio)?,
            strong_bounce_ratio: d.strong_bounce_ratio,
            strong_bounce_bonus: d.strong_bounce_bonus,
            retest_base_confidence: d.retest_base_confidence,
            retest_strength_weight: d.retest_strength_weight,
            retest_failed_confidence: env_or("BREAKOUT_RETEST_FAILED_CONFIDENCE", d.retest_failed_confidence)?,
            retest_level_tolerance_pct: d.retest_level_tolerance_pct,

            rsi_period: env_or("BREAKOUT_RSI_PERIOD", d.rsi_period)?,
            up_rsi_band: RsiBand::new(
                env_or("BREAKOUT_UP_RSI_MIN", d.up_rsi_band.min)?,
                env_or("BREAKOUT_UP_RSI_MAX", d.up_rsi_band.max)?,
            ),
            down_rsi_band: RsiBand::new(
                env_or("BREAKOUT_DOWN_RSI_MIN", d.down_rsi_band.min)?,
                env_or("BREAKOUT_DOWN_RSI_MAX", d.down_rsi_band.max)?,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.channel_length < 2 {
            return Err(AnalysisError::InvalidConfig(
                "channel_length must be at least 2".to_string(),
            ));
        }
        if self.analysis_window == 0 {
            return Err(AnalysisError::InvalidConfig(
                "analysis_window must be at least 1".to_string(),
            ));
        }
        if self.rsi_period == 0 {
            return Err(AnalysisError::InvalidConfig(
                "rsi_period must be at least 1".to_string(),
            ));
        }
        if self.channel_length.checked_add(self.analysis_window).is_none() {
            return Err(AnalysisError::InvalidConfig(format!(
                "channel_length {} + analysis_window {} overflows",
                self.channel_length, self.analysis_window
            )));
        }
        if self.strength_normalizer == 0 {
            return Err(AnalysisError::InvalidConfig(
                "strength_normalizer must be at least 1".to_string(),
            ));
        }

        let non_negative = [
            ("deviation_multiplier", self.deviation_multiplier),
            ("breakout_margin", self.breakout_margin),
            ("retest_tolerance", self.retest_tolerance),
            ("retest_level_tolerance_pct", self.retest_level_tolerance_pct),
            ("volume_surge_ratio", self.volume_surge_ratio),
            ("volume_bonus", self.volume_bonus),
            ("decisive_body_ratio", self.decisive_body_ratio),
            ("decisive_bonus", self.decisive_bonus),
            ("min_bounce_ratio", self.min_bounce_ratio),
            ("strong_bounce_ratio", self.strong_bounce_ratio),
            ("strong_bounce_bonus", self.strong_bounce_bonus),
            ("retest_strength_weight", self.retest_strength_weight),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        let confidences = [
            ("retest_base_confidence", self.retest_base_confidence),
            ("retest_failed_confidence", self.retest_failed_confidence),
        ];
        for (name, value) in confidences {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        for (name, band) in [("up_rsi_band", self.up_rsi_band), ("down_rsi_band", self.down_rsi_band)] {
            if !band.min.is_finite() || !band.max.is_finite() || band.min > band.max || band.min < 0.0 || band.max > 100.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{} [{}, {}] must be an ordered range inside [0, 100]",
                    name, band.min, band.max
                )));
            }
        }

        Ok(())
    }
}
