use analysis_core::{AnalysisError, Candle, SignalDetector};
use serde::{Deserialize, Serialize};

use crate::breakout::classify_breakout;
use crate::channel::RegressionChannel;
use crate::config::DetectorConfig;
use crate::indicators::rsi_at;
use crate::momentum::passes_momentum_filter;
use crate::retest::classify_retest;
use crate::signal::{Signal, SignalEvent};

/// Everything one detection pass produced for an instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelAnalysis {
    pub instrument: String,
    pub channel: RegressionChannel,
    /// Index of the first candle in the analysis window
    pub analysis_start: usize,
    pub signals: Vec<Signal>,
    /// Events that were classified but vetoed by the momentum filter
    pub vetoed: Vec<Signal>,
}

/// Breakout/retest engine over a linear-regression channel.
///
/// Fits one channel on the `channel_length` candles that precede the analysis
/// window, then walks the window once. The channel is never refit on the
/// candles it judges.
pub struct ChannelBreakoutDetector {
    config: DetectorConfig,
}

impl ChannelBreakoutDetector {
    pub fn new() -> Self {
        Self {
            config: DetectorConfig::default(),
        }
    }

    pub fn with_config(config: DetectorConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Full detection pass, keeping the channel and vetoed events for inspection.
    pub fn analyze(&self, instrument: &str, candles: &[Candle]) -> Result<ChannelAnalysis, AnalysisError> {
        let config = &self.config;
        let required = config.required_candles();
        if candles.len() < required {
            return Err(AnalysisError::InsufficientData {
                required,
                available: candles.len(),
            });
        }

        let analysis_start = candles.len() - config.analysis_window;
        let fit_start = analysis_start - config.channel_length;
        for candle in &candles[fit_start..] {
            candle.validate()?;
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let channel = RegressionChannel::fit(
            &closes[fit_start..analysis_start],
            config.channel_length,
            config.deviation_multiplier,
        )?;

        let mut signals = Vec::new();
        let mut vetoed = Vec::new();

        for index in analysis_start..candles.len() {
            let rsi = rsi_at(&closes[..=index], config.rsi_period);

            let breakout = classify_breakout(instrument, candles, index, &channel, config).map(SignalEvent::Breakout);
            let retest = classify_retest(instrument, candles, index, &channel, config).map(SignalEvent::Retest);

            for event in breakout.into_iter().chain(retest) {
                let signal = Signal { index, rsi, event };
                if passes_momentum_filter(&signal, config) {
                    signals.push(signal);
                } else {
                    tracing::debug!(
                        "{}: {} at candle {} vetoed by RSI filter (rsi={:.1})",
                        instrument,
                        signal.kind(),
                        index,
                        rsi
                    );
                    vetoed.push(signal);
                }
            }
        }

        Ok(ChannelAnalysis {
            instrument: instrument.to_string(),
            channel,
            analysis_start,
            signals,
            vetoed,
        })
    }
}

impl SignalDetector for ChannelBreakoutDetector {
    type Signal = Signal;

    fn detect(&self, instrument: &str, candles: &[Candle]) -> Result<Vec<Signal>, AnalysisError> {
        self.analyze(instrument, candles).map(|analysis| analysis.signals)
    }
}

impl Default for ChannelBreakoutDetector {
    fn default() -> Self {
        Self::new()
    }
}
