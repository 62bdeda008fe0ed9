//! Multi-instrument Scanner
//!
//! Runs the detector across a universe of instruments in parallel. Each
//! instrument is analyzed independently; one bad series never stops the scan.

use std::time::Instant;

use analysis_core::Candle;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::channel::RegressionChannel;
use crate::detector::ChannelBreakoutDetector;
use crate::signal::{Signal, SignalKind};

/// Candle history for one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentCandles {
    pub instrument: String,
    pub candles: Vec<Candle>,
}

impl InstrumentCandles {
    pub fn new(instrument: impl Into<String>, candles: Vec<Candle>) -> Self {
        Self {
            instrument: instrument.into(),
            candles,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentResult {
    pub instrument: String,
    pub channel: RegressionChannel,
    pub signals: Vec<Signal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub instrument: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub results: Vec<InstrumentResult>,
    pub failures: Vec<ScanFailure>,
    /// Every reported signal, in universe order
    pub signals: Vec<Signal>,
    pub elapsed_ms: u64,
}

impl ScanReport {
    /// Instruments that produced each signal kind, sorted and deduplicated.
    /// Kinds with no instruments are omitted.
    pub fn instruments_by_kind(&self) -> Vec<(SignalKind, Vec<String>)> {
        SignalKind::all()
            .into_iter()
            .filter_map(|kind| {
                let mut instruments: Vec<String> = self
                    .signals
                    .iter()
                    .filter(|s| s.kind() == kind)
                    .map(|s| s.instrument().to_string())
                    .collect();
                instruments.sort();
                instruments.dedup();
                (!instruments.is_empty()).then_some((kind, instruments))
            })
            .collect()
    }

    pub fn instruments_scanned(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}

pub struct BreakoutScanner {
    detector: ChannelBreakoutDetector,
    min_confidence: f64,
}

impl BreakoutScanner {
    pub fn new(detector: ChannelBreakoutDetector) -> Self {
        Self {
            detector,
            min_confidence: 0.0,
        }
    }

    /// Drop signals below `min_confidence` from the report
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn scan(&self, universe: &[InstrumentCandles]) -> ScanReport {
        let start = Instant::now();

        let outcomes: Vec<_> = universe
            .par_iter()
            .map(|item| (item, self.detector.analyze(&item.instrument, &item.candles)))
            .collect();

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for (item, outcome) in outcomes {
            match outcome {
                Ok(analysis) => {
                    let signals: Vec<Signal> = analysis
                        .signals
                        .into_iter()
                        .filter(|s| s.confidence() >= self.min_confidence)
                        .collect();
                    results.push(InstrumentResult {
                        instrument: analysis.instrument,
                        channel: analysis.channel,
                        signals,
                    });
                }
                Err(e) => {
                    tracing::warn!("Failed to analyze {}: {}", item.instrument, e);
                    failures.push(ScanFailure {
                        instrument: item.instrument.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let signals: Vec<Signal> = results.iter().flat_map(|r| r.signals.iter().cloned()).collect();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Scanned {} instruments in {}ms: {} signals, {} failures",
            universe.len(),
            elapsed_ms,
            signals.len(),
            failures.len()
        );

        ScanReport {
            results,
            failures,
            signals,
            elapsed_ms,
        }
    }
}

impl Default for BreakoutScanner {
    fn default() -> Self {
        Self::new(ChannelBreakoutDetector::default())
    }
}
