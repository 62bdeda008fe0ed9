use crate::{AnalysisError, Candle};

/// Trait for engines that turn a candle history into trading signals.
///
/// Implementations must be pure functions of the supplied window so a host can
/// run them concurrently across instruments.
pub trait SignalDetector: Send + Sync {
    type Signal;

    fn detect(&self, instrument: &str, candles: &[Candle]) -> Result<Vec<Self::Signal>, AnalysisError>;
}
