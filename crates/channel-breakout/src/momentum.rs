use crate::config::DetectorConfig;
use crate::signal::{Direction, Signal, SignalEvent, RetestOutcome};

/// RSI veto applied to classified events.
///
/// Directional entries (breakouts and successful retests) must sit inside the
/// acceptance band for their direction. Failed retests are not entries and pass
/// through unfiltered.
pub fn passes_momentum_filter(signal: &Signal, config: &DetectorConfig) -> bool {
    match &signal.event {
        SignalEvent::Retest(r) if r.outcome == RetestOutcome::Failed => true,
        _ => rsi_accepts(signal.rsi, signal.direction(), config),
    }
}

/// Whether `rsi` is acceptable for an entry in `direction`
pub fn rsi_accepts(rsi: f64, direction: Direction, config: &DetectorConfig) -> bool {
    match direction {
        Direction::Up => config.up_rsi_band.contains(rsi),
        Direction::Down => config.down_rsi_band.contains(rsi),
    }
}
