use analysis_core::AnalysisError;
use serde::{Deserialize, Serialize};

use crate::indicators::{linear_regression, residual_deviation};

/// Linear-regression price channel fitted over a trailing window of closes.
///
/// `middle` is the fitted value at the last index of the window, so the bands
/// describe "now" rather than the window's centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionChannel {
    pub slope: f64,
    pub intercept: f64,
    pub middle: f64,
    pub deviation: f64,
    pub upper: f64,
    pub lower: f64,
}

impl RegressionChannel {
    /// Fit over exactly the last `length` prices.
    ///
    /// Refuses to fit on a shorter sample: a channel from too little data is
    /// statistically meaningless, not just less precise.
    pub fn fit(prices: &[f64], length: usize, multiplier: f64) -> Result<Self, AnalysisError> {
        if length < 2 || prices.len() < length {
            return Err(AnalysisError::InsufficientData {
                required: length.max(2),
                available: prices.len(),
            });
        }

        let data = &prices[prices.len() - length..];
        let (slope, intercept) = linear_regression(data).ok_or(AnalysisError::InsufficientData {
            required: length,
            available: data.len(),
        })?;
        let deviation = residual_deviation(data, slope, intercept);

        let middle = intercept + slope * (length - 1) as f64;
        let width = deviation * multiplier.max(0.0);

        let channel = Self {
            slope,
            intercept,
            middle,
            deviation,
            upper: middle + width,
            lower: middle - width,
        };

        tracing::debug!(
            "Fitted channel over {} closes: slope={:.6} middle={:.4} dev={:.4} bands=[{:.4}, {:.4}]",
            length,
            channel.slope,
            channel.middle,
            channel.deviation,
            channel.lower,
            channel.upper
        );

        Ok(channel)
    }

    pub fn trend_up(&self) -> bool {
        self.slope > 0.0
    }

    pub fn trend_down(&self) -> bool {
        self.slope < 0.0
    }

    /// Zero-width channel (flat fitting window)
    pub fn is_degenerate(&self) -> bool {
        self.deviation == 0.0
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}
