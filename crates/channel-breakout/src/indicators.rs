/// Neutral RSI returned when there is not enough history.
pub const NEUTRAL_RSI: f64 = 50.0;

/// Ordinary least-squares fit of `data` against its index (0..n-1).
///
/// Returns `(slope, intercept)`, or `None` for fewer than two points.
pub fn linear_regression(data: &[f64]) -> Option<(f64, f64)> {
    if data.len() < 2 {
        return None;
    }

    let n = data.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;

    for (i, &y) in data.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / n;

    Some((slope, intercept))
}

/// Root-mean-square of residuals against the fitted line
pub fn residual_deviation(data: &[f64], slope: f64, intercept: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = data
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            let predicted = intercept + slope * i as f64;
            (y - predicted).powi(2)
        })
        .sum();

    (sum_sq / data.len() as f64).sqrt()
}

/// Relative Strength Index at the last price of `data`, using simple averages
/// of gains and losses over the trailing `period` deltas.
///
/// Falls back to [`NEUTRAL_RSI`] with fewer than `period + 1` prices. A window
/// with no losses is 100.
pub fn rsi_at(data: &[f64], period: usize) -> f64 {
    if period == 0 || data.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let window = &data[data.len() - period - 1..];
    let mut gains = 0.0;
    let mut losses = 0.0;

    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

