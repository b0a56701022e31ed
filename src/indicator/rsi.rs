use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::indicator::ma::rolling_mean;
use crate::series::PriceSeries;

/// Relative Strength Index over rolling simple averages of gains and losses.
///
/// The delta at index 0 is undefined, so the gain/loss sequences start with
/// NaN and the first defined RSI value lands at index `periods`. When the
/// average loss is zero and the average gain is positive, RSI saturates to
/// 100; when both averages are zero (flat run) the 0/0 indeterminate is
/// propagated as NaN.
pub struct Rsi {
    periods: usize,
}

impl Rsi {
    pub fn new(periods: usize) -> Result<Self, Report<IndicatorError>> {
        if periods == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "periods must be > 0".into(),
            });
        }
        Ok(Self { periods })
    }

    /// Calculate RSI values from a price slice.
    pub fn calculate_prices(&self, prices: &[f64]) -> Vec<f64> {
        let n = prices.len();
        if n == 0 {
            return Vec::new();
        }

        let mut gains = vec![f64::NAN; n];
        let mut losses = vec![f64::NAN; n];
        for i in 1..n {
            let delta = prices[i] - prices[i - 1];
            if delta.is_nan() {
                continue;
            }
            gains[i] = delta.max(0.0);
            losses[i] = (-delta).max(0.0);
        }

        let avg_gain = rolling_mean(&gains, self.periods);
        let avg_loss = rolling_mean(&losses, self.periods);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&gain, &loss)| rsi_value(gain, loss))
            .collect()
    }
}

impl Indicator for Rsi {
    fn name(&self) -> String {
        "RSI".into()
    }

    fn calculate(&self, series: &PriceSeries) -> Vec<f64> {
        self.calculate_prices(&series.closes())
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        return f64::NAN;
    }
    if avg_loss == 0.0 {
        // 0/0 indeterminate on a flat run
        if avg_gain == 0.0 {
            return f64::NAN;
        }
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
