use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::series::PriceSeries;

/// Trailing mean over a fixed window, maintained as a sliding accumulator.
///
/// Output is NaN while the window is not yet full, and for any window that
/// still contains a NaN input; once the NaN leaves the window the output
/// recovers. Shared core for [`Sma`] and the RSI gain/loss averages.
pub(crate) fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let mut sum = 0.0;
    let mut nan_in_window = 0usize;

    for (i, &value) in values.iter().enumerate() {
        if value.is_nan() {
            nan_in_window += 1;
        } else {
            sum += value;
        }
        if i >= window {
            let leaving = values[i - window];
            if leaving.is_nan() {
                nan_in_window -= 1;
            } else {
                sum -= leaving;
            }
        }
        if i + 1 >= window && nan_in_window == 0 {
            out[i] = sum / window as f64;
        }
    }

    out
}

/// Recursive exponential smoothing with α = 2/(window+1), seeded with the
/// first input value (the adjust=false convention: no warm-up average, no
/// NaN region). Shared core for [`Ema`] and the MACD signal line.
pub(crate) fn exp_smooth(values: &[f64], window: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let alpha = 2.0 / (window as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    out.push(prev);

    for &value in &values[1..] {
        prev = alpha * value + (1.0 - alpha) * prev;
        out.push(prev);
    }

    out
}

/// Simple Moving Average.
pub struct Sma {
    window: usize,
}

impl Sma {
    pub fn new(window: usize) -> Result<Self, Report<IndicatorError>> {
        if window == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "window must be > 0".into(),
            });
        }
        Ok(Self { window })
    }

    /// Calculate SMA values from a price slice.
    pub fn calculate_prices(&self, prices: &[f64]) -> Vec<f64> {
        rolling_mean(prices, self.window)
    }
}

impl Indicator for Sma {
    fn name(&self) -> String {
        format!("SMA_{}", self.window)
    }

    fn calculate(&self, series: &PriceSeries) -> Vec<f64> {
        self.calculate_prices(&series.closes())
    }
}

/// Exponential Moving Average.
pub struct Ema {
    window: usize,
}

impl Ema {
    pub fn new(window: usize) -> Result<Self, Report<IndicatorError>> {
        if window == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "window must be > 0".into(),
            });
        }
        Ok(Self { window })
    }

    /// Calculate EMA values from a price slice.
    pub fn calculate_prices(&self, prices: &[f64]) -> Vec<f64> {
        exp_smooth(prices, self.window)
    }
}

impl Indicator for Ema {
    fn name(&self) -> String {
        format!("EMA_{}", self.window)
    }

    fn calculate(&self, series: &PriceSeries) -> Vec<f64> {
        self.calculate_prices(&series.closes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_window_zero_invalid() {
        assert!(Sma::new(0).is_err());
    }

    #[test]
    fn sma_warm_up_region_is_nan() {
        let sma = Sma::new(5).unwrap();
        let values = sma.calculate_prices(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(values.len(), 6);
        for v in &values[..4] {
            assert!(v.is_nan());
        }
        assert!(!values[4].is_nan());
    }

    #[test]
    fn sma_known_values() {
        // Closes 10..=20: SMA(5) at index 4 = mean(10..14) = 12.0, index 3 NaN.
        let closes: Vec<f64> = (10..=20).map(|x| x as f64).collect();
        let sma = Sma::new(5).unwrap();
        let values = sma.calculate_prices(&closes);
        assert_eq!(values.len(), 11);
        assert!(values[3].is_nan());
        assert!((values[4] - 12.0).abs() < 1e-9);
        assert!((values[10] - 18.0).abs() < 1e-9);
    }

    #[test]
    fn sma_flat_prices() {
        let sma = Sma::new(3).unwrap();
        let values = sma.calculate_prices(&[10.0; 5]);
        for v in &values[2..] {
            assert!((v - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn sma_window_one_is_identity() {
        let sma = Sma::new(1).unwrap();
        let values = sma.calculate_prices(&[3.0, 1.0, 4.0]);
        assert_eq!(values, vec![3.0, 1.0, 4.0]);
    }

    #[test]
    fn sma_nan_input_poisons_only_containing_windows() {
        let sma = Sma::new(2).unwrap();
        let values = sma.calculate_prices(&[1.0, f64::NAN, 3.0, 5.0]);
        assert!(values[1].is_nan()); // window [1, NaN]
        assert!(values[2].is_nan()); // window [NaN, 3]
        assert!((values[3] - 4.0).abs() < 1e-9); // NaN left the window
    }

    #[test]
    fn sma_idempotent_bit_identical() {
        let closes = vec![44.34, 44.09, 44.15, 43.61, 44.33, 44.83];
        let sma = Sma::new(3).unwrap();
        let first = sma.calculate_prices(&closes);
        let second = sma.calculate_prices(&closes);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn ema_window_zero_invalid() {
        assert!(Ema::new(0).is_err());
    }

    #[test]
    fn ema_seed_equals_first_close() {
        let ema = Ema::new(20).unwrap();
        let values = ema.calculate_prices(&[42.5, 43.0, 41.0]);
        assert_eq!(values[0], 42.5);
    }

    #[test]
    fn ema_has_no_nan_region() {
        let ema = Ema::new(5).unwrap();
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let values = ema.calculate_prices(&closes);
        assert_eq!(values.len(), 10);
        for v in &values {
            assert!(!v.is_nan());
        }
    }

    #[test]
    fn ema_known_recursion() {
        // window 3 -> alpha = 0.5
        let ema = Ema::new(3).unwrap();
        let values = ema.calculate_prices(&[2.0, 4.0, 8.0]);
        assert!((values[1] - 3.0).abs() < 1e-9); // 0.5*4 + 0.5*2
        assert!((values[2] - 5.5).abs() < 1e-9); // 0.5*8 + 0.5*3
    }

    #[test]
    fn ema_flat_prices() {
        let ema = Ema::new(4).unwrap();
        let values = ema.calculate_prices(&[10.0; 6]);
        for v in &values {
            assert!((v - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn ema_empty_input_yields_empty() {
        let ema = Ema::new(3).unwrap();
        assert!(ema.calculate_prices(&[]).is_empty());
    }
}
