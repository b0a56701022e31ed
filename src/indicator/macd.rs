use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::indicator::ma::exp_smooth;
use crate::series::PriceSeries;

/// The three aligned output series of a MACD computation.
#[derive(Debug, Clone)]
pub struct MacdOutput {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Moving Average Convergence-Divergence.
///
/// macd = EMA(fast) − EMA(slow); signal = EMA(signal) over the macd series,
/// seeded with macd[0]; histogram = macd − signal. All three series are
/// fully defined for every index (the underlying EMAs have no NaN region).
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    ) -> Result<Self, Report<IndicatorError>> {
        if fast_period == 0 || slow_period == 0 || signal_period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "all periods must be > 0".into(),
            });
        }
        Ok(Self {
            fast_period,
            slow_period,
            signal_period,
        })
    }

    /// Calculate all three series from a price slice.
    pub fn calculate_prices(&self, prices: &[f64]) -> MacdOutput {
        let fast_ema = exp_smooth(prices, self.fast_period);
        let slow_ema = exp_smooth(prices, self.slow_period);

        let macd: Vec<f64> = fast_ema
            .iter()
            .zip(&slow_ema)
            .map(|(fast, slow)| fast - slow)
            .collect();

        let signal = exp_smooth(&macd, self.signal_period);

        let histogram: Vec<f64> = macd
            .iter()
            .zip(&signal)
            .map(|(macd, signal)| macd - signal)
            .collect();

        MacdOutput {
            macd,
            signal,
            histogram,
        }
    }

    /// Calculate (macd, signal, histogram) from a validated series.
    pub fn calculate_full(&self, series: &PriceSeries) -> MacdOutput {
        self.calculate_prices(&series.closes())
    }
}

impl Indicator for Macd {
    fn name(&self) -> String {
        "MACD".into()
    }

    /// MACD line only; the session stores the signal line and histogram via
    /// [`Macd::calculate_full`].
    fn calculate(&self, series: &PriceSeries) -> Vec<f64> {
        self.calculate_full(series).macd
    }
}
