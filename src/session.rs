use error_stack::Report;
use tracing::info;

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::indicator::ma::{Ema, Sma};
use crate::indicator::macd::Macd;
use crate::indicator::rsi::Rsi;
use crate::model::TrendLabel;
use crate::series::PriceSeries;
use crate::trend;

/// Insertion-ordered indicator name → series map.
///
/// Re-inserting an existing name replaces its series in place (last write
/// wins) while keeping the original position, so export column order stays
/// stable across recomputations.
#[derive(Debug, Clone, Default)]
pub struct IndicatorMap {
    entries: Vec<(String, Vec<f64>)>,
}

impl IndicatorMap {
    pub fn insert(&mut self, name: String, values: Vec<f64>) {
        match self.entries.iter_mut().find(|entry| entry.0 == name) {
            Some(entry) => entry.1 = values,
            None => self.entries.push((name, values)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.entries
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Indicator windows for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisParams {
    pub sma_short: usize,
    pub sma_long: usize,
    pub ema_window: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            sma_short: 20,
            sma_long: 50,
            ema_window: 20,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

/// One analysis run: the validated series, every computed indicator series
/// keyed by name, and the per-index trend labels. Lives for a single run and
/// is read by the export and chart consumers afterwards.
pub struct AnalysisSession {
    series: PriceSeries,
    indicators: IndicatorMap,
    trend: Vec<TrendLabel>,
}

impl AnalysisSession {
    pub fn new(series: PriceSeries) -> Self {
        Self {
            series,
            indicators: IndicatorMap::default(),
            trend: Vec::new(),
        }
    }

    /// Run the full default pipeline over a validated series: SMA(short),
    /// SMA(long), EMA, RSI, MACD, then trend classification from the stored
    /// SMA/RSI series.
    pub fn analyze(
        series: PriceSeries,
        params: &AnalysisParams,
    ) -> Result<Self, Report<IndicatorError>> {
        let mut session = Self::new(series);
        session.compute(&Sma::new(params.sma_short)?);
        session.compute(&Sma::new(params.sma_long)?);
        session.compute(&Ema::new(params.ema_window)?);
        session.compute(&Rsi::new(params.rsi_period)?);
        session.compute_macd(&Macd::new(
            params.macd_fast,
            params.macd_slow,
            params.macd_signal,
        )?);
        session.classify_trend(params)?;
        Ok(session)
    }

    /// Compute an indicator and store its series under the indicator's key.
    pub fn compute(&mut self, indicator: &dyn Indicator) {
        let name = indicator.name();
        let values = indicator.calculate(&self.series);
        info!(indicator = %name, points = values.len(), "indicator computed");
        self.indicators.insert(name, values);
    }

    /// Compute MACD and store all three of its series.
    pub fn compute_macd(&mut self, macd: &Macd) {
        let out = macd.calculate_full(&self.series);
        info!(points = out.macd.len(), "macd computed");
        self.indicators.insert("MACD".into(), out.macd);
        self.indicators.insert("Signal".into(), out.signal);
        self.indicators.insert("Histogram".into(), out.histogram);
    }

    /// Classify the trend from the stored SMA short/long and RSI series.
    ///
    /// Series already present are used as-is (never recomputed); any that
    /// are missing are computed and stored first.
    pub fn classify_trend(
        &mut self,
        params: &AnalysisParams,
    ) -> Result<&[TrendLabel], Report<IndicatorError>> {
        let short_key = format!("SMA_{}", params.sma_short);
        let long_key = format!("SMA_{}", params.sma_long);

        if !self.indicators.contains(&short_key) {
            self.compute(&Sma::new(params.sma_short)?);
        }
        if !self.indicators.contains(&long_key) {
            self.compute(&Sma::new(params.sma_long)?);
        }
        if !self.indicators.contains("RSI") {
            self.compute(&Rsi::new(params.rsi_period)?);
        }

        let labels = trend::classify(
            self.indicators.get(&short_key).unwrap_or(&[]),
            self.indicators.get(&long_key).unwrap_or(&[]),
            self.indicators.get("RSI").unwrap_or(&[]),
        );
        info!(points = labels.len(), "trend classified");
        self.trend = labels;
        Ok(&self.trend)
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn indicators(&self) -> &IndicatorMap {
        &self.indicators
    }

    pub fn trend(&self) -> &[TrendLabel] {
        &self.trend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{RawSeries, validate};
    use chrono::{TimeZone, Utc};

    fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let n = closes.len();
        let raw = RawSeries {
            timestamps: (0..n)
                .map(|i| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(i as i64))
                .collect(),
            open: Some(closes.to_vec()),
            high: Some(closes.to_vec()),
            low: Some(closes.to_vec()),
            close: Some(closes.to_vec()),
            volume: Some(vec![1.0; n]),
        };
        validate(raw).unwrap()
    }

    #[test]
    fn analyze_stores_canonical_keys() {
        let closes: Vec<f64> = (1..=60).map(|x| x as f64).collect();
        let session =
            AnalysisSession::analyze(series_from_closes(&closes), &AnalysisParams::default())
                .unwrap();

        for key in ["SMA_20", "SMA_50", "EMA_20", "RSI", "MACD", "Signal", "Histogram"] {
            let series = session.indicators().get(key).unwrap_or_else(|| {
                panic!("missing key {key}");
            });
            assert_eq!(series.len(), 60, "{key} misaligned");
        }
        assert_eq!(session.trend().len(), 60);
    }

    #[test]
    fn analyze_rejects_zero_window() {
        let params = AnalysisParams {
            sma_short: 0,
            ..AnalysisParams::default()
        };
        let result = AnalysisSession::analyze(series_from_closes(&[1.0, 2.0]), &params);
        assert!(result.is_err());
    }

    #[test]
    fn reinserting_a_key_overwrites_in_place() {
        let mut map = IndicatorMap::default();
        map.insert("SMA_20".into(), vec![1.0]);
        map.insert("RSI".into(), vec![2.0]);
        map.insert("SMA_20".into(), vec![3.0]);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("SMA_20"), Some([3.0].as_slice()));
        // Position of the overwritten entry is preserved.
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["SMA_20", "RSI"]);
    }

    #[test]
    fn compute_overwrites_previous_series_for_same_key() {
        let mut session = AnalysisSession::new(series_from_closes(&[1.0, 2.0, 3.0, 4.0]));
        session.compute(&Sma::new(2).unwrap());
        let first = session.indicators().get("SMA_2").unwrap().to_vec();
        session.compute(&Sma::new(2).unwrap());
        assert_eq!(session.indicators().get("SMA_2").unwrap(), &first[..]);
        assert_eq!(session.indicators().len(), 1);
    }

    #[test]
    fn classify_trend_reuses_stored_series() {
        let closes: Vec<f64> = (1..=60).map(|x| x as f64).collect();
        let mut session = AnalysisSession::new(series_from_closes(&closes));
        let params = AnalysisParams::default();

        // Pre-store a deliberately falsified SMA_20 so reuse is observable:
        // all-NaN short SMA forces Neutral everywhere.
        session.indicators.insert("SMA_20".into(), vec![f64::NAN; 60]);
        session.classify_trend(&params).unwrap();
        assert!(session.trend().iter().all(|l| *l == TrendLabel::Neutral));
    }

    #[test]
    fn classify_trend_computes_missing_prerequisites() {
        let closes: Vec<f64> = (1..=60).map(|x| x as f64).collect();
        let mut session = AnalysisSession::new(series_from_closes(&closes));
        session.classify_trend(&AnalysisParams::default()).unwrap();

        assert!(session.indicators().contains("SMA_20"));
        assert!(session.indicators().contains("SMA_50"));
        assert!(session.indicators().contains("RSI"));
        assert_eq!(session.trend().len(), 60);
    }
}
