use chrono::{DateTime, Utc};
use error_stack::Report;

use crate::error::SeriesError;
use crate::model::PricePoint;

/// Column-oriented raw table as returned by a data source, before
/// validation. A `None` column means the field was absent upstream; NaN
/// entries inside a column are missing values passed through as-is.
#[derive(Debug, Clone, Default)]
pub struct RawSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub open: Option<Vec<f64>>,
    pub high: Option<Vec<f64>>,
    pub low: Option<Vec<f64>>,
    pub close: Option<Vec<f64>>,
    pub volume: Option<Vec<f64>>,
}

/// Validated price series, non-decreasing by timestamp. Read-only after
/// construction; the only way to build one is [`validate`].
#[derive(Debug, Clone)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Extract the close-price column.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }
}

/// Validate a raw table into a `PriceSeries`.
///
/// Fails with `EmptySeries` when no rows were supplied and with
/// `MissingField` when a required column is absent or shorter than the
/// timestamp column. Rows are stable-sorted by timestamp; duplicate
/// timestamps are kept in their incoming order. No other normalization is
/// performed — NaN values pass through.
pub fn validate(raw: RawSeries) -> Result<PriceSeries, Report<SeriesError>> {
    if raw.timestamps.is_empty() {
        return Err(Report::new(SeriesError::EmptySeries));
    }

    let n = raw.timestamps.len();
    let open = take_column(raw.open, "open", n)?;
    let high = take_column(raw.high, "high", n)?;
    let low = take_column(raw.low, "low", n)?;
    let close = take_column(raw.close, "close", n)?;
    let volume = take_column(raw.volume, "volume", n)?;

    let mut points: Vec<PricePoint> = raw
        .timestamps
        .into_iter()
        .enumerate()
        .map(|(i, timestamp)| PricePoint {
            timestamp,
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
            volume: volume[i],
        })
        .collect();

    points.sort_by_key(|p| p.timestamp);

    Ok(PriceSeries { points })
}

fn take_column(
    column: Option<Vec<f64>>,
    field: &'static str,
    expected_len: usize,
) -> Result<Vec<f64>, Report<SeriesError>> {
    match column {
        Some(values) if values.len() == expected_len => Ok(values),
        Some(values) => Err(Report::new(SeriesError::MissingField { field }).attach(format!(
            "column has {} values, expected {expected_len}",
            values.len()
        ))),
        None => Err(Report::new(SeriesError::MissingField { field })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap()
    }

    fn raw_from_closes(closes: &[f64]) -> RawSeries {
        let n = closes.len();
        RawSeries {
            timestamps: (0..n as u32).map(ts).collect(),
            open: Some(closes.to_vec()),
            high: Some(closes.to_vec()),
            low: Some(closes.to_vec()),
            close: Some(closes.to_vec()),
            volume: Some(vec![1.0; n]),
        }
    }

    #[test]
    fn empty_series_rejected() {
        let result = validate(RawSeries::default());
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err().current_context(),
            SeriesError::EmptySeries
        ));
    }

    #[test]
    fn missing_column_rejected() {
        let mut raw = raw_from_closes(&[1.0, 2.0]);
        raw.close = None;
        let result = validate(raw);
        assert!(matches!(
            result.unwrap_err().current_context(),
            SeriesError::MissingField { field: "close" }
        ));
    }

    #[test]
    fn short_column_rejected() {
        let mut raw = raw_from_closes(&[1.0, 2.0, 3.0]);
        raw.volume = Some(vec![1.0]);
        let result = validate(raw);
        assert!(matches!(
            result.unwrap_err().current_context(),
            SeriesError::MissingField { field: "volume" }
        ));
    }

    #[test]
    fn rows_sorted_by_timestamp() {
        let mut raw = raw_from_closes(&[3.0, 1.0, 2.0]);
        raw.timestamps = vec![ts(2), ts(0), ts(1)];
        let series = validate(raw).unwrap();
        let closes = series.closes();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn duplicate_timestamps_kept_in_order() {
        let mut raw = raw_from_closes(&[1.0, 2.0, 3.0]);
        raw.timestamps = vec![ts(0), ts(1), ts(1)];
        let series = validate(raw).unwrap();
        assert_eq!(series.len(), 3);
        // Stable sort keeps the two ts(1) rows in incoming order.
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn nan_values_pass_through() {
        let mut raw = raw_from_closes(&[1.0, 2.0, 3.0]);
        raw.close = Some(vec![1.0, f64::NAN, 3.0]);
        let series = validate(raw).unwrap();
        assert!(series.closes()[1].is_nan());
    }
}
