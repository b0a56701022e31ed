use std::path::Path;

use error_stack::Report;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::full_palette::{GREY, ORANGE, PURPLE};
use tracing::info;

use crate::error::ChartError;
use crate::session::AnalysisSession;

const CHART_WIDTH: u32 = 1280;
const CHART_HEIGHT: u32 = 960;
// Panel split 3:1:1 — price, oscillator, MACD.
const PRICE_PANEL_HEIGHT: u32 = 576;
const RSI_PANEL_HEIGHT: u32 = 192;

/// Render the annotated series as a PNG with three stacked panels:
/// candlesticks with SMA overlays, RSI with 30/70 guides, and MACD with
/// signal line and histogram. Absent indicator keys are drawn as empty
/// series, not treated as an error.
pub fn render(
    path: &Path,
    session: &AnalysisSession,
    symbol: &str,
) -> Result<(), Report<ChartError>> {
    if session.series().is_empty() {
        return Err(Report::new(ChartError::Render).attach("empty series"));
    }

    let root = BitMapBackend::new(path, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let (price_area, rest) = root.split_vertically(PRICE_PANEL_HEIGHT);
    let (rsi_area, macd_area) = rest.split_vertically(RSI_PANEL_HEIGHT);

    draw_price_panel(&price_area, session, symbol)?;
    draw_rsi_panel(&rsi_area, session)?;
    draw_macd_panel(&macd_area, session)?;

    root.present().map_err(render_err)?;
    info!(path = %path.display(), "chart rendered");
    Ok(())
}

fn draw_price_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    session: &AnalysisSession,
    symbol: &str,
) -> Result<(), Report<ChartError>> {
    let points = session.series().points();
    let n = points.len();

    let lows = points.iter().map(|p| p.low);
    let highs = points.iter().map(|p| p.high);
    let (y_min, y_max) = value_bounds(lows.chain(highs));

    let mut chart = ChartBuilder::on(area)
        .caption(format!("{symbol} Price"), ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..n as f64 - 0.5, y_min..y_max)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|x| date_label(session, *x))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(
            points
                .iter()
                .enumerate()
                .filter(|(_, p)| {
                    p.open.is_finite()
                        && p.high.is_finite()
                        && p.low.is_finite()
                        && p.close.is_finite()
                })
                .map(|(i, p)| {
                    CandleStick::new(
                        i as f64,
                        p.open,
                        p.high,
                        p.low,
                        p.close,
                        GREEN.filled(),
                        RED.filled(),
                        2,
                    )
                }),
        )
        .map_err(render_err)?;

    // Overlay every stored SMA series, in insertion order.
    let overlay_colors = [BLUE, ORANGE, PURPLE];
    let sma_keys: Vec<&str> = session
        .indicators()
        .iter()
        .map(|(name, _)| name)
        .filter(|name| name.starts_with("SMA_"))
        .collect();
    for (idx, key) in sma_keys.iter().enumerate() {
        let color = overlay_colors[idx % overlay_colors.len()];
        let values = session.indicators().get(key).unwrap_or(&[]);
        chart
            .draw_series(LineSeries::new(finite_points(values), color))
            .map_err(render_err)?
            .label(key.to_string())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(render_err)?;

    Ok(())
}

fn draw_rsi_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    session: &AnalysisSession,
) -> Result<(), Report<ChartError>> {
    let n = session.series().len();
    let rsi = session.indicators().get("RSI").unwrap_or(&[]);

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(20)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..n as f64 - 0.5, 0.0..100.0)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .y_desc("RSI")
        .x_labels(0)
        .y_labels(5)
        .draw()
        .map_err(render_err)?;

    // Overbought/oversold guide lines.
    let x_max = n as f64 - 0.5;
    chart
        .draw_series(LineSeries::new(
            vec![(-0.5, 70.0), (x_max, 70.0)],
            RED.mix(0.5),
        ))
        .map_err(render_err)?;
    chart
        .draw_series(LineSeries::new(
            vec![(-0.5, 30.0), (x_max, 30.0)],
            GREEN.mix(0.5),
        ))
        .map_err(render_err)?;

    chart
        .draw_series(LineSeries::new(finite_points(rsi), PURPLE))
        .map_err(render_err)?
        .label("RSI")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], PURPLE));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(render_err)?;

    Ok(())
}

fn draw_macd_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    session: &AnalysisSession,
) -> Result<(), Report<ChartError>> {
    let n = session.series().len();
    let macd = session.indicators().get("MACD").unwrap_or(&[]);
    let signal = session.indicators().get("Signal").unwrap_or(&[]);
    let histogram = session.indicators().get("Histogram").unwrap_or(&[]);

    let values = macd
        .iter()
        .chain(signal)
        .chain(histogram)
        .copied()
        .chain(std::iter::once(0.0));
    let (y_min, y_max) = value_bounds(values);

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(20)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..n as f64 - 0.5, y_min..y_max)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .y_desc("MACD")
        .x_labels(0)
        .y_labels(5)
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(
            histogram
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, &v)| {
                    Rectangle::new(
                        [(i as f64 - 0.4, 0.0), (i as f64 + 0.4, v)],
                        GREY.mix(0.5).filled(),
                    )
                }),
        )
        .map_err(render_err)?
        .label("Histogram")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], GREY));

    chart
        .draw_series(LineSeries::new(finite_points(macd), BLUE))
        .map_err(render_err)?
        .label("MACD")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], BLUE));

    chart
        .draw_series(LineSeries::new(finite_points(signal), ORANGE))
        .map_err(render_err)?
        .label("Signal")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], ORANGE));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(render_err)?;

    Ok(())
}

fn date_label(session: &AnalysisSession, x: f64) -> String {
    let i = x.round();
    if i < 0.0 {
        return String::new();
    }
    session
        .series()
        .points()
        .get(i as usize)
        .map(|p| p.timestamp.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// (index, value) pairs for every finite value in the series.
fn finite_points(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| (i as f64, v))
        .collect()
}

/// Min/max over the finite values, padded by 5%, with a fallback range when
/// nothing is finite or the data is flat.
fn value_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min > max {
        return (0.0, 1.0);
    }
    if min == max {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

fn render_err<E: std::fmt::Display>(error: E) -> Report<ChartError> {
    Report::new(ChartError::Render).attach(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{RawSeries, validate};
    use crate::session::{AnalysisParams, AnalysisSession};
    use chrono::{TimeZone, Utc};

    fn session_from_closes(closes: &[f64]) -> AnalysisSession {
        let n = closes.len();
        let raw = RawSeries {
            timestamps: (0..n)
                .map(|i| {
                    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                        + chrono::Duration::days(i as i64)
                })
                .collect(),
            open: Some(closes.to_vec()),
            high: Some(closes.iter().map(|c| c + 1.0).collect()),
            low: Some(closes.iter().map(|c| c - 1.0).collect()),
            close: Some(closes.to_vec()),
            volume: Some(vec![1.0; n]),
        };
        AnalysisSession::analyze(validate(raw).unwrap(), &AnalysisParams::default()).unwrap()
    }

    #[test]
    fn bounds_pad_and_handle_degenerate_input() {
        let (min, max) = value_bounds([10.0, 20.0].into_iter());
        assert!(min < 10.0 && max > 20.0);
        assert_eq!(value_bounds([5.0, 5.0].into_iter()), (4.0, 6.0));
        assert_eq!(value_bounds([f64::NAN].into_iter()), (0.0, 1.0));
    }

    #[test]
    fn finite_points_skip_nan() {
        let points = finite_points(&[1.0, f64::NAN, 3.0]);
        assert_eq!(points, vec![(0.0, 1.0), (2.0, 3.0)]);
    }

    #[test]
    fn single_point_series_renders() {
        let session = AnalysisSession::new(
            validate(RawSeries {
                timestamps: vec![Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()],
                open: Some(vec![1.0]),
                high: Some(vec![1.0]),
                low: Some(vec![1.0]),
                close: Some(vec![1.0]),
                volume: Some(vec![1.0]),
            })
            .unwrap(),
        );
        let path = std::env::temp_dir().join(format!("mta-chart-{}-one.png", std::process::id()));
        let result = render(&path, &session, "TEST");
        let _ = std::fs::remove_file(&path);
        // Depending on the font environment this may fail to rasterize text,
        // so only the error taxonomy is asserted on failure.
        if let Err(report) = result {
            assert!(matches!(report.current_context(), ChartError::Render));
        }
    }

    /// Integration test: requires a system font for captions.
    /// Run with `cargo test -- --ignored`
    #[test]
    #[ignore]
    fn integration_render_png() {
        let closes: Vec<f64> = (1..=60).map(|x| x as f64).collect();
        let session = session_from_closes(&closes);
        let path = std::env::temp_dir().join(format!("mta-chart-{}.png", std::process::id()));
        render(&path, &session, "TEST").unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }
}
