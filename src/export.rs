use std::path::Path;

use error_stack::{Report, ResultExt};
use tracing::info;

use crate::error::ExportError;
use crate::session::AnalysisSession;

/// Serialize the validated series and every computed indicator into one CSV
/// row per original index, preserving index order. Indicator columns appear
/// in map insertion order; NaN is written as an empty cell.
pub fn write_csv(path: &Path, session: &AnalysisSession) -> Result<(), Report<ExportError>> {
    let mut writer = csv::Writer::from_path(path)
        .change_context(ExportError::Create)
        .attach_with(|| format!("path: {}", path.display()))?;

    let has_trend = !session.trend().is_empty();

    let mut header: Vec<String> = ["timestamp", "open", "high", "low", "close", "volume"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for (name, _) in session.indicators().iter() {
        header.push(name.to_owned());
    }
    if has_trend {
        header.push("Trend".into());
    }
    writer
        .write_record(&header)
        .change_context(ExportError::Write)?;

    for (i, point) in session.series().points().iter().enumerate() {
        let mut record: Vec<String> = vec![
            point.timestamp.to_rfc3339(),
            format_cell(point.open),
            format_cell(point.high),
            format_cell(point.low),
            format_cell(point.close),
            format_cell(point.volume),
        ];
        for (_, values) in session.indicators().iter() {
            record.push(values.get(i).copied().map(format_cell).unwrap_or_default());
        }
        if has_trend {
            record.push(
                session
                    .trend()
                    .get(i)
                    .map(|label| label.as_str().to_owned())
                    .unwrap_or_default(),
            );
        }
        writer
            .write_record(&record)
            .change_context(ExportError::Write)?;
    }

    writer.flush().change_context(ExportError::Write)?;

    info!(
        path = %path.display(),
        rows = session.series().len(),
        "analysis exported"
    );

    Ok(())
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}
