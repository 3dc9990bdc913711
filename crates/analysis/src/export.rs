//! CSV export of analysis records.
//!
//! Numbers are rounded to four decimals; missing values are empty cells.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use ndvi_common::{AnalysisRecord, RecordKey, DATE_FORMAT};
use tracing::info;

use crate::error::Result;

/// Columns of the record CSV, in order.
pub const RECORD_COLUMNS: [&str; 7] = [
    "paddock_name",
    "date",
    "ndvi_mean",
    "effective_ndvi",
    "percent_grazed",
    "cloud_pct",
    "is_partial",
];

/// Columns of the partial-detections CSV.
pub const PARTIAL_COLUMNS: [&str; 2] = ["paddock_name", "date"];

/// Decimal places kept in exported numbers.
pub const DECIMALS: i32 = 4;

/// Round to [`DECIMALS`] places. Non-finite input is treated as missing.
pub fn round_value(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let factor = 10f64.powi(DECIMALS);
    let rounded = (value * factor).round() / factor;
    // Avoid "-0" in output.
    Some(if rounded == 0.0 { 0.0 } else { rounded })
}

/// Cell text for an optional number.
pub fn format_value(value: Option<f64>) -> String {
    value
        .and_then(round_value)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// Write records with a header row.
pub fn write_records<W: Write>(writer: W, records: &[AnalysisRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(RECORD_COLUMNS)?;

    for record in records {
        csv.write_record([
            record.field_name.clone(),
            record.date.format(DATE_FORMAT).to_string(),
            format_value(record.ndvi_mean),
            format_value(record.effective_ndvi),
            format_value(record.percent_grazed),
            format_value(Some(record.cloud_pct)),
            record.is_partial.to_string(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Write partial-grazing detections with a header row.
pub fn write_partial<W: Write>(writer: W, keys: &[RecordKey]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(PARTIAL_COLUMNS)?;

    for key in keys {
        csv.write_record([key.field_name.clone(), key.date.format(DATE_FORMAT).to_string()])?;
    }

    csv.flush()?;
    Ok(())
}

/// Write the record CSV to `path`, replacing any existing file.
pub fn write_records_file(path: impl AsRef<Path>, records: &[AnalysisRecord]) -> Result<()> {
    let path = path.as_ref();
    write_records(File::create(path)?, records)?;
    info!(path = %path.display(), records = records.len(), "Wrote analysis records");
    Ok(())
}

/// Write the partial-detections CSV to `path`, replacing any existing file.
pub fn write_partial_file(path: impl AsRef<Path>, keys: &[RecordKey]) -> Result<()> {
    let path = path.as_ref();
    write_partial(File::create(path)?, keys)?;
    info!(path = %path.display(), detections = keys.len(), "Wrote partial grazing detections");
    Ok(())
}
