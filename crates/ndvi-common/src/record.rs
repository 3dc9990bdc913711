//! The per-(field, image) output record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::time::TIMESTAMP_FORMAT;

/// One analysis result for a field on one image.
///
/// `None` statistics mean the field had no valid pixels in the image or the
/// correction was numerically degenerate; they are never replaced by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub field_id: String,
    pub field_name: String,
    pub image_id: String,
    pub date: NaiveDate,
    pub captured_at: DateTime<Utc>,
    pub cloud_pct: f64,
    pub pixel_count: usize,
    pub ndvi_mean: Option<f64>,
    pub effective_ndvi: Option<f64>,
    pub percent_grazed: Option<f64>,
    /// p90 - p10 of the field's index values.
    pub spread: Option<f64>,
    pub is_partial: bool,
}

impl AnalysisRecord {
    /// Natural key used by the persistence layer for deduplication.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            field_name: self.field_name.clone(),
            date: self.date,
        }
    }

    /// Capture time of the source image as `YYYY-MM-DD HH:MM` UTC.
    pub fn last_update(&self) -> String {
        self.captured_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// True when the field had at least one valid pixel.
    pub fn has_coverage(&self) -> bool {
        self.ndvi_mean.is_some()
    }
}

/// `(paddock_name, date)` natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub field_name: String,
    pub date: NaiveDate,
}
