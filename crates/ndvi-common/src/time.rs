//! Date window handling for imagery queries.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Format used for every externalized record date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used for the capture timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A closed time window `[start, end]` for catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window covering the `days` days leading up to `end`.
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(days as i64),
            end,
        }
    }

    /// Window ending at the close of `end_date` (UTC).
    pub fn ending_on(end_date: NaiveDate, days: u32) -> Self {
        let end_of_day = end_date
            .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN));
        Self::trailing_days(Utc.from_utc_datetime(&end_of_day), days)
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    /// Length of the window in whole days.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Parse an ISO calendar date (`YYYY-MM-DD`).
pub fn parse_date(s: &str) -> Result<NaiveDate, TimeParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| TimeParseError::InvalidFormat(s.to_string()))
}

/// Date text that is not `YYYY-MM-DD`.
#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}
