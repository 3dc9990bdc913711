//! Run configuration.
//!
//! Loaded from YAML, then overridden by `NDVI_*` environment variables.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use imagery::RetryPolicy;
use serde::{Deserialize, Serialize};
use tracing::warn;
use zonal_processor::{GrazingConfig, PartialGrazingConfig, DEFAULT_NIR_BAND, DEFAULT_RED_BAND};

use crate::error::{AnalysisError, Result};

/// Configuration for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Length of the image search window in days.
    pub date_window_days: u32,

    /// Maximum scene cloud cover in percent (inclusive).
    pub max_cloud_pct: f64,

    /// Ground sample distance in meters.
    pub scale: f64,

    /// Number of newest images to analyze.
    pub history_count: usize,

    /// Near-infrared band name.
    pub nir_band: String,

    /// Red band name.
    pub red_band: String,

    pub grazing: GrazingConfig,

    pub partial: PartialGrazingConfig,

    /// Size of the field worker pool; 0 uses one thread per core.
    pub worker_threads: usize,

    pub retry: RetryConfig,

    /// Last day of the search window; today when unset.
    pub end_date: Option<NaiveDate>,

    /// Restrict the run to these fields.
    pub field_names: Option<Vec<String>>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            date_window_days: 45,
            max_cloud_pct: 50.0,
            scale: 10.0,
            history_count: 1,
            nir_band: DEFAULT_NIR_BAND.to_string(),
            red_band: DEFAULT_RED_BAND.to_string(),
            grazing: GrazingConfig::default(),
            partial: PartialGrazingConfig::default(),
            worker_threads: 0,
            retry: RetryConfig::default(),
            end_date: None,
            field_names: None,
        }
    }
}

/// Catalog retry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a YAML file. Missing keys take defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| AnalysisError::config(e.to_string()))
    }

    /// Apply `NDVI_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparsable values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_with(&lookup, "NDVI_DATE_WINDOW_DAYS", &mut self.date_window_days);
        override_with(&lookup, "NDVI_MAX_CLOUD_PCT", &mut self.max_cloud_pct);
        override_with(&lookup, "NDVI_SCALE", &mut self.scale);
        override_with(&lookup, "NDVI_HISTORY_COUNT", &mut self.history_count);
        override_with(&lookup, "NDVI_WORKER_THREADS", &mut self.worker_threads);
        override_with(
            &lookup,
            "NDVI_GRAZING_THRESHOLD_PCT",
            &mut self.grazing.min_percent_grazed,
        );
        override_with(&lookup, "NDVI_PARTIAL_MIN_SPREAD", &mut self.partial.min_spread);
        override_with(&lookup, "NDVI_PARTIAL_MIN_P90", &mut self.partial.min_p90);
        override_with(&lookup, "NDVI_PARTIAL_MAX_P10", &mut self.partial.max_p10);
        override_with(&lookup, "NDVI_PARTIAL_MIN_AREA_HA", &mut self.partial.min_area_ha);
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.date_window_days == 0 {
            return Err(AnalysisError::config("date_window_days must be > 0"));
        }

        if !(0.0..=100.0).contains(&self.max_cloud_pct) {
            return Err(AnalysisError::config("max_cloud_pct must be within 0-100"));
        }

        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(AnalysisError::config("scale must be > 0"));
        }

        if self.history_count == 0 {
            return Err(AnalysisError::config("history_count must be >= 1"));
        }

        if self.nir_band.is_empty() || self.red_band.is_empty() {
            return Err(AnalysisError::config("band names must not be empty"));
        }

        if self.retry.max_attempts == 0 {
            return Err(AnalysisError::config("retry.max_attempts must be >= 1"));
        }

        if matches!(&self.field_names, Some(names) if names.is_empty()) {
            return Err(AnalysisError::config("field_names must not be an empty list"));
        }

        self.grazing.validate().map_err(AnalysisError::Config)?;
        self.partial.validate().map_err(AnalysisError::Config)?;

        Ok(())
    }
}

fn override_with<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => warn!(key, value = %raw, "Ignoring unparsable environment override"),
        }
    }
}
