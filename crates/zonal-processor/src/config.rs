//! Calibrated thresholds for grazing correction and partial-grazing detection.
//!
//! These values are empirical, tuned against paddock observations; they are
//! exposed so a deployment can recalibrate without a rebuild.

use serde::{Deserialize, Serialize};

/// Threshold for applying the grazing correction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GrazingConfig {
    /// Minimum percent of the field at or below its median for the
    /// ungrazed-only mean to be reported. Compared with `>=`.
    pub min_percent_grazed: f64,
}

impl Default for GrazingConfig {
    fn default() -> Self {
        Self {
            min_percent_grazed: 15.0,
        }
    }
}

impl GrazingConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.min_percent_grazed) {
            return Err("grazing.min_percent_grazed must be within 0-100".to_string());
        }
        Ok(())
    }
}

/// Thresholds of the partial-grazing classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PartialGrazingConfig {
    /// `p90 - p10` must exceed this.
    pub min_spread: f64,
    /// `p90` must exceed this.
    pub min_p90: f64,
    /// `p10` must be below this.
    pub max_p10: f64,
    /// Flags are only surfaced for fields larger than this many hectares.
    pub min_area_ha: f64,
}

impl Default for PartialGrazingConfig {
    fn default() -> Self {
        Self {
            min_spread: 0.16,
            min_p90: 0.78,
            max_p10: 0.72,
            min_area_ha: 3.0,
        }
    }
}

impl PartialGrazingConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=2.0).contains(&self.min_spread) {
            return Err("partial.min_spread must be within 0-2".to_string());
        }

        for (name, value) in [("partial.min_p90", self.min_p90), ("partial.max_p10", self.max_p10)] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(format!("{} must be within -1 to 1", name));
            }
        }

        if self.min_area_ha < 0.0 || !self.min_area_ha.is_finite() {
            return Err("partial.min_area_ha must be >= 0".to_string());
        }

        Ok(())
    }
}
