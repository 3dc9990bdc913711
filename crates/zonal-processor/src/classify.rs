//! Partial-grazing classification from the field's percentile spread.

use crate::config::PartialGrazingConfig;
use crate::types::{PartialFlag, ZonalStats};

/// Flag a field whose index distribution is both wide and bimodal-looking:
/// a high top decile alongside a low bottom decile.
///
/// Missing percentiles always classify as not partial. The area gate is
/// recorded on the flag but not applied; see [`PartialFlag::passes_area_gate`].
pub fn classify(stats: &ZonalStats, area_ha: f64, config: &PartialGrazingConfig) -> PartialFlag {
    let spread = match (stats.p10, stats.p90) {
        (Some(p10), Some(p90)) => Some(p90 - p10),
        _ => None,
    };

    let is_partial = match (stats.p10, stats.p90, spread) {
        (Some(p10), Some(p90), Some(spread)) => {
            spread > config.min_spread && p90 > config.min_p90 && p10 < config.max_p10
        }
        _ => false,
    };

    PartialFlag {
        is_partial,
        spread,
        area_ha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(p10: Option<f64>, p90: Option<f64>) -> ZonalStats {
        ZonalStats {
            count: if p10.is_some() { 100 } else { 0 },
            mean: None,
            median: None,
            p10,
            p90,
            total_area: 50_000.0,
            per_pixel_area: 100.0,
        }
    }

    #[test]
    fn test_all_conditions_hold() {
        let flag = classify(&stats(Some(0.55), Some(0.85)), 5.0, &PartialGrazingConfig::default());
        assert!(flag.is_partial);
        assert!((flag.spread.unwrap() - 0.30).abs() < 1e-12);
        assert!(flag.passes_area_gate(3.0));
    }

    #[test]
    fn test_narrow_spread_is_not_partial() {
        let flag = classify(&stats(Some(0.70), Some(0.80)), 5.0, &PartialGrazingConfig::default());
        assert!(!flag.is_partial);
    }

    #[test]
    fn test_each_condition_is_required() {
        let config = PartialGrazingConfig::default();
        // p90 not above 0.78
        assert!(!classify(&stats(Some(0.40), Some(0.78)), 5.0, &config).is_partial);
        // p10 not below 0.72
        assert!(!classify(&stats(Some(0.72), Some(0.95)), 5.0, &config).is_partial);
    }

    #[test]
    fn test_missing_percentiles() {
        let flag = classify(&stats(None, None), 5.0, &PartialGrazingConfig::default());
        assert!(!flag.is_partial);
        assert_eq!(flag.spread, None);
    }

    #[test]
    fn test_small_field_flag_is_not_surfaced() {
        let flag = classify(&stats(Some(0.5), Some(0.9)), 2.5, &PartialGrazingConfig::default());
        assert!(flag.is_partial);
        assert!(!flag.passes_area_gate(3.0));
    }

    #[test]
    fn test_custom_thresholds() {
        let config = PartialGrazingConfig {
            min_spread: 0.05,
            ..PartialGrazingConfig::default()
        };
        assert!(classify(&stats(Some(0.70), Some(0.80)), 5.0, &config).is_partial);
    }
}
