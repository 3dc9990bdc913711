//! Full runs against an in-memory catalog.
//!
//! Fixture scene: 40 x 30 pixels at 10 m on the UTM 55S fixture grid.
//!
//! - `Strip` (4 ha): western half grazed to 0.5, eastern half at 0.85
//! - `Small` (1.96 ha): same pattern, below the area gate
//! - `Even` (2.52 ha): uniform 0.6
//! - `Away`: outside the scene

use std::sync::Arc;
use std::time::Duration as StdDuration;

use analysis::{write_records, AnalysisConfig, AnalysisError, Orchestrator, RunStatus};
use chrono::{DateTime, Duration, Utc};
use imagery::{MemoryCatalog, RetryPolicy, RetryingCatalog};
use ndvi_common::{Crs, FieldStore, RasterImage, RecordKey};
use test_utils::{fixture_capture_time, image_from_ndvi, pixel_aligned_field, square_field};
use zonal_processor::ZonalError;

const WIDTH: usize = 40;
const HEIGHT: usize = 30;

fn scene_ndvi() -> Vec<f32> {
    let mut ndvi = Vec::with_capacity(WIDTH * HEIGHT);
    for row in 0..HEIGHT {
        for col in 0..WIDTH {
            let v = match (col, row) {
                (c, r) if c < 10 && r < 20 => 0.5,
                (c, r) if c < 20 && r < 20 => 0.85,
                (c, r) if (22..29).contains(&c) && r < 14 => 0.5,
                (c, r) if (29..36).contains(&c) && r < 14 => 0.85,
                _ => 0.6,
            };
            ndvi.push(v);
        }
    }
    ndvi
}

fn scene(id: &str, captured_at: DateTime<Utc>, cloud_pct: f64) -> RasterImage {
    image_from_ndvi(id, captured_at, cloud_pct, &scene_ndvi(), WIDTH, HEIGHT)
}

fn fields() -> FieldStore {
    FieldStore::new(vec![
        pixel_aligned_field("Strip", 0, 0, 20, 20),
        pixel_aligned_field("Small", 22, 0, 14, 14),
        pixel_aligned_field("Even", 22, 16, 18, 14),
        square_field("Away", 520_000.0, 4_980_000.0, 300.0),
    ])
    .unwrap()
}

fn now() -> DateTime<Utc> {
    fixture_capture_time() + Duration::days(1)
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: StdDuration::from_millis(1),
        max_delay: StdDuration::from_millis(2),
    }
}

#[tokio::test]
async fn test_single_image_run() {
    let catalog = MemoryCatalog::new(vec![
        scene("S2A_NEWEST", fixture_capture_time(), 8.0),
        scene("S2B_OLDER", fixture_capture_time() - Duration::days(5), 2.0),
    ]);
    let orchestrator = Orchestrator::new(catalog, AnalysisConfig::default()).unwrap();

    let outcome = orchestrator.run_at(&fields(), now()).await.unwrap();
    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.images, vec!["S2A_NEWEST".to_string()]);
    assert_eq!(outcome.records.len(), 4);

    let names: Vec<&str> = outcome.records.iter().map(|r| r.field_name.as_str()).collect();
    assert_eq!(names, vec!["Away", "Even", "Small", "Strip"]);

    let by_name = |name: &str| outcome.records.iter().find(|r| r.field_name == name).unwrap();

    let strip = by_name("Strip");
    assert_eq!(strip.pixel_count, 400);
    assert_eq!(strip.image_id, "S2A_NEWEST");
    assert_eq!(strip.date, fixture_capture_time().date_naive());
    assert!((strip.percent_grazed.unwrap() - 50.0).abs() < 1e-6);
    assert!((strip.effective_ndvi.unwrap() - 0.85).abs() < 1e-5);
    assert!(strip.is_partial);

    let small = by_name("Small");
    assert!(small.spread.unwrap() > 0.16);
    assert!(!small.is_partial, "area gate must suppress the flag");

    let even = by_name("Even");
    assert!((even.ndvi_mean.unwrap() - 0.6).abs() < 1e-5);
    assert!(!even.is_partial);
    // Uniform field: everything sits at the median, no ungrazed pixels remain.
    assert_eq!(even.effective_ndvi, None);

    let away = by_name("Away");
    assert_eq!(away.pixel_count, 0);
    assert!(away.ndvi_mean.is_none() && away.effective_ndvi.is_none() && away.percent_grazed.is_none());
    assert!(!away.is_partial);

    assert_eq!(
        outcome.partial,
        vec![RecordKey {
            field_name: "Strip".to_string(),
            date: fixture_capture_time().date_naive(),
        }]
    );
}

#[tokio::test]
async fn test_runs_are_repeatable() {
    let catalog = Arc::new(MemoryCatalog::new(vec![scene("S2A", fixture_capture_time(), 8.0)]));
    let orchestrator = Orchestrator::new(Arc::clone(&catalog), AnalysisConfig::default()).unwrap();

    let first = orchestrator.run_at(&fields(), now()).await.unwrap();
    let second = orchestrator.run_at(&fields(), now()).await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.records, second.records);
    assert_eq!(catalog.query_calls(), 2);
    assert_eq!(catalog.load_calls(), 2);
}

#[tokio::test]
async fn test_no_eligible_imagery() {
    let catalog = MemoryCatalog::new(vec![scene("CLOUDY", fixture_capture_time(), 95.0)]);
    let orchestrator = Orchestrator::new(catalog, AnalysisConfig::default()).unwrap();

    let outcome = orchestrator.run_at(&fields(), now()).await.unwrap();
    assert_eq!(outcome.status, RunStatus::NoEligibleImagery);
    assert!(!outcome.has_imagery());
    assert!(outcome.records.is_empty() && outcome.partial.is_empty());
    assert_eq!(orchestrator.catalog().load_calls(), 0);
}

#[tokio::test]
async fn test_window_excludes_old_images() {
    let catalog = MemoryCatalog::new(vec![scene("OLD", fixture_capture_time() - Duration::days(30), 1.0)]);
    let config = AnalysisConfig {
        date_window_days: 14,
        ..AnalysisConfig::default()
    };
    let orchestrator = Orchestrator::new(catalog, config).unwrap();

    let outcome = orchestrator.run_at(&fields(), now()).await.unwrap();
    assert_eq!(outcome.status, RunStatus::NoEligibleImagery);
}

#[tokio::test]
async fn test_fixed_end_date_reproduces_past_run() {
    let past = fixture_capture_time() - Duration::days(60);
    let catalog = MemoryCatalog::new(vec![
        scene("CURRENT", fixture_capture_time(), 1.0),
        scene("PAST", past, 1.0),
    ]);
    let config = AnalysisConfig {
        date_window_days: 10,
        end_date: Some(past.date_naive()),
        ..AnalysisConfig::default()
    };
    let orchestrator = Orchestrator::new(catalog, config).unwrap();

    let outcome = orchestrator.run_at(&fields(), now()).await.unwrap();
    assert_eq!(outcome.images, vec!["PAST".to_string()]);
}

#[tokio::test]
async fn test_history_mode_emits_record_per_image() {
    let t = fixture_capture_time();
    let catalog = MemoryCatalog::new(vec![
        scene("A", t, 5.0),
        scene("B", t - Duration::days(5), 5.0),
        scene("C", t - Duration::days(10), 5.0),
    ]);
    let config = AnalysisConfig {
        history_count: 2,
        ..AnalysisConfig::default()
    };
    let orchestrator = Orchestrator::new(catalog, config).unwrap();

    let outcome = orchestrator.run_at(&fields(), now()).await.unwrap();
    assert_eq!(outcome.images, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(outcome.records.len(), 8);

    let strip: Vec<&str> = outcome
        .records
        .iter()
        .filter(|r| r.field_name == "Strip")
        .map(|r| r.image_id.as_str())
        .collect();
    assert_eq!(strip, vec!["B", "A"]);
    assert_eq!(outcome.partial.len(), 2);
}

#[tokio::test]
async fn test_same_day_images_keep_one_record_per_key() {
    let t = fixture_capture_time();
    let catalog = MemoryCatalog::new(vec![
        scene("TILE_1", t, 20.0),
        scene("TILE_2", t + Duration::minutes(1), 5.0),
    ]);
    let config = AnalysisConfig {
        history_count: 2,
        ..AnalysisConfig::default()
    };
    let orchestrator = Orchestrator::new(catalog, config).unwrap();

    let outcome = orchestrator.run_at(&fields(), now()).await.unwrap();
    assert_eq!(outcome.records.len(), 4);
    assert!(outcome.records.iter().all(|r| r.image_id == "TILE_2"));
}

#[tokio::test]
async fn test_field_name_filter() {
    let catalog = MemoryCatalog::new(vec![scene("S2A", fixture_capture_time(), 8.0)]);
    let config = AnalysisConfig {
        field_names: Some(vec!["Strip".to_string(), "Nowhere".to_string()]),
        ..AnalysisConfig::default()
    };
    let orchestrator = Orchestrator::new(catalog, config).unwrap();

    let outcome = orchestrator.run_at(&fields(), now()).await.unwrap();
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.unknown_fields, vec!["Nowhere".to_string()]);

    let catalog = MemoryCatalog::new(vec![scene("S2A", fixture_capture_time(), 8.0)]);
    let config = AnalysisConfig {
        field_names: Some(vec!["Nowhere".to_string()]),
        ..AnalysisConfig::default()
    };
    let err = Orchestrator::new(catalog, config)
        .unwrap()
        .run_at(&fields(), now())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Config(_)));
}

#[tokio::test]
async fn test_image_without_bands_is_skipped() {
    let t = fixture_capture_time();
    let catalog = MemoryCatalog::new(vec![scene("GOOD", t - Duration::days(1), 5.0), scene("NEW", t, 5.0)]);
    let config = AnalysisConfig {
        history_count: 2,
        nir_band: "B8A".to_string(),
        ..AnalysisConfig::default()
    };
    let orchestrator = Orchestrator::new(catalog, config).unwrap();

    let outcome = orchestrator.run_at(&fields(), now()).await.unwrap();
    assert_eq!(outcome.status, RunStatus::NoEligibleImagery);
    assert_eq!(outcome.skipped_images.len(), 2);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let catalog = MemoryCatalog::new(vec![scene("S2A", fixture_capture_time(), 8.0)]).with_transient_failures(2);
    let orchestrator =
        Orchestrator::new(RetryingCatalog::new(catalog, fast_retry()), AnalysisConfig::default()).unwrap();

    let outcome = orchestrator.run_at(&fields(), now()).await.unwrap();
    assert_eq!(outcome.records.len(), 4);
}

#[tokio::test]
async fn test_unavailable_catalog_aborts_run() {
    let catalog = MemoryCatalog::new(vec![scene("S2A", fixture_capture_time(), 8.0)]).with_transient_failures(100);
    let orchestrator =
        Orchestrator::new(RetryingCatalog::new(catalog, fast_retry()), AnalysisConfig::default()).unwrap();

    let err = tokio_test::assert_err!(orchestrator.run_at(&fields(), now()).await);
    assert!(err.is_catalog_unavailable());
}

#[tokio::test]
async fn test_image_in_degrees_is_rejected() {
    let mut image = scene("S2A_4326", fixture_capture_time(), 8.0);
    image.descriptor.crs = Crs::Wgs84;
    let catalog = MemoryCatalog::new(vec![image]);
    let orchestrator = Orchestrator::new(catalog, AnalysisConfig::default()).unwrap();

    let err = orchestrator.run_at(&fields(), now()).await.unwrap_err();
    match err {
        AnalysisError::Zonal(ZonalError::GeographicRaster { image, crs }) => {
            assert_eq!(image, "S2A_4326");
            assert_eq!(crs, "EPSG:4326");
        }
        other => panic!("expected GeographicRaster, got {:?}", other),
    }
    assert_eq!(orchestrator.catalog().load_calls(), 0);
}

#[tokio::test]
async fn test_exported_rows_match_records() {
    let catalog = MemoryCatalog::new(vec![scene("S2A", fixture_capture_time(), 8.0)]);
    let orchestrator = Orchestrator::new(catalog, AnalysisConfig::default()).unwrap();
    let outcome = orchestrator.run_at(&fields(), now()).await.unwrap();

    let mut out = Vec::new();
    write_records(&mut out, &outcome.records).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(text.lines().count(), 1 + outcome.records.len());
    assert!(text.lines().any(|l| l.starts_with("Away,2026-02-01,,,,8,false")));
    assert!(text.lines().any(|l| l.starts_with("Strip,2026-02-01,") && l.ends_with(",true")));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = AnalysisConfig {
        scale: -1.0,
        ..AnalysisConfig::default()
    };
    assert!(Orchestrator::new(MemoryCatalog::default(), config).is_err());
}
