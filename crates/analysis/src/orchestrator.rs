//! Run orchestration: one catalog query, then per image a single index
//! raster fanned out over every field on a worker pool.
//!
//! ```text
//! FieldStore ──► lon/lat extent ──► ImageSelector ──► [images, newest first]
//!                                                        │
//!                                      for each image:   ▼
//!                               load_bands ──► compute_index (once)
//!                                                        │
//!                               reproject fields ──► rayon pool: per field
//!                                                        │   sample → stats → grazing → flag
//!                                                        ▼
//!                                              AnalysisRecord per field
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use imagery::{CatalogError, RasterCatalog};
use metrics::{counter, histogram};
use ndvi_common::{
    AnalysisRecord, BoundingBox, Crs, DateWindow, FieldError, FieldPolygon, FieldStore,
    ImageDescriptor, RasterImage, RecordKey,
};
use rayon::prelude::*;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use zonal_processor::{classify, compute_index, correct_values, sample_zone, IndexRaster, ZonalError};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::selector::{ImageSelector, Selection};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Records were produced for the selected images.
    Completed,
    /// No image matched; downstream stores must not be touched.
    NoEligibleImagery,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::NoEligibleImagery => "no_eligible_imagery",
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub window: DateWindow,
    /// Ids of the images analyzed, newest first.
    pub images: Vec<String>,
    /// Selected images skipped because their bands were not available.
    pub skipped_images: Vec<String>,
    /// Requested field names that were not in the boundary set.
    pub unknown_fields: Vec<String>,
    /// One record per (field, date), sorted by field name then date.
    pub records: Vec<AnalysisRecord>,
    /// Keys of records flagged as partially grazed, same order.
    pub partial: Vec<RecordKey>,
}

impl RunOutcome {
    pub fn has_imagery(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Records whose field had at least one valid pixel.
    pub fn covered(&self) -> impl Iterator<Item = &AnalysisRecord> {
        self.records.iter().filter(|r| r.has_coverage())
    }
}

/// Runs the analysis pipeline against one catalog.
pub struct Orchestrator<C> {
    catalog: C,
    config: Arc<AnalysisConfig>,
    pool: Arc<rayon::ThreadPool>,
}

impl<C: RasterCatalog> Orchestrator<C> {
    /// Validate `config` and build the field worker pool.
    pub fn new(catalog: C, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("ndvi-worker-{}", i));
        if config.worker_threads > 0 {
            builder = builder.num_threads(config.worker_threads);
        }
        let pool = builder
            .build()
            .map_err(|e| AnalysisError::config(format!("cannot build worker pool: {}", e)))?;

        Ok(Self {
            catalog,
            config: Arc::new(config),
            pool: Arc::new(pool),
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Run against the current time.
    pub async fn run(&self, fields: &FieldStore) -> Result<RunOutcome> {
        self.run_at(fields, Utc::now()).await
    }

    /// Run with `now` as the window end, unless `end_date` is configured.
    #[instrument(skip(self, fields), fields(field_count = fields.len()))]
    pub async fn run_at(&self, fields: &FieldStore, now: DateTime<Utc>) -> Result<RunOutcome> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let config = &self.config;

        let (fields, unknown_fields) = self.filter_fields(fields)?;
        let window = match config.end_date {
            Some(end) => DateWindow::ending_on(end, config.date_window_days),
            None => DateWindow::trailing_days(now, config.date_window_days),
        };
        let extent = geographic_extent(&fields)?;

        info!(
            run_id = %run_id,
            fields = fields.len(),
            start = %window.start,
            end = %window.end,
            max_cloud_pct = config.max_cloud_pct,
            history_count = config.history_count,
            "Starting analysis run"
        );

        let selection = ImageSelector::new(&self.catalog)
            .select(extent, window, config.max_cloud_pct, config.history_count)
            .await?;

        let images = match selection {
            Selection::Images(images) => images,
            Selection::NoEligibleImagery { window } => {
                counter!("ndvi_runs_total", "status" => RunStatus::NoEligibleImagery.as_str()).increment(1);
                return Ok(RunOutcome {
                    run_id,
                    status: RunStatus::NoEligibleImagery,
                    window,
                    images: Vec::new(),
                    skipped_images: Vec::new(),
                    unknown_fields,
                    records: Vec::new(),
                    partial: Vec::new(),
                });
            }
        };

        // Sampling at `scale` only makes sense on a grid in meters.
        if let Some(image) = images.iter().find(|d| d.crs.is_geographic()) {
            error!(image = %image.id, crs = %image.crs, "Selected image is not in a projected CRS");
            return Err(ZonalError::GeographicRaster {
                image: image.id.clone(),
                crs: image.crs.to_string(),
            }
            .into());
        }

        let bands = [config.nir_band.as_str(), config.red_band.as_str()];
        let loaded = join_all(images.iter().map(|image| self.catalog.load_bands(image, &bands))).await;

        let mut projected: HashMap<Crs, Arc<Vec<FieldPolygon>>> = HashMap::new();
        let mut records = Vec::new();
        let mut analyzed = Vec::new();
        let mut skipped_images = Vec::new();

        for (descriptor, result) in images.iter().zip(loaded) {
            let image = match result {
                Ok(image) => image,
                Err(CatalogError::NotFound(what)) => {
                    warn!(image = %descriptor.id, missing = %what, "Skipping image without required bands");
                    skipped_images.push(descriptor.id.clone());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let targets = match projected.get(&descriptor.crs) {
                Some(targets) => Arc::clone(targets),
                None => {
                    let targets = Arc::new(reproject(&fields, descriptor.crs)?);
                    projected.insert(descriptor.crs, Arc::clone(&targets));
                    targets
                }
            };

            let image_records = self.analyze_image(image, targets).await?;
            analyzed.push(descriptor.id.clone());
            records.extend(image_records);
        }

        if analyzed.is_empty() {
            warn!(run_id = %run_id, skipped = skipped_images.len(), "No selected image had the required bands");
            counter!("ndvi_runs_total", "status" => RunStatus::NoEligibleImagery.as_str()).increment(1);
            return Ok(RunOutcome {
                run_id,
                status: RunStatus::NoEligibleImagery,
                window,
                images: analyzed,
                skipped_images,
                unknown_fields,
                records: Vec::new(),
                partial: Vec::new(),
            });
        }

        let records = dedupe_records(records);
        let partial: Vec<RecordKey> = records.iter().filter(|r| r.is_partial).map(|r| r.key()).collect();

        let elapsed = started.elapsed();
        counter!("ndvi_runs_total", "status" => RunStatus::Completed.as_str()).increment(1);
        counter!("ndvi_records_total").increment(records.len() as u64);
        counter!("ndvi_partial_detections_total").increment(partial.len() as u64);
        histogram!("ndvi_run_duration_seconds").record(elapsed.as_secs_f64());

        info!(
            run_id = %run_id,
            images = analyzed.len(),
            records = records.len(),
            covered = records.iter().filter(|r| r.has_coverage()).count(),
            partial = partial.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Analysis run complete"
        );

        Ok(RunOutcome {
            run_id,
            status: RunStatus::Completed,
            window,
            images: analyzed,
            skipped_images,
            unknown_fields,
            records,
            partial,
        })
    }

    fn filter_fields(&self, fields: &FieldStore) -> Result<(FieldStore, Vec<String>)> {
        let Some(names) = &self.config.field_names else {
            return Ok((fields.clone(), Vec::new()));
        };

        let (kept, missing) = fields.clone().retain_names(names).map_err(|e| match e {
            FieldError::EmptyFieldSet => {
                AnalysisError::config("none of the configured field_names are in the boundary set")
            }
            other => other.into(),
        })?;

        for name in &missing {
            warn!(field = %name, "Configured field not found in boundaries");
        }
        Ok((kept, missing))
    }

    /// Index the image once, then compute every field in parallel.
    async fn analyze_image(
        &self,
        image: RasterImage,
        fields: Arc<Vec<FieldPolygon>>,
    ) -> Result<Vec<AnalysisRecord>> {
        let config = Arc::clone(&self.config);
        let pool = Arc::clone(&self.pool);

        tokio::task::spawn_blocking(move || {
            let raster = compute_index(&image, &config.nir_band, &config.red_band)?;
            let descriptor = &image.descriptor;

            pool.install(|| {
                fields
                    .par_iter()
                    .map(|field| analyze_field(&raster, descriptor, field, &config))
                    .collect::<Result<Vec<_>>>()
            })
        })
        .await?
    }
}

/// Zonal statistics, grazing correction and partial flag for one field.
pub fn analyze_field(
    raster: &IndexRaster,
    image: &ImageDescriptor,
    field: &FieldPolygon,
    config: &AnalysisConfig,
) -> Result<AnalysisRecord> {
    let sample = sample_zone(raster, field, config.scale)?;
    let stats = sample.stats();
    let grazing = correct_values(sample.values(), &stats, &config.grazing);
    let flag = classify(&stats, field.area_ha, &config.partial);
    let is_partial = flag.passes_area_gate(config.partial.min_area_ha);

    if stats.is_empty() {
        debug!(field = %field.name, image = %image.id, "No valid pixels for field");
    } else if flag.is_partial && !is_partial {
        debug!(field = %field.name, area_ha = field.area_ha, "Partial grazing below area gate");
    }

    Ok(AnalysisRecord {
        field_id: field.id.clone(),
        field_name: field.name.clone(),
        image_id: image.id.clone(),
        date: image.captured_at.date_naive(),
        captured_at: image.captured_at,
        cloud_pct: image.cloud_pct,
        pixel_count: stats.count,
        ndvi_mean: stats.mean,
        effective_ndvi: grazing.effective_ndvi,
        percent_grazed: grazing.percent_grazed,
        spread: flag.spread,
        is_partial,
    })
}

/// Keep one record per `(field_name, date)`, sorted by key.
///
/// On a clash the record with coverage wins, then the lower cloud cover,
/// then the later capture.
pub fn dedupe_records(records: Vec<AnalysisRecord>) -> Vec<AnalysisRecord> {
    let mut best: HashMap<RecordKey, AnalysisRecord> = HashMap::new();

    for record in records {
        let key = record.key();
        let replace = best
            .get(&key)
            .map_or(true, |existing| preferred(&record, existing));
        if replace {
            best.insert(key, record);
        }
    }

    let mut records: Vec<AnalysisRecord> = best.into_values().collect();
    records.sort_by(|a, b| a.key().cmp(&b.key()));
    records
}

fn preferred(candidate: &AnalysisRecord, existing: &AnalysisRecord) -> bool {
    candidate
        .has_coverage()
        .cmp(&existing.has_coverage())
        .then_with(|| existing.cloud_pct.total_cmp(&candidate.cloud_pct))
        .then_with(|| candidate.captured_at.cmp(&existing.captured_at))
        .then_with(|| existing.image_id.cmp(&candidate.image_id))
        .is_gt()
}

/// Field extent in longitude/latitude for the catalog query.
fn geographic_extent(fields: &FieldStore) -> Result<BoundingBox> {
    if fields.crs().is_geographic() {
        return Ok(fields.extent());
    }

    fields
        .to_crs(Crs::Wgs84)?
        .iter()
        .filter_map(|f| f.bbox())
        .reduce(|a, b| a.union(&b))
        .ok_or_else(|| FieldError::EmptyFieldSet.into())
}

fn reproject(fields: &FieldStore, target: Crs) -> Result<Vec<FieldPolygon>> {
    if fields.crs() == target {
        return Ok(fields.fields().to_vec());
    }
    debug!(from = %fields.crs(), to = %target, "Reprojecting fields");
    Ok(fields.to_crs(target)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use test_utils::fixture_capture_time;

    fn record(name: &str, image: &str, days_ago: i64, cloud: f64, mean: Option<f64>) -> AnalysisRecord {
        let captured_at = fixture_capture_time() - Duration::days(days_ago);
        AnalysisRecord {
            field_id: name.to_string(),
            field_name: name.to_string(),
            image_id: image.to_string(),
            date: captured_at.date_naive(),
            captured_at,
            cloud_pct: cloud,
            pixel_count: if mean.is_some() { 10 } else { 0 },
            ndvi_mean: mean,
            effective_ndvi: mean,
            percent_grazed: mean.map(|_| 50.0),
            spread: None,
            is_partial: false,
        }
    }

    #[test]
    fn test_dedupe_prefers_coverage_then_cloud() {
        let records = vec![
            record("North", "a", 0, 5.0, None),
            record("North", "b", 0, 30.0, Some(0.6)),
            record("North", "c", 0, 10.0, Some(0.7)),
            record("Creek", "a", 0, 5.0, None),
            record("Creek", "d", 3, 5.0, Some(0.4)),
        ];

        let deduped = dedupe_records(records);
        let summary: Vec<(&str, &str)> = deduped
            .iter()
            .map(|r| (r.field_name.as_str(), r.image_id.as_str()))
            .collect();

        assert_eq!(summary, vec![("Creek", "d"), ("Creek", "a"), ("North", "c")]);
    }

    #[test]
    fn test_dedupe_sorts_by_name_then_date() {
        let deduped = dedupe_records(vec![
            record("B", "x", 0, 1.0, Some(0.5)),
            record("A", "x", 0, 1.0, Some(0.5)),
            record("A", "y", 2, 1.0, Some(0.5)),
        ]);
        let keys: Vec<(String, NaiveDate)> = deduped.iter().map(|r| (r.field_name.clone(), r.date)).collect();

        assert_eq!(keys[0].0, "A");
        assert!(keys[0].1 < keys[1].1);
        assert_eq!(keys[2].0, "B");
    }

    #[test]
    fn test_run_status_labels() {
        assert_eq!(RunStatus::Completed.as_str(), "completed");
        assert_eq!(RunStatus::NoEligibleImagery.as_str(), "no_eligible_imagery");
    }
}
