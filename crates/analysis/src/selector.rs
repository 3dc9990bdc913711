//! Choice of the images a run analyzes.

use imagery::{sort_newest_first, CatalogQuery, RasterCatalog};
use ndvi_common::{BoundingBox, DateWindow, ImageDescriptor};
use tracing::{debug, info};

use crate::error::Result;

/// Images picked for a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Newest first, never empty.
    Images(Vec<ImageDescriptor>),
    /// Nothing usable in the window. Not an error: the run is skipped.
    NoEligibleImagery { window: DateWindow },
}

impl Selection {
    pub fn images(&self) -> &[ImageDescriptor] {
        match self {
            Selection::Images(images) => images,
            Selection::NoEligibleImagery { .. } => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.images().is_empty()
    }
}

/// Picks the newest images covering a set of fields.
///
/// One catalog query serves every field: all fields in a run share the
/// same images.
pub struct ImageSelector<'a, C: ?Sized> {
    catalog: &'a C,
}

impl<'a, C: RasterCatalog + ?Sized> ImageSelector<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Select up to `history_count` newest images over `extent` (lon/lat)
    /// captured within `window` with cloud cover at most `max_cloud_pct`.
    pub async fn select(
        &self,
        extent: BoundingBox,
        window: DateWindow,
        max_cloud_pct: f64,
        history_count: usize,
    ) -> Result<Selection> {
        let query = CatalogQuery::new(extent, window, max_cloud_pct);
        let mut images = self.catalog.query(&query).await?;
        let returned = images.len();

        // Catalogs promise these filters and ordering; enforce them anyway.
        images.retain(|d| d.cloud_pct <= max_cloud_pct && window.contains(&d.captured_at));
        sort_newest_first(&mut images);
        images.truncate(history_count);

        debug!(returned, selected = images.len(), "Catalog query complete");

        if images.is_empty() {
            info!(
                start = %window.start,
                end = %window.end,
                max_cloud_pct,
                "No eligible imagery in window"
            );
            return Ok(Selection::NoEligibleImagery { window });
        }

        for image in &images {
            info!(
                image = %image.id,
                captured_at = %image.captured_at,
                cloud_pct = image.cloud_pct,
                "Selected image"
            );
        }

        Ok(Selection::Images(images))
    }
}
