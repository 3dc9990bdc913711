//! Raster catalog contract.

use std::sync::Arc;

use async_trait::async_trait;
use ndvi_common::{BoundingBox, DateWindow, ImageDescriptor, RasterImage};

use crate::error::Result;

/// Filters for a catalog search.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    /// Area of interest in longitude/latitude.
    pub extent: BoundingBox,
    /// Capture time window, inclusive at both ends.
    pub window: DateWindow,
    /// Maximum scene cloud cover in percent, inclusive.
    pub max_cloud_pct: f64,
}

impl CatalogQuery {
    pub fn new(extent: BoundingBox, window: DateWindow, max_cloud_pct: f64) -> Self {
        Self {
            extent,
            window,
            max_cloud_pct,
        }
    }

    /// Whether an image satisfies every filter.
    pub fn matches(&self, image: &ImageDescriptor) -> bool {
        self.window.contains(&image.captured_at)
            && image.cloud_pct <= self.max_cloud_pct
            && image.footprint.intersects(&self.extent)
    }
}

/// Source of multi-band imagery.
///
/// `query` resolves descriptors only; pixels are fetched by `load_bands` for
/// the images a caller actually uses.
#[async_trait]
pub trait RasterCatalog: Send + Sync {
    /// Images matching `query`, newest first. No match is an empty list.
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<ImageDescriptor>>;

    /// Load the named bands of one image.
    async fn load_bands(&self, image: &ImageDescriptor, bands: &[&str]) -> Result<RasterImage>;
}

#[async_trait]
impl<T: RasterCatalog + ?Sized> RasterCatalog for Arc<T> {
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<ImageDescriptor>> {
        (**self).query(query).await
    }

    async fn load_bands(&self, image: &ImageDescriptor, bands: &[&str]) -> Result<RasterImage> {
        (**self).load_bands(image, bands).await
    }
}

/// Sort descriptors by capture time, newest first. Ties break on id.
pub fn sort_newest_first(images: &mut [ImageDescriptor]) {
    images.sort_by(|a, b| {
        b.captured_at
            .cmp(&a.captured_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
