//! In-process catalog over already-loaded images.
//!
//! Used by tests and by callers that assemble imagery themselves. Failures
//! can be scripted to exercise retry and error paths.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use ndvi_common::{ImageDescriptor, RasterImage};

use crate::catalog::{sort_newest_first, CatalogQuery, RasterCatalog};
use crate::error::{CatalogError, Result};

/// Catalog holding every image in memory.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    images: Vec<RasterImage>,
    transient_failures: AtomicU32,
    query_calls: AtomicU32,
    load_calls: AtomicU32,
}

impl MemoryCatalog {
    pub fn new(images: Vec<RasterImage>) -> Self {
        Self {
            images,
            ..Self::default()
        }
    }

    /// Fail the next `n` calls (query or load) with a transient error.
    pub fn with_transient_failures(self, n: u32) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn push(&mut self, image: RasterImage) {
        self.images.push(image);
    }

    /// Number of `query` calls made, failed ones included.
    pub fn query_calls(&self) -> u32 {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Number of `load_bands` calls made, failed ones included.
    pub fn load_calls(&self) -> u32 {
        self.load_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> Result<()> {
        let remaining = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match remaining {
            Ok(_) => Err(CatalogError::Transient("scripted failure".to_string())),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl RasterCatalog for MemoryCatalog {
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<ImageDescriptor>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;

        let mut found: Vec<ImageDescriptor> = self
            .images
            .iter()
            .map(|image| image.descriptor.clone())
            .filter(|d| query.matches(d))
            .collect();
        sort_newest_first(&mut found);
        Ok(found)
    }

    async fn load_bands(&self, image: &ImageDescriptor, bands: &[&str]) -> Result<RasterImage> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;

        let stored = self
            .images
            .iter()
            .find(|i| i.id() == image.id)
            .ok_or_else(|| CatalogError::not_found(format!("scene '{}'", image.id)))?;

        let mut selected = Vec::with_capacity(bands.len());
        for name in bands {
            let band = stored.band(name).ok_or_else(|| {
                CatalogError::not_found(format!("band '{}' of scene '{}'", name, image.id))
            })?;
            selected.push(band.clone());
        }

        Ok(RasterImage::new(stored.descriptor.clone(), selected))
    }
}
