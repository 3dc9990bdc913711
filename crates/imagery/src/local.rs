//! Scene catalog backed by a local directory tree.
//!
//! Each scene lives in its own directory holding a `scene.json` manifest and
//! one raw little-endian `f32` file per band:
//!
//! ```text
//! catalog/
//!   S2A_20260201_T55GEN/
//!     scene.json
//!     B4.f32
//!     B8.f32
//! ```
//!
//! Manifests are read when the catalog is opened; band files are only read
//! by [`RasterCatalog::load_bands`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ndvi_common::{Band, BoundingBox, Crs, GeoTransform, ImageDescriptor, RasterImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::catalog::{sort_newest_first, CatalogQuery, RasterCatalog};
use crate::error::{CatalogError, Result};

/// File name of a scene manifest.
pub const MANIFEST_FILE: &str = "scene.json";

/// On-disk description of one scene.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneManifest {
    pub id: String,
    pub captured_at: DateTime<Utc>,
    pub cloud_pct: f64,
    /// Scene footprint as `[min_lon, min_lat, max_lon, max_lat]`.
    pub footprint: [f64; 4],
    /// EPSG code of the band grids.
    pub epsg: u32,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
    /// Band name to file name, relative to the manifest.
    pub bands: HashMap<String, String>,
    /// Raw value marking missing pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodata: Option<f32>,
    /// Factor turning stored digital numbers into reflectance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflectance_scale: Option<f32>,
}

impl SceneManifest {
    pub fn descriptor(&self) -> ImageDescriptor {
        let [min_lon, min_lat, max_lon, max_lat] = self.footprint;
        ImageDescriptor {
            id: self.id.clone(),
            captured_at: self.captured_at,
            cloud_pct: self.cloud_pct,
            footprint: BoundingBox::new(min_lon, min_lat, max_lon, max_lat),
            crs: Crs::from_epsg(self.epsg),
        }
    }

    /// Size in bytes of one band file, `None` when the grid size overflows.
    pub fn band_byte_len(&self) -> Option<usize> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(std::mem::size_of::<f32>())
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CatalogError::invalid(format!("scene '{}' has an empty grid", self.id)));
        }
        if self.band_byte_len().is_none() {
            return Err(CatalogError::invalid(format!(
                "scene '{}' grid {}x{} is too large",
                self.id, self.width, self.height
            )));
        }
        if !(0.0..=100.0).contains(&self.cloud_pct) {
            return Err(CatalogError::invalid(format!(
                "scene '{}' cloud cover {} outside 0-100",
                self.id, self.cloud_pct
            )));
        }
        if self.bands.is_empty() {
            return Err(CatalogError::invalid(format!("scene '{}' lists no bands", self.id)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct SceneEntry {
    manifest: SceneManifest,
    dir: PathBuf,
}

/// Catalog of scenes stored under one root directory.
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    root: PathBuf,
    scenes: HashMap<String, SceneEntry>,
}

impl LocalCatalog {
    /// Scan `root` for scene manifests.
    ///
    /// Unreadable or invalid manifests are skipped with a warning; a missing
    /// root directory is an error.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !tokio::fs::metadata(&root).await?.is_dir() {
            return Err(CatalogError::not_found(format!(
                "catalog directory {}",
                root.display()
            )));
        }

        let scan_root = root.clone();
        let manifest_paths = tokio::task::spawn_blocking(move || find_manifests(&scan_root))
            .await
            .map_err(|e| CatalogError::invalid(format!("catalog scan failed: {}", e)))??;

        let mut scenes = HashMap::new();

        for path in manifest_paths {
            let manifest = match read_manifest(&path).await {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable scene manifest");
                    continue;
                }
            };

            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.clone());

            if scenes.contains_key(&manifest.id) {
                warn!(id = %manifest.id, path = %dir.display(), "Duplicate scene id, keeping first");
                continue;
            }

            debug!(id = %manifest.id, path = %dir.display(), "Registered scene");
            scenes.insert(manifest.id.clone(), SceneEntry { manifest, dir });
        }

        info!(root = %root.display(), scenes = scenes.len(), "Opened local catalog");

        Ok(Self { root, scenes })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Write a scene into `root/<id>/`: the manifest plus one raw file per band.
    ///
    /// `bands` pairs each band name with its pixels in row-major order.
    pub async fn write_scene(
        root: impl AsRef<Path>,
        manifest: &SceneManifest,
        bands: &[(&str, &[f32])],
    ) -> Result<PathBuf> {
        let dir = root.as_ref().join(&manifest.id);
        tokio::fs::create_dir_all(&dir).await?;

        for (name, data) in bands {
            let file = manifest
                .bands
                .get(*name)
                .ok_or_else(|| CatalogError::invalid(format!("manifest has no file for band '{}'", name)))?;
            let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
            tokio::fs::write(dir.join(file), bytes).await?;
        }

        let json = serde_json::to_vec_pretty(manifest)?;
        tokio::fs::write(dir.join(MANIFEST_FILE), json).await?;

        Ok(dir)
    }

    async fn read_band(&self, entry: &SceneEntry, name: &str) -> Result<Band> {
        let manifest = &entry.manifest;
        let file = manifest.bands.get(name).ok_or_else(|| {
            CatalogError::not_found(format!("band '{}' of scene '{}'", name, manifest.id))
        })?;

        let path = entry.dir.join(file);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::not_found(format!("band file {}", path.display())));
            }
            Err(e) => return Err(e.into()),
        };

        let expected = manifest.band_byte_len().ok_or_else(|| {
            CatalogError::invalid(format!("scene '{}' grid is too large", manifest.id))
        })?;
        if bytes.len() != expected {
            return Err(CatalogError::invalid(format!(
                "band file {} has {} bytes, expected {}",
                path.display(),
                bytes.len(),
                expected
            )));
        }

        let mut data: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
        for v in &mut data {
            // Stored little-endian; no-op on little-endian hosts.
            *v = f32::from_bits(u32::from_le(v.to_bits()));
            if manifest.nodata.map_or(false, |nd| *v == nd) {
                *v = f32::NAN;
            } else if let Some(scale) = manifest.reflectance_scale {
                *v *= scale;
            }
        }

        Ok(Band::new(
            name,
            manifest.width,
            manifest.height,
            manifest.transform,
            Crs::from_epsg(manifest.epsg),
            data,
        )?)
    }
}

/// Paths of every manifest under `root`. Blocking directory walk.
fn find_manifests(root: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in walkdir::WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| CatalogError::invalid(e.to_string()))?;
        if entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

async fn read_manifest(path: &Path) -> Result<SceneManifest> {
    let text = tokio::fs::read_to_string(path).await?;
    let manifest: SceneManifest = serde_json::from_str(&text)?;
    manifest.validate()?;
    Ok(manifest)
}

#[async_trait]
impl RasterCatalog for LocalCatalog {
    #[instrument(skip(self, query), fields(root = %self.root.display()))]
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<ImageDescriptor>> {
        let mut images: Vec<ImageDescriptor> = self
            .scenes
            .values()
            .map(|entry| entry.manifest.descriptor())
            .filter(|d| query.matches(d))
            .collect();
        sort_newest_first(&mut images);

        debug!(matches = images.len(), "Queried local catalog");
        Ok(images)
    }

    #[instrument(skip(self, image, bands), fields(image = %image.id))]
    async fn load_bands(&self, image: &ImageDescriptor, bands: &[&str]) -> Result<RasterImage> {
        let entry = self
            .scenes
            .get(&image.id)
            .ok_or_else(|| CatalogError::not_found(format!("scene '{}'", image.id)))?;

        let mut loaded = Vec::with_capacity(bands.len());
        for name in bands {
            loaded.push(self.read_band(entry, name).await?);
        }

        debug!(bands = loaded.len(), "Loaded scene bands");
        Ok(RasterImage::new(entry.manifest.descriptor(), loaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndvi_common::DateWindow;
    use test_utils::{fixture_capture_time, fixture_transform};

    fn manifest(id: &str, captured_at: DateTime<Utc>, cloud_pct: f64) -> SceneManifest {
        SceneManifest {
            id: id.to_string(),
            captured_at,
            cloud_pct,
            footprint: [146.9, -45.2, 147.1, -45.0],
            epsg: 32755,
            transform: fixture_transform(),
            width: 2,
            height: 2,
            bands: HashMap::from([
                ("B4".to_string(), "B4.f32".to_string()),
                ("B8".to_string(), "B8.f32".to_string()),
            ]),
            nodata: Some(0.0),
            reflectance_scale: Some(0.0001),
        }
    }

    fn query() -> CatalogQuery {
        CatalogQuery::new(
            BoundingBox::new(146.95, -45.15, 147.0, -45.1),
            DateWindow::trailing_days(fixture_capture_time(), 30),
            50.0,
        )
    }

    #[tokio::test]
    async fn test_open_query_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let t = fixture_capture_time();

        let m = manifest("S2A_NEW", t, 10.0);
        let red = [1000.0, 0.0, 500.0, 250.0];
        let nir = [3000.0, 0.0, 1500.0, 750.0];
        LocalCatalog::write_scene(dir.path(), &m, &[("B4", &red), ("B8", &nir)])
            .await
            .unwrap();
        LocalCatalog::write_scene(
            dir.path(),
            &manifest("S2A_OLD", t - chrono::Duration::days(3), 20.0),
            &[("B4", &red), ("B8", &nir)],
        )
        .await
        .unwrap();

        let catalog = LocalCatalog::open(dir.path()).await.unwrap();
        assert_eq!(catalog.len(), 2);

        let found = catalog.query(&query()).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["S2A_NEW", "S2A_OLD"]);
        assert_eq!(found[0].crs, Crs::Utm { zone: 55, north: false });

        let image = catalog.load_bands(&found[0], &["B8", "B4"]).await.unwrap();
        let b4 = image.band("B4").unwrap();
        assert!((b4.value(0, 0).unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(b4.value(1, 0), None);
        assert!(image.band("B8").is_some());
    }

    #[tokio::test]
    async fn test_filters_and_missing_band() {
        let dir = tempfile::tempdir().unwrap();
        let data = [1.0f32; 4];
        let m = manifest("CLOUDY", fixture_capture_time(), 80.0);
        LocalCatalog::write_scene(dir.path(), &m, &[("B4", &data), ("B8", &data)])
            .await
            .unwrap();

        let catalog = LocalCatalog::open(dir.path()).await.unwrap();
        assert!(catalog.query(&query()).await.unwrap().is_empty());

        let result = catalog.load_bands(&m.descriptor(), &["B11"]).await;
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_manifest_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("broken");
        tokio::fs::create_dir_all(&bad).await.unwrap();
        tokio::fs::write(bad.join(MANIFEST_FILE), b"{ not json").await.unwrap();

        let catalog = LocalCatalog::open(dir.path()).await.unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_band_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let m = manifest("SHORT", fixture_capture_time(), 1.0);
        let scene_dir = LocalCatalog::write_scene(dir.path(), &m, &[("B4", &[1.0, 2.0])])
            .await
            .unwrap();
        assert!(scene_dir.join("B4.f32").exists());

        let catalog = LocalCatalog::open(dir.path()).await.unwrap();
        let result = catalog.load_bands(&m.descriptor(), &["B4"]).await;
        assert!(matches!(result, Err(CatalogError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_oversized_grid_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manifest("HUGE", fixture_capture_time(), 1.0);
        m.width = usize::MAX;
        assert_eq!(m.band_byte_len(), None);

        let data = [1.0f32; 4];
        LocalCatalog::write_scene(dir.path(), &m, &[("B4", &data)]).await.unwrap();
        assert!(LocalCatalog::open(dir.path()).await.unwrap().is_empty());

        // A manifest that bypassed the scan still cannot overflow the size check.
        let catalog = LocalCatalog {
            root: dir.path().to_path_buf(),
            scenes: HashMap::from([(
                m.id.clone(),
                SceneEntry {
                    manifest: m.clone(),
                    dir: dir.path().join(&m.id),
                },
            )]),
        };
        let result = catalog.load_bands(&m.descriptor(), &["B4"]).await;
        assert!(matches!(result, Err(CatalogError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LocalCatalog::open(dir.path().join("nope")).await.is_err());
    }
}
