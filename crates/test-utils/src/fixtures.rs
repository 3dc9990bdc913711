//! Common test fixtures for field and raster tests.
//!
//! All planar fixtures live in WGS84 / UTM zone 55S with 10 m pixels, the
//! native Sentinel-2 red/NIR resolution.

use chrono::{DateTime, TimeZone, Utc};
use ndvi_common::{BoundingBox, Crs, FieldGeometry, FieldPolygon, GeoTransform, ImageDescriptor};

/// Planar CRS used by fixtures.
pub const PLANAR_CRS: Crs = Crs::Utm {
    zone: 55,
    north: false,
};

/// Native pixel size in meters.
pub const PIXEL_SIZE: f64 = 10.0;

/// Top-left corner of fixture grids.
pub const ORIGIN: (f64, f64) = (500_000.0, 5_000_000.0);

/// Geotransform for a fixture grid with 10 m pixels at [`ORIGIN`].
pub fn fixture_transform() -> GeoTransform {
    GeoTransform::square(ORIGIN.0, ORIGIN.1, PIXEL_SIZE)
}

/// Closed square ring with its top-left at pixel `(col, row)` of the fixture grid,
/// spanning `cols` x `rows` whole pixels.
pub fn pixel_aligned_ring(col: usize, row: usize, cols: usize, rows: usize) -> Vec<(f64, f64)> {
    let x0 = ORIGIN.0 + col as f64 * PIXEL_SIZE;
    let y1 = ORIGIN.1 - row as f64 * PIXEL_SIZE;
    let x1 = x0 + cols as f64 * PIXEL_SIZE;
    let y0 = y1 - rows as f64 * PIXEL_SIZE;
    vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]
}

/// A rectangular field covering whole pixels of the fixture grid.
pub fn pixel_aligned_field(name: &str, col: usize, row: usize, cols: usize, rows: usize) -> FieldPolygon {
    FieldPolygon::new(
        name,
        name,
        FieldGeometry::polygon(PLANAR_CRS, pixel_aligned_ring(col, row, cols, rows)),
    )
    .expect("fixture field is valid")
}

/// A square field of side `size` meters with lower-left corner at `(x0, y0)`.
pub fn square_field(name: &str, x0: f64, y0: f64, size: f64) -> FieldPolygon {
    let ring = vec![
        (x0, y0),
        (x0 + size, y0),
        (x0 + size, y0 + size),
        (x0, y0 + size),
        (x0, y0),
    ];
    FieldPolygon::new(name, name, FieldGeometry::polygon(PLANAR_CRS, ring))
        .expect("fixture field is valid")
}

/// Fixed capture time used by fixtures: 2026-02-01 00:12:45 UTC.
pub fn fixture_capture_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 0, 12, 45).unwrap()
}

/// Descriptor for a planar fixture image.
pub fn descriptor(id: &str, captured_at: DateTime<Utc>, cloud_pct: f64) -> ImageDescriptor {
    ImageDescriptor {
        id: id.to_string(),
        captured_at,
        cloud_pct,
        footprint: BoundingBox::new(146.9, -45.2, 147.1, -45.0),
        crs: PLANAR_CRS,
    }
}
