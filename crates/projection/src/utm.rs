//! Universal Transverse Mercator projection on the WGS84 ellipsoid.
//!
//! Sentinel-2 tiles are delivered in the UTM zone of the tile, so field
//! boundaries drawn in lon/lat are projected into that zone before they are
//! overlaid on the pixel grid. The same projection gives the planar area
//! used for hectare figures.
//!
//! Series expansions follow Snyder, "Map Projections: A Working Manual"
//! (USGS PP 1395), pp. 61-64. Accuracy is at the millimetre level within a
//! zone, far finer than a 10 m pixel.

use thiserror::Error;

/// WGS84 semi-major axis (meters)
const A: f64 = 6_378_137.0;
/// WGS84 flattening
const F: f64 = 1.0 / 298.257_223_563;
/// UTM central scale factor
const K0: f64 = 0.9996;
/// False easting applied to every zone
const FALSE_EASTING: f64 = 500_000.0;
/// False northing applied in the southern hemisphere
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("UTM zone {0} out of range 1-60")]
    InvalidZone(u8),

    #[error("latitude {0} outside UTM coverage (-80 to 84)")]
    LatitudeOutOfRange(f64),
}

/// A single UTM zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Utm {
    /// Zone number, 1-60
    pub zone: u8,
    /// Northern (true) or southern (false) hemisphere false northing
    pub north: bool,
    /// Central meridian in radians
    lon0: f64,
    e2: f64,
    ep2: f64,
}

impl Utm {
    /// Create the projection for an explicit zone.
    pub fn new(zone: u8, north: bool) -> Result<Self, ProjectionError> {
        if !(1..=60).contains(&zone) {
            return Err(ProjectionError::InvalidZone(zone));
        }

        let e2 = F * (2.0 - F);
        let lon0_deg = (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0;

        Ok(Self {
            zone,
            north,
            lon0: lon0_deg.to_radians(),
            e2,
            ep2: e2 / (1.0 - e2),
        })
    }

    /// The zone a lon/lat point falls in (no Norway/Svalbard exceptions).
    pub fn for_lon_lat(lon_deg: f64, lat_deg: f64) -> Result<Self, ProjectionError> {
        if !(-80.0..=84.0).contains(&lat_deg) {
            return Err(ProjectionError::LatitudeOutOfRange(lat_deg));
        }
        Self::new(zone_for_lon(lon_deg), lat_deg >= 0.0)
    }

    /// Central meridian of the zone in degrees.
    pub fn central_meridian(&self) -> f64 {
        self.lon0.to_degrees()
    }

    /// EPSG code of this zone (326xx / 327xx).
    pub fn epsg(&self) -> u32 {
        if self.north {
            32600 + self.zone as u32
        } else {
            32700 + self.zone as u32
        }
    }

    /// Project lon/lat (degrees) to easting/northing (meters).
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let phi = lat_deg.to_radians();
        let lambda = lon_deg.to_radians();
        let e2 = self.e2;
        let ep2 = self.ep2;

        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        let tan_phi = phi.tan();

        let n = A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * (lambda - self.lon0);
        let m = meridian_arc(phi, e2);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = K0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
            + FALSE_EASTING;

        let mut y = K0
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

        if !self.north {
            y += FALSE_NORTHING_SOUTH;
        }

        (x, y)
    }

    /// Unproject easting/northing (meters) to lon/lat (degrees).
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let e2 = self.e2;
        let ep2 = self.ep2;
        let sqrt_1me2 = (1.0 - e2).sqrt();
        let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);

        let northing = if self.north { y } else { y - FALSE_NORTHING_SOUTH };
        let m = northing / K0;
        let mu = m / (A * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0));

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin1 = phi1.sin();
        let cos1 = phi1.cos();
        let tan1 = phi1.tan();

        let c1 = ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let denom = 1.0 - e2 * sin1 * sin1;
        let n1 = A / denom.sqrt();
        let r1 = A * (1.0 - e2) / denom.powf(1.5);
        let d = (x - FALSE_EASTING) / (n1 * K0);

        let phi = phi1
            - (n1 * tan1 / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);

        let lambda = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos1;

        (lambda.to_degrees(), phi.to_degrees())
    }
}

/// UTM zone number for a longitude in degrees.
pub fn zone_for_lon(lon_deg: f64) -> u8 {
    // Normalize to [-180, 180) so 180E lands in zone 1
    let lon = ((lon_deg + 180.0).rem_euclid(360.0)) - 180.0;
    (((lon + 180.0) / 6.0).floor() as u8).min(59) + 1
}

/// Distance along the meridian from the equator to latitude `phi` (radians).
fn meridian_arc(phi: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}
