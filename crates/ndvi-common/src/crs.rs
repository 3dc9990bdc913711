//! Coordinate Reference System identification.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FieldError;

/// The CRS a geometry or raster is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// WGS84 Geographic, longitude/latitude in degrees (EPSG:4326)
    Wgs84,
    /// WGS84 / UTM, meters (EPSG:326xx north, EPSG:327xx south)
    Utm { zone: u8, north: bool },
    /// Any other planar CRS in meters, identified only by its EPSG code
    Projected(u32),
}

impl Crs {
    /// Map an EPSG code onto a CRS.
    pub fn from_epsg(code: u32) -> Self {
        match code {
            4326 => Crs::Wgs84,
            32601..=32660 => Crs::Utm {
                zone: (code - 32600) as u8,
                north: true,
            },
            32701..=32760 => Crs::Utm {
                zone: (code - 32700) as u8,
                north: false,
            },
            other => Crs::Projected(other),
        }
    }

    /// Parse strings such as `EPSG:32755`, `epsg:4326`, `CRS:84` or the OGC
    /// URN form `urn:ogc:def:crs:EPSG::32755`.
    pub fn parse(s: &str) -> Result<Self, FieldError> {
        let normalized = s.trim().to_uppercase();
        if normalized == "CRS:84" || normalized.ends_with("CRS84") {
            return Ok(Crs::Wgs84);
        }

        let code = normalized
            .rsplit(':')
            .next()
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(|| FieldError::UnsupportedCrs(s.to_string()))?;

        Ok(Self::from_epsg(code))
    }

    /// EPSG code of this CRS.
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::Utm { zone, north: true } => 32600 + *zone as u32,
            Crs::Utm { zone, north: false } => 32700 + *zone as u32,
            Crs::Projected(code) => *code,
        }
    }

    /// Check if this is a geographic (lon/lat) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Wgs84)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}
