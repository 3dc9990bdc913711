//! Field boundaries (the geometry store).
//!
//! A field is one or more polygons, each an exterior ring with optional
//! holes, in a single CRS. Area in hectares is computed once when the field is
//! created and carried unchanged through any later reprojection.

use std::collections::HashSet;

use projection::Utm;
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::crs::Crs;
use crate::error::{FieldError, FieldResult};

/// Square meters per hectare.
pub const M2_PER_HA: f64 = 10_000.0;

/// A closed ring of `(x, y)` vertices. The closing vertex may be repeated.
pub type Ring = Vec<(f64, f64)>;

/// One polygon: an exterior ring and zero or more holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonPart {
    pub exterior: Ring,
    #[serde(default)]
    pub holes: Vec<Ring>,
}

impl PolygonPart {
    pub fn new(exterior: Ring) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    pub fn with_hole(mut self, hole: Ring) -> Self {
        self.holes.push(hole);
        self
    }

    /// Inside the exterior ring and outside every hole.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        ring_contains(&self.exterior, x, y) && !self.holes.iter().any(|h| ring_contains(h, x, y))
    }

    /// Planar area: exterior minus holes, in CRS units squared.
    pub fn planar_area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| ring_area(h)).sum();
        (ring_area(&self.exterior) - holes).max(0.0)
    }

    fn map_coords<F>(&self, f: &F) -> PolygonPart
    where
        F: Fn(f64, f64) -> (f64, f64),
    {
        PolygonPart {
            exterior: self.exterior.iter().map(|&(x, y)| f(x, y)).collect(),
            holes: self
                .holes
                .iter()
                .map(|h| h.iter().map(|&(x, y)| f(x, y)).collect())
                .collect(),
        }
    }
}

/// The footprint of a field in one CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldGeometry {
    pub crs: Crs,
    pub parts: Vec<PolygonPart>,
}

impl FieldGeometry {
    pub fn new(crs: Crs, parts: Vec<PolygonPart>) -> Self {
        Self { crs, parts }
    }

    /// Single polygon without holes.
    pub fn polygon(crs: Crs, exterior: Ring) -> Self {
        Self::new(crs, vec![PolygonPart::new(exterior)])
    }

    /// Bounding box over all exterior rings.
    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(
            self.parts
                .iter()
                .flat_map(|p| p.exterior.iter().copied()),
        )
    }

    /// Point-in-polygon test over every part.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.parts.iter().any(|p| p.contains_point(x, y))
    }

    /// Shoelace area in CRS units squared.
    ///
    /// Only meaningful for planar CRSs; see [`FieldGeometry::area_m2`].
    pub fn planar_area(&self) -> f64 {
        self.parts.iter().map(|p| p.planar_area()).sum()
    }

    /// Area in square meters.
    ///
    /// Geographic geometries are projected into the UTM zone of their centre
    /// first; planar geometries are assumed to be in meters.
    pub fn area_m2(&self) -> Result<f64, projection::ProjectionError> {
        if !self.crs.is_geographic() {
            return Ok(self.planar_area());
        }

        let (lon, lat) = self.bbox().map(|b| b.center()).unwrap_or((0.0, 0.0));
        let utm = Utm::for_lon_lat(lon, lat)?;
        Ok(self.map_coords(|x, y| utm.forward(x, y)).planar_area())
    }

    /// Reproject into `target`.
    ///
    /// Supported conversions are identity, WGS84 to UTM and UTM to WGS84.
    /// Returns `None` for any other pair.
    pub fn to_crs(&self, target: Crs) -> Option<FieldGeometry> {
        if self.crs == target {
            return Some(self.clone());
        }

        match (self.crs, target) {
            (Crs::Wgs84, Crs::Utm { zone, north }) => {
                let utm = Utm::new(zone, north).ok()?;
                Some(FieldGeometry::new(
                    target,
                    self.map_coords(|x, y| utm.forward(x, y)).parts,
                ))
            }
            (Crs::Utm { zone, north }, Crs::Wgs84) => {
                let utm = Utm::new(zone, north).ok()?;
                Some(FieldGeometry::new(
                    target,
                    self.map_coords(|x, y| utm.inverse(x, y)).parts,
                ))
            }
            _ => None,
        }
    }

    fn map_coords<F>(&self, f: F) -> FieldGeometry
    where
        F: Fn(f64, f64) -> (f64, f64),
    {
        FieldGeometry {
            crs: self.crs,
            parts: self.parts.iter().map(|p| p.map_coords(&f)).collect(),
        }
    }
}

/// A named field boundary with its area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPolygon {
    pub id: String,
    pub name: String,
    pub geometry: FieldGeometry,
    /// Area in hectares, computed once at construction.
    pub area_ha: f64,
}

impl FieldPolygon {
    /// Validate the geometry and compute the field's area.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        geometry: FieldGeometry,
    ) -> FieldResult<Self> {
        let name = name.into();
        validate_geometry(&name, &geometry)?;

        let area_m2 = geometry
            .area_m2()
            .map_err(|e| FieldError::invalid_geometry(&name, e.to_string()))?;
        if !(area_m2 > 0.0) {
            return Err(FieldError::invalid_geometry(&name, "polygon has zero area"));
        }

        Ok(Self {
            id: id.into(),
            name,
            geometry,
            area_ha: area_m2 / M2_PER_HA,
        })
    }

    /// Copy of this field with its geometry reprojected into `target`.
    pub fn to_crs(&self, target: Crs) -> FieldResult<FieldPolygon> {
        let geometry = self
            .geometry
            .to_crs(target)
            .ok_or_else(|| FieldError::Reprojection {
                field: self.name.clone(),
                from: self.geometry.crs.to_string(),
                to: target.to_string(),
            })?;

        Ok(FieldPolygon {
            id: self.id.clone(),
            name: self.name.clone(),
            geometry,
            area_ha: self.area_ha,
        })
    }

    pub fn crs(&self) -> Crs {
        self.geometry.crs
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.geometry.bbox()
    }
}

/// The set of fields analyzed in one run.
///
/// Guarantees at least one field, unique names, and a single CRS.
#[derive(Debug, Clone)]
pub struct FieldStore {
    fields: Vec<FieldPolygon>,
}

impl FieldStore {
    pub fn new(fields: Vec<FieldPolygon>) -> FieldResult<Self> {
        let first = fields.first().ok_or(FieldError::EmptyFieldSet)?;
        let crs = first.crs();

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(FieldError::DuplicateField(field.name.clone()));
            }
            if field.crs() != crs {
                return Err(FieldError::MixedCrs(crs.to_string(), field.crs().to_string()));
            }
        }

        Ok(Self { fields })
    }

    /// Keep only the named fields.
    ///
    /// Returns the filtered store and the requested names that were not found.
    pub fn retain_names(self, names: &[String]) -> FieldResult<(Self, Vec<String>)> {
        let wanted: HashSet<&str> = names.iter().map(|s| s.as_str()).collect();
        let present: HashSet<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
        let missing: Vec<String> = names
            .iter()
            .filter(|n| !present.contains(n.as_str()))
            .cloned()
            .collect();

        let kept: Vec<FieldPolygon> = self
            .fields
            .into_iter()
            .filter(|f| wanted.contains(f.name.as_str()))
            .collect();

        Ok((Self::new(kept)?, missing))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldPolygon> {
        self.fields.iter()
    }

    pub fn fields(&self) -> &[FieldPolygon] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FieldPolygon> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// CRS shared by every field.
    pub fn crs(&self) -> Crs {
        self.fields[0].crs()
    }

    /// Union of all field bounding boxes, in the store's CRS.
    pub fn extent(&self) -> BoundingBox {
        self.fields
            .iter()
            .filter_map(|f| f.bbox())
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Every field reprojected into `target`.
    pub fn to_crs(&self, target: Crs) -> FieldResult<Vec<FieldPolygon>> {
        self.fields.iter().map(|f| f.to_crs(target)).collect()
    }
}

fn validate_geometry(name: &str, geometry: &FieldGeometry) -> FieldResult<()> {
    if geometry.parts.is_empty() {
        return Err(FieldError::invalid_geometry(name, "no polygons"));
    }

    for part in &geometry.parts {
        for ring in std::iter::once(&part.exterior).chain(part.holes.iter()) {
            if ring.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
                return Err(FieldError::invalid_geometry(name, "non-finite coordinate"));
            }
            if distinct_vertices(ring) < 3 {
                return Err(FieldError::invalid_geometry(
                    name,
                    "ring needs at least 3 distinct vertices",
                ));
            }
        }
    }

    Ok(())
}

fn distinct_vertices(ring: &[(f64, f64)]) -> usize {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => ring.len() - 1,
        _ => ring.len(),
    }
}

/// Ray casting point-in-ring test.
fn ring_contains(ring: &[(f64, f64)], x: f64, y: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];

        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Unsigned shoelace area of a ring.
fn ring_area(ring: &[(f64, f64)]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0;
    for i in 0..n {
        let (x1, y1) = ring[i];
        let (x2, y2) = ring[(i + 1) % n];
        twice_area += x1 * y2 - x2 * y1;
    }

    twice_area.abs() / 2.0
}
