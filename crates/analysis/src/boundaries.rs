//! Field boundaries from GeoJSON.
//!
//! Accepts a `FeatureCollection` of `Polygon` and `MultiPolygon` features.
//! The field name comes from the `name` property (or `paddock_name`), the id
//! from the feature `id` when present. Coordinates are longitude/latitude
//! unless the legacy top-level `crs` member names another EPSG code.

use std::path::Path;

use ndvi_common::{Crs, FieldError, FieldGeometry, FieldPolygon, FieldResult, FieldStore, PolygonPart, Ring};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::Result;

/// Property keys searched for a field name, in order.
const NAME_PROPERTIES: [&str; 2] = ["name", "paddock_name"];

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    crs: Option<CrsMember>,
}

#[derive(Debug, Deserialize)]
struct CrsMember {
    properties: CrsProperties,
}

#[derive(Debug, Deserialize)]
struct CrsProperties {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

/// Read field boundaries from a GeoJSON file.
pub async fn load_fields(path: impl AsRef<Path>) -> Result<FieldStore> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await?;
    let store = parse_fields(&text)?;
    info!(path = %path.display(), fields = store.len(), crs = %store.crs(), "Loaded field boundaries");
    Ok(store)
}

/// Parse field boundaries from GeoJSON text.
pub fn parse_fields(text: &str) -> FieldResult<FieldStore> {
    let collection: FeatureCollection = serde_json::from_str(text)?;
    if collection.kind != "FeatureCollection" {
        return Err(FieldError::Malformed(format!(
            "expected a FeatureCollection, found '{}'",
            collection.kind
        )));
    }

    let crs = match &collection.crs {
        Some(member) => Crs::parse(&member.properties.name)?,
        None => Crs::Wgs84,
    };

    let fields = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| feature_to_field(index, feature, crs))
        .collect::<FieldResult<Vec<_>>>()?;

    FieldStore::new(fields)
}

fn feature_to_field(index: usize, feature: Feature, crs: Crs) -> FieldResult<FieldPolygon> {
    let name = feature
        .properties
        .as_ref()
        .and_then(|props| {
            NAME_PROPERTIES
                .iter()
                .find_map(|key| props.get(*key).and_then(value_to_string))
        })
        .ok_or_else(|| FieldError::Malformed(format!("feature {} has no name property", index)))?;

    let id = feature
        .id
        .as_ref()
        .and_then(value_to_string)
        .unwrap_or_else(|| name.clone());

    let parts = match feature.geometry {
        Some(Geometry::Polygon { coordinates }) => vec![polygon_part(&name, coordinates)?],
        Some(Geometry::MultiPolygon { coordinates }) => coordinates
            .into_iter()
            .map(|polygon| polygon_part(&name, polygon))
            .collect::<FieldResult<Vec<_>>>()?,
        Some(Geometry::Unsupported) => {
            return Err(FieldError::invalid_geometry(&name, "geometry is not a polygon"));
        }
        None => return Err(FieldError::invalid_geometry(&name, "feature has no geometry")),
    };

    debug!(field = %name, id = %id, parts = parts.len(), "Parsed field");
    FieldPolygon::new(id, name, FieldGeometry::new(crs, parts))
}

fn polygon_part(name: &str, rings: Vec<Vec<Vec<f64>>>) -> FieldResult<PolygonPart> {
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| FieldError::invalid_geometry(name, "polygon has no rings"))?;

    let mut part = PolygonPart::new(to_ring(name, exterior)?);
    for hole in rings {
        part = part.with_hole(to_ring(name, hole)?);
    }
    Ok(part)
}

fn to_ring(name: &str, positions: Vec<Vec<f64>>) -> FieldResult<Ring> {
    positions
        .into_iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok((*x, *y)),
            _ => Err(FieldError::invalid_geometry(name, "position needs two coordinates")),
        })
        .collect()
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0.005 degrees square near Hobart, roughly 22 ha.
    const NORTH: &str = r#"{
        "type": "Feature",
        "id": 17,
        "properties": { "name": "North" },
        "geometry": { "type": "Polygon", "coordinates": [[
            [147.000, -42.900], [147.005, -42.900], [147.005, -42.895], [147.000, -42.895], [147.000, -42.900]
        ]]}
    }"#;

    fn collection(features: &[&str]) -> String {
        format!(r#"{{ "type": "FeatureCollection", "features": [{}] }}"#, features.join(","))
    }

    #[test]
    fn test_parse_polygon_feature() {
        let store = parse_fields(&collection(&[NORTH])).unwrap();
        let field = store.get("North").unwrap();

        assert_eq!(field.id, "17");
        assert_eq!(store.crs(), Crs::Wgs84);
        // 0.005 deg lon x 0.005 deg lat at 42.9S is about 408 m x 555 m
        assert!(field.area_ha > 20.0 && field.area_ha < 24.0, "{}", field.area_ha);
    }

    #[test]
    fn test_paddock_name_fallback_and_multipolygon_with_hole() {
        let creek = r#"{
            "type": "Feature",
            "properties": { "paddock_name": "Creek", "owner": "x" },
            "geometry": { "type": "MultiPolygon", "coordinates": [
                [
                    [[147.01, -42.90], [147.02, -42.90], [147.02, -42.89], [147.01, -42.89], [147.01, -42.90]],
                    [[147.012, -42.898], [147.014, -42.898], [147.014, -42.896], [147.012, -42.896], [147.012, -42.898]]
                ],
                [[[147.03, -42.90, 12.5], [147.04, -42.90, 12.5], [147.04, -42.89, 12.5], [147.03, -42.90, 12.5]]]
            ]}
        }"#;
        let store = parse_fields(&collection(&[NORTH, creek])).unwrap();
        let field = store.get("Creek").unwrap();

        assert_eq!(field.id, "Creek");
        assert_eq!(field.geometry.parts.len(), 2);
        assert_eq!(field.geometry.parts[0].holes.len(), 1);
    }

    #[test]
    fn test_named_planar_crs() {
        let doc = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32755" } },
            "features": [{
                "type": "Feature",
                "properties": { "name": "Planar" },
                "geometry": { "type": "Polygon", "coordinates": [[
                    [500000, 5000000], [500200, 5000000], [500200, 5000200], [500000, 5000200], [500000, 5000000]
                ]]}
            }]
        }"#;
        let store = parse_fields(doc).unwrap();
        assert_eq!(store.crs(), Crs::Utm { zone: 55, north: false });
        assert!((store.get("Planar").unwrap().area_ha - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_documents() {
        assert!(matches!(parse_fields("{ nope"), Err(FieldError::Malformed(_))));
        assert!(matches!(
            parse_fields(r#"{ "type": "Feature", "features": [] }"#),
            Err(FieldError::Malformed(_))
        ));
        assert!(matches!(parse_fields(&collection(&[])), Err(FieldError::EmptyFieldSet)));
        assert!(matches!(
            parse_fields(&collection(&[NORTH, NORTH])),
            Err(FieldError::DuplicateField(_))
        ));

        let unnamed = r#"{ "type": "Feature", "properties": {}, "geometry": null }"#;
        assert!(matches!(parse_fields(&collection(&[unnamed])), Err(FieldError::Malformed(_))));

        let line = r#"{ "type": "Feature", "properties": { "name": "Fence" },
            "geometry": { "type": "LineString", "coordinates": [[147.0, -42.9], [147.1, -42.9]] } }"#;
        assert!(matches!(
            parse_fields(&collection(&[line])),
            Err(FieldError::InvalidGeometry { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_fields_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paddocks.geojson");
        tokio::fs::write(&path, collection(&[NORTH])).await.unwrap();

        let store = load_fields(&path).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(load_fields(dir.path().join("missing.geojson")).await.is_err());
    }
}
