//! Common types shared across the paddock NDVI workspace.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod field;
pub mod raster;
pub mod record;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::Crs;
pub use error::{FieldError, FieldResult};
pub use field::{FieldGeometry, FieldPolygon, FieldStore, PolygonPart, Ring, M2_PER_HA};
pub use raster::{Band, GeoTransform, ImageDescriptor, RasterError, RasterImage};
pub use record::{AnalysisRecord, RecordKey};
pub use time::{DateWindow, DATE_FORMAT, TIMESTAMP_FORMAT};
