//! Map projections for field boundaries.
//!
//! Forward and inverse transverse Mercator for the WGS84 UTM zones that
//! imagery is delivered in.

pub mod utm;

pub use utm::{ProjectionError, Utm};
