//! Shared test utilities for the paddock NDVI workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic reflectance band generators
//! - Field boundary and georeference fixtures
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{image_from_ndvi, square_field};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
