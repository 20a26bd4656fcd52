//! Feature Protocol
//!
//! Types and pure logic for turning observation-table rows into map-ready
//! GeoJSON features. Nothing in this crate performs I/O: rows come in as
//! already-read column values and leave as a [`FeatureCollection`].
//!
//! # Pipeline pieces owned here
//!
//! - [`geometry::resolve_geometry`] - row record to optional geometry
//! - [`assembler::assemble`] - per-column values to an ordered feature list
//! - [`errors::FeatureError`] - the request-level error taxonomy
//!
//! # Example
//!
//! ```rust
//! use feature_protocol::{assemble, CellValue, GeometryFields};
//!
//! let columns = vec!["x".to_string(), "y".to_string()];
//! let values = vec![
//!     vec![CellValue::Float(1.0), CellValue::Float(3.0)],
//!     vec![CellValue::Float(2.0), CellValue::Null],
//! ];
//!
//! let fc = assemble(&columns, &values, &GeometryFields::default());
//! // The second row has no usable y value and is dropped.
//! assert_eq!(fc.features.len(), 1);
//! assert_eq!(fc.columns, columns);
//! ```

pub mod assembler;
pub mod errors;
pub mod geojson;
pub mod geometry;
pub mod types;
pub mod wkt;

// Re-export commonly used types
pub use assembler::{assemble, Assembly};
pub use errors::{ErrorBody, FeatureError};
pub use geojson::{Feature, FeatureCollection, Geometry};
pub use geometry::{resolve_geometry, GeometryFields};
pub use types::{CellValue, RowRecord};
pub use wkt::{parse_polygon, WktError};

/// Media types used in feature responses
pub mod media_types {
    /// GeoJSON media type
    pub const GEO_JSON: &str = "application/geo+json";
    /// JSON media type
    pub const JSON: &str = "application/json";
}
