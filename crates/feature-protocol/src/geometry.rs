//! Row to geometry resolution.
//!
//! Precedence, per row:
//! 1. a non-empty polygon text field is parsed as a polygon; a parse failure
//!    yields no geometry (the row is dropped, no point fallback)
//! 2. otherwise two numeric fields that both coerce to finite numbers give a
//!    point
//! 3. otherwise no geometry

use serde::{Deserialize, Serialize};

use crate::geojson::Geometry;
use crate::types::{CellValue, RowRecord};
use crate::wkt::parse_polygon;

/// Names of the columns geometry is derived from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeometryFields {
    /// Column holding polygon text.
    #[serde(default = "default_polygon_field")]
    pub polygon_field: String,

    /// Column holding the point x coordinate.
    #[serde(default = "default_x_field")]
    pub x_field: String,

    /// Column holding the point y coordinate.
    #[serde(default = "default_y_field")]
    pub y_field: String,
}

impl Default for GeometryFields {
    fn default() -> Self {
        Self {
            polygon_field: default_polygon_field(),
            x_field: default_x_field(),
            y_field: default_y_field(),
        }
    }
}

fn default_polygon_field() -> String {
    "polygon_wkt".to_string()
}

fn default_x_field() -> String {
    "x".to_string()
}

fn default_y_field() -> String {
    "y".to_string()
}

/// Derive the geometry for one row, or `None` if the row has no usable one.
pub fn resolve_geometry(row: &RowRecord, fields: &GeometryFields) -> Option<Geometry> {
    if let Some(text) = row
        .get(&fields.polygon_field)
        .and_then(CellValue::as_str)
        .filter(|s| !s.trim().is_empty())
    {
        return match parse_polygon(text) {
            Ok(rings) => Some(Geometry::polygon(rings)),
            Err(e) => {
                tracing::trace!(error = %e, "Dropping row with malformed polygon text");
                None
            }
        };
    }

    let x = row.get(&fields.x_field)?.as_finite_f64()?;
    let y = row.get(&fields.y_field)?.as_finite_f64()?;
    Some(Geometry::point(x, y))
}
