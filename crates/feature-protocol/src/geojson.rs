//! GeoJSON types for feature responses.
//!
//! The response body is a GeoJSON `FeatureCollection` with one extension
//! member, `columns`, listing the full resolved column order of the table
//! the features were read from.

use serde::Serialize;

use crate::types::RowRecord;

/// Geometry derived from a row.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A point geometry.
    Point {
        /// Coordinates as [x, y].
        coordinates: [f64; 2],
    },

    /// A polygon geometry.
    Polygon {
        /// Array of linear rings (first is exterior, rest are holes).
        coordinates: Vec<Vec<[f64; 2]>>,
    },
}

impl Geometry {
    /// Create a point geometry.
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point {
            coordinates: [x, y],
        }
    }

    /// Create a polygon geometry.
    pub fn polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Geometry::Polygon { coordinates: rings }
    }
}

/// A GeoJSON Feature: a geometry plus the full row it came from.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: &'static str,

    /// The geometry of this feature.
    pub geometry: Geometry,

    /// Every column of the row, in table order.
    pub properties: RowRecord,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: RowRecord) -> Self {
        Self {
            type_: "Feature",
            geometry,
            properties,
        }
    }
}

/// A GeoJSON FeatureCollection with the resolved column list.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: &'static str,

    /// Features in row order. Dropped rows leave no gap.
    pub features: Vec<Feature>,

    /// Resolved column order of the source table.
    pub columns: Vec<String>,
}

impl FeatureCollection {
    /// Create an empty collection for the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            type_: "FeatureCollection",
            features: Vec::new(),
            columns,
        }
    }

    /// Add multiple features to the collection.
    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features.extend(features);
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_geometry_json() {
        let value = serde_json::to_value(Geometry::point(1.0, 2.0)).unwrap();
        assert_eq!(value, json!({"type": "Point", "coordinates": [1.0, 2.0]}));
    }

    #[test]
    fn test_polygon_geometry_json() {
        let ring = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        let value = serde_json::to_value(Geometry::polygon(vec![ring])).unwrap();

        assert_eq!(value["type"], "Polygon");
        assert_eq!(value["coordinates"][0][2], json!([1.0, 1.0]));
    }

    #[test]
    fn test_feature_collection_json() {
        let row = RowRecord::default().with("id", "a").with("x", 1.0);
        let fc = FeatureCollection::new(vec!["id".to_string(), "x".to_string()])
            .with_features(vec![Feature::new(Geometry::point(1.0, 2.0), row)]);

        let value = serde_json::to_value(&fc).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["columns"], json!(["id", "x"]));
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][0]["properties"]["id"], "a");
    }

    #[test]
    fn test_empty_collection_keeps_columns() {
        let fc = FeatureCollection::new(vec!["a".to_string()]);
        let value = serde_json::to_value(&fc).unwrap();

        assert_eq!(value["features"], json!([]));
        assert_eq!(value["columns"], json!(["a"]));
        assert!(fc.is_empty());
    }
}
