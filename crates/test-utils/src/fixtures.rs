//! Common test fixtures for feature-service tests.
//!
//! This module provides pre-defined bundles and geometry text that
//! represent the shapes of data the service meets in practice.

use feature_protocol::CellValue;

use crate::memory::MemoryBundle;

/// Bundle URLs that pass or fail source validation.
pub mod urls {
    /// A well-formed HTTPS bundle URL.
    pub const HTTPS_BUNDLE: &str = "https://data.example.org/spatial/sample.zarr";

    /// A well-formed plain HTTP bundle URL.
    pub const HTTP_BUNDLE: &str = "http://localhost:9000/bucket/sample.zarr";

    /// Local file URL (must be rejected before any I/O).
    pub const LOCAL_FILE: &str = "file:///etc/passwd";

    /// Relative path, no scheme.
    pub const RELATIVE: &str = "data/sample.zarr";
}

/// Polygon text samples.
pub mod wkt {
    /// Closed unit square.
    pub const UNIT_SQUARE: &str = "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))";

    /// Square with a square hole.
    pub const SQUARE_WITH_HOLE: &str =
        "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 4 2, 4 4, 2 4, 2 2))";

    /// Ring that does not close.
    pub const OPEN_RING: &str = "POLYGON ((0 0, 1 0, 1 1, 0 1))";

    /// Not polygon text at all.
    pub const GARBAGE: &str = "not a polygon";
}

/// Name of the table in [`cells_bundle`].
pub const CELLS_TABLE: &str = "cells";

/// Columns of [`cells_bundle`], in declared order.
pub const CELLS_COLUMNS: [&str; 5] = ["cell_id", "x", "y", "area", "polygon_wkt"];

/// A segmentation-style table of five cells.
///
/// Rows 0..=2 have polygons, row 3 has only a point and row 4 has neither
/// (garbage polygon text and a null `x`), so it is dropped.
pub fn cells_bundle() -> MemoryBundle {
    MemoryBundle::new().with_table(
        CELLS_TABLE,
        vec![
            ("cell_id", texts(&["c0", "c1", "c2", "c3", "c4"])),
            (
                "x",
                vec![
                    CellValue::Float(0.5),
                    CellValue::Float(1.5),
                    CellValue::Float(2.5),
                    CellValue::Float(3.5),
                    CellValue::Null,
                ],
            ),
            ("y", floats(&[0.5, 1.5, 2.5, 3.5, 4.5])),
            ("area", floats(&[1.0, 1.0, 100.0, 0.0, 0.0])),
            (
                "polygon_wkt",
                vec![
                    CellValue::from(wkt::UNIT_SQUARE),
                    CellValue::from("POLYGON ((1 1, 2 1, 2 2, 1 2, 1 1))"),
                    CellValue::from(wkt::SQUARE_WITH_HOLE),
                    CellValue::Null,
                    CellValue::from(wkt::GARBAGE),
                ],
            ),
        ],
    )
}

/// A table of `rows` points with an `_index` column and no declared order.
pub fn points_bundle(table: &str, rows: usize) -> MemoryBundle {
    let xs: Vec<f64> = (0..rows).map(|i| i as f64).collect();
    let ys: Vec<f64> = (0..rows).map(|i| -(i as f64)).collect();
    let ids: Vec<String> = (0..rows).map(|i| format!("p{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    MemoryBundle::new().with_table_attrs(
        table,
        serde_json::Value::Null,
        vec![
            ("_index", texts(&id_refs)),
            ("x", floats(&xs)),
            ("y", floats(&ys)),
        ],
    )
}

/// Float cells.
pub fn floats(values: &[f64]) -> Vec<CellValue> {
    values.iter().copied().map(CellValue::Float).collect()
}

/// Text cells.
pub fn texts(values: &[&str]) -> Vec<CellValue> {
    values.iter().copied().map(CellValue::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundle_reader::BundleStore;

    #[test]
    fn test_cells_bundle_declares_order() {
        let bundle = cells_bundle();
        let attrs = tokio_test::block_on(bundle.attributes("tables/cells/obs")).unwrap();
        let order: Vec<&str> = attrs["column-order"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(order, CELLS_COLUMNS);
    }

    #[tokio::test]
    async fn test_points_bundle_has_hidden_index() {
        let bundle = points_bundle("spots", 3);
        let names: Vec<String> = bundle
            .list_children("tables/spots/obs")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["_index", "x", "y"]);
    }
}
