//! Feature assembly.
//!
//! Joins per-column value vectors back into rows by index, resolves each
//! row's geometry and keeps the rows that have one, in row order.

use crate::geojson::{Feature, FeatureCollection};
use crate::geometry::{resolve_geometry, GeometryFields};
use crate::types::{CellValue, RowRecord};

/// Result of assembling a feature collection, with row accounting.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// The assembled collection.
    pub collection: FeatureCollection,
    /// Number of rows visited.
    pub rows_read: usize,
    /// Rows without a usable geometry.
    pub rows_dropped: usize,
}

impl Assembly {
    /// Assemble features from column-major values.
    ///
    /// `values[i]` holds the cells of `columns[i]`. The row count is the
    /// longest column; cells missing from a shorter column are null.
    pub fn run(columns: &[String], values: &[Vec<CellValue>], fields: &GeometryFields) -> Self {
        debug_assert_eq!(columns.len(), values.len());

        let rows_read = values.iter().map(Vec::len).max().unwrap_or(0);
        let mut features = Vec::with_capacity(rows_read);

        for row_idx in 0..rows_read {
            let mut row = RowRecord::with_capacity(columns.len());
            for (name, column) in columns.iter().zip(values) {
                let cell = column.get(row_idx).cloned().unwrap_or(CellValue::Null);
                row.push(name.clone(), cell);
            }

            if let Some(geometry) = resolve_geometry(&row, fields) {
                features.push(Feature::new(geometry, row));
            }
        }

        let rows_dropped = rows_read - features.len();
        if rows_dropped > 0 {
            tracing::debug!(rows_read, rows_dropped, "Rows dropped without geometry");
        }

        Self {
            collection: FeatureCollection::new(columns.to_vec()).with_features(features),
            rows_read,
            rows_dropped,
        }
    }
}

/// Assemble features from column-major values, discarding row accounting.
pub fn assemble(
    columns: &[String],
    values: &[Vec<CellValue>],
    fields: &GeometryFields,
) -> FeatureCollection {
    Assembly::run(columns, values, fields).collection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::Geometry;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rows_keep_order_and_all_columns() {
        let columns = names(&["cell_id", "x", "y"]);
        let values: Vec<Vec<CellValue>> = vec![
            vec!["a".into(), "b".into(), "c".into()],
            vec![1.0.into(), 2.0.into(), 3.0.into()],
            vec![10.0.into(), 20.0.into(), 30.0.into()],
        ];

        let fc = assemble(&columns, &values, &GeometryFields::default());

        assert_eq!(fc.len(), 3);
        let ids: Vec<_> = fc
            .features
            .iter()
            .map(|f| f.properties.get("cell_id").and_then(CellValue::as_str).unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(fc.features[1].geometry, Geometry::point(2.0, 20.0));
        assert_eq!(fc.features[2].properties.len(), 3);
    }

    #[test]
    fn test_malformed_rows_are_dropped_without_gaps() {
        let columns = names(&["cell_id", "polygon_wkt"]);
        let values: Vec<Vec<CellValue>> = vec![
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                "POLYGON ((0 0, 1 0, 1 1, 0 0))".into(),
                "POLYGON ((broken".into(),
                "POLYGON ((2 2, 3 2, 3 3, 2 2))".into(),
            ],
        ];

        let assembly = Assembly::run(&columns, &values, &GeometryFields::default());
        let fc = &assembly.collection;

        assert_eq!(assembly.rows_read, 3);
        assert_eq!(assembly.rows_dropped, 1);
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.features[0].properties.get("cell_id"), Some(&CellValue::from("a")));
        assert_eq!(fc.features[1].properties.get("cell_id"), Some(&CellValue::from("c")));
        assert_eq!(fc.columns, columns);
    }

    #[test]
    fn test_columns_reported_when_every_row_dropped() {
        let columns = names(&["label"]);
        let values: Vec<Vec<CellValue>> = vec![vec!["only text".into(), "more text".into()]];

        let fc = assemble(&columns, &values, &GeometryFields::default());

        assert!(fc.is_empty());
        assert_eq!(fc.columns, columns);
    }

    #[test]
    fn test_short_columns_pad_with_null() {
        let columns = names(&["x", "y", "note"]);
        let values: Vec<Vec<CellValue>> = vec![
            vec![1.0.into(), 2.0.into()],
            vec![1.0.into(), 2.0.into()],
            vec!["first".into()],
        ];

        let fc = assemble(&columns, &values, &GeometryFields::default());

        assert_eq!(fc.len(), 2);
        assert_eq!(fc.features[1].properties.get("note"), Some(&CellValue::Null));
    }

    #[test]
    fn test_no_rows() {
        let columns = names(&["x", "y"]);
        let values: Vec<Vec<CellValue>> = vec![vec![], vec![]];

        let assembly = Assembly::run(&columns, &values, &GeometryFields::default());
        assert_eq!(assembly.rows_read, 0);
        assert!(assembly.collection.is_empty());
    }
}
