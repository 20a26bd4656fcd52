//! Table reads: table resolution, column order resolution and column reads
//! in one call.

use feature_protocol::CellValue;

use crate::column::read_columns;
use crate::error::Result;
use crate::layout::BundleLayout;
use crate::store::BundleStore;
use crate::table::{resolve_column_order, resolve_table, ColumnOrder};

/// The first rows of one observation table.
#[derive(Debug, Clone)]
pub struct TableSlice {
    /// Name of the table that was read.
    pub table: String,
    /// Resolved column order.
    pub order: ColumnOrder,
    /// Column-major values; `values[i]` belongs to `order.columns[i]`.
    pub values: Vec<Vec<CellValue>>,
}

impl TableSlice {
    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.order.names()
    }
}

/// Read at most `limit` rows of a table.
pub async fn read_table(
    store: &dyn BundleStore,
    layout: &BundleLayout,
    table_override: Option<&str>,
    limit: u64,
) -> Result<TableSlice> {
    let table = resolve_table(store, layout, table_override).await?;
    let order = resolve_column_order(store, layout, &table).await?;

    tracing::debug!(
        table = %table,
        columns = order.len(),
        source = ?order.source,
        limit,
        "Resolved table"
    );

    let values = read_columns(store, &layout.observation_path(&table), &order.columns, limit).await?;

    Ok(TableSlice {
        table,
        order,
        values,
    })
}
