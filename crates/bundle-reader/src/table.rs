//! Table and column order resolution.
//!
//! The table defaults to the first group under the tables root. Column order
//! is taken from the declared order attribute when present and non-empty,
//! otherwise from listing the observation root.

use serde_json::Value;

use crate::error::{BundleError, Result};
use crate::layout::BundleLayout;
use crate::store::{BundleStore, NodeKind};

/// A column name and its position in the resolved order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub position: usize,
}

/// Where a column order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource {
    /// The declared order attribute.
    Declared,
    /// Directory listing of the observation root.
    Listing,
}

/// Resolved column order of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnOrder {
    pub columns: Vec<ColumnDescriptor>,
    pub source: OrderSource,
}

impl ColumnOrder {
    fn new(names: Vec<String>, source: OrderSource) -> Self {
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(position, name)| ColumnDescriptor { name, position })
            .collect();
        Self { columns, source }
    }

    /// Column names in order.
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Pick the table to read.
///
/// An explicit name is used unchecked; a missing table surfaces later when
/// its columns are resolved.
pub async fn resolve_table(
    store: &dyn BundleStore,
    layout: &BundleLayout,
    table_override: Option<&str>,
) -> Result<String> {
    if let Some(table) = table_override.filter(|t| !t.is_empty()) {
        return Ok(table.to_string());
    }

    if !store.exists(&layout.tables_root).await? {
        return Err(BundleError::structure(format!(
            "no table found: '{}' is missing",
            layout.tables_root
        )));
    }

    store
        .list_children(&layout.tables_root)
        .await?
        .into_iter()
        .find(|child| child.kind == NodeKind::Group)
        .map(|child| child.name)
        .ok_or_else(|| {
            BundleError::structure(format!(
                "no table found under '{}'",
                layout.tables_root
            ))
        })
}

/// Column order from the declared order attribute, if present and non-empty.
pub async fn declared_column_order(
    store: &dyn BundleStore,
    layout: &BundleLayout,
    observation_path: &str,
) -> Result<Option<Vec<String>>> {
    let attrs = store.attributes(observation_path).await?;

    let names = match attrs.get(&layout.column_order_attribute) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<String>>>()
            .ok_or_else(|| {
                BundleError::upstream(format!(
                    "malformed store metadata: '{}' on '{}' must list strings",
                    layout.column_order_attribute, observation_path
                ))
            })?,
        Some(other) => {
            return Err(BundleError::upstream(format!(
                "malformed store metadata: '{}' on '{}' is {}, expected a list",
                layout.column_order_attribute, observation_path, other
            )))
        }
    };

    Ok((!names.is_empty()).then_some(names))
}

/// Column order from listing the observation root: arrays only, hidden
/// names excluded, listing order kept.
pub async fn listed_column_order(
    store: &dyn BundleStore,
    layout: &BundleLayout,
    observation_path: &str,
) -> Result<Vec<String>> {
    Ok(store
        .list_children(observation_path)
        .await?
        .into_iter()
        .filter(|child| child.kind == NodeKind::Array && !layout.is_hidden(&child.name))
        .map(|child| child.name)
        .collect())
}

/// Resolve the column order of `table`.
pub async fn resolve_column_order(
    store: &dyn BundleStore,
    layout: &BundleLayout,
    table: &str,
) -> Result<ColumnOrder> {
    let observation_path = layout.observation_path(table);

    if let Some(names) = declared_column_order(store, layout, &observation_path).await? {
        return Ok(ColumnOrder::new(names, OrderSource::Declared));
    }

    let names = listed_column_order(store, layout, &observation_path).await?;
    if names.is_empty() {
        return Err(BundleError::structure(format!(
            "no columns found in table '{}'",
            table
        )));
    }

    Ok(ColumnOrder::new(names, OrderSource::Listing))
}
