//! Column reads.
//!
//! Each column is read independently as the prefix `[0, min(limit, len))`.
//! Reads are issued concurrently and joined by column position, so the
//! result order never depends on completion order. Any failing column
//! fails the whole read.

use feature_protocol::CellValue;
use futures::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use crate::error::{BundleError, Result};
use crate::layout::join_path;
use crate::store::{BundleStore, NodeKind};
use crate::table::ColumnDescriptor;

/// Attribute naming a group-encoded column's encoding.
const ENCODING_TYPE: &str = "encoding-type";

/// Read the first `limit` rows of every column under `observation_path`.
///
/// `result[i]` holds the values of `columns[i]`.
pub async fn read_columns(
    store: &dyn BundleStore,
    observation_path: &str,
    columns: &[ColumnDescriptor],
    limit: u64,
) -> Result<Vec<Vec<CellValue>>> {
    try_join_all(
        columns
            .iter()
            .map(|column| read_column(store, observation_path, &column.name, limit)),
    )
    .await
}

/// Read the first `limit` rows of one column.
pub async fn read_column(
    store: &dyn BundleStore,
    observation_path: &str,
    name: &str,
    limit: u64,
) -> Result<Vec<CellValue>> {
    let path = join_path(observation_path, name);

    let values = match store.node_kind(&path).await? {
        Some(NodeKind::Array) => read_prefix(store, &path, limit).await?,
        Some(NodeKind::Group) => read_encoded_group(store, &path, limit).await?,
        None => {
            return Err(BundleError::upstream(format!(
                "column '{}' not found at '{}'",
                name, path
            )))
        }
    };

    debug!(column = name, rows = values.len(), "Read column");
    Ok(values)
}

async fn read_prefix(store: &dyn BundleStore, path: &str, limit: u64) -> Result<Vec<CellValue>> {
    let len = store.array_len(path).await?;
    store.read_range(path, 0, limit.min(len)).await
}

/// Read a column stored as a group, which only categoricals are.
async fn read_encoded_group(
    store: &dyn BundleStore,
    path: &str,
    limit: u64,
) -> Result<Vec<CellValue>> {
    let attrs = store.attributes(path).await?;
    match attrs.get(ENCODING_TYPE).and_then(Value::as_str) {
        Some("categorical") => read_categorical(store, path, limit).await,
        other => Err(BundleError::upstream(format!(
            "column group '{}' has unsupported encoding {:?}",
            path, other
        ))),
    }
}

/// Decode a categorical column from its `codes` and `categories` arrays.
async fn read_categorical(
    store: &dyn BundleStore,
    path: &str,
    limit: u64,
) -> Result<Vec<CellValue>> {
    let codes_path = join_path(path, "codes");
    let categories_path = join_path(path, "categories");

    let (codes, categories) = futures::try_join!(
        read_prefix(store, &codes_path, limit),
        read_prefix(store, &categories_path, u64::MAX),
    )?;

    Ok(codes
        .into_iter()
        .map(|code| match code {
            CellValue::Int(code) => usize::try_from(code)
                .ok()
                .and_then(|idx| categories.get(idx))
                .cloned()
                .unwrap_or(CellValue::Null),
            _ => CellValue::Null,
        })
        .collect())
}
