//! Internal layout of a spatial bundle.
//!
//! ```text
//! <bundle>/
//!   tables/                   tables root
//!     <table>/
//!       obs/                  observation root, carries "column-order"
//!         _index              hidden (reserved prefix)
//!         cell_id, x, y, ...  one array per column
//! ```

use serde::{Deserialize, Serialize};

/// Where tables and their columns live inside a bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleLayout {
    /// Group holding one child group per table.
    #[serde(default = "default_tables_root")]
    pub tables_root: String,

    /// Group under each table holding the observation columns.
    #[serde(default = "default_observation_group")]
    pub observation_group: String,

    /// Attribute on the observation group listing the column order.
    #[serde(default = "default_column_order_attribute")]
    pub column_order_attribute: String,

    /// Names starting with this prefix are metadata, not columns.
    #[serde(default = "default_hidden_prefix")]
    pub hidden_prefix: String,
}

impl Default for BundleLayout {
    fn default() -> Self {
        Self {
            tables_root: default_tables_root(),
            observation_group: default_observation_group(),
            column_order_attribute: default_column_order_attribute(),
            hidden_prefix: default_hidden_prefix(),
        }
    }
}

fn default_tables_root() -> String {
    "tables".to_string()
}

fn default_observation_group() -> String {
    "obs".to_string()
}

fn default_column_order_attribute() -> String {
    "column-order".to_string()
}

fn default_hidden_prefix() -> String {
    "_".to_string()
}

impl BundleLayout {
    /// Path of a table group.
    pub fn table_path(&self, table: &str) -> String {
        join_path(&self.tables_root, table)
    }

    /// Path of a table's observation root.
    pub fn observation_path(&self, table: &str) -> String {
        join_path(&self.table_path(table), &self.observation_group)
    }

    /// Whether a child name is reserved metadata rather than a column.
    pub fn is_hidden(&self, name: &str) -> bool {
        !self.hidden_prefix.is_empty() && name.starts_with(&self.hidden_prefix)
    }
}

/// Join two store-relative paths with a single '/'.
pub fn join_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_matches('/');
    let child = child.trim_matches('/');
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (_, true) => parent.to_string(),
        _ => format!("{}/{}", parent, child),
    }
}
