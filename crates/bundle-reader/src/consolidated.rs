//! Consolidated zarr v2 metadata (`.zmetadata`).
//!
//! A single document at the bundle root holding every `.zgroup`, `.zarray`
//! and `.zattrs` of the hierarchy, keyed by store path. When a bundle ships
//! one, listing and attribute reads need no further requests, which matters
//! over plain HTTP where directory listing is often unavailable.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{BundleError, Result};
use crate::layout::join_path;
use crate::store::{ChildEntry, NodeKind};

/// Key of the consolidated metadata document.
pub const CONSOLIDATED_KEY: &str = ".zmetadata";

#[derive(Debug, Deserialize)]
struct ConsolidatedDocument {
    metadata: BTreeMap<String, Value>,
}

/// Parsed consolidated metadata.
#[derive(Debug, Clone, Default)]
pub struct ConsolidatedMetadata {
    entries: BTreeMap<String, Value>,
}

impl ConsolidatedMetadata {
    /// Parse the raw `.zmetadata` document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let document: ConsolidatedDocument = serde_json::from_slice(bytes)?;
        Ok(Self {
            entries: document.metadata,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kind of the node at `path`.
    pub fn node_kind(&self, path: &str) -> Option<NodeKind> {
        if self.entries.contains_key(&join_path(path, ".zarray")) {
            Some(NodeKind::Array)
        } else if self.entries.contains_key(&join_path(path, ".zgroup")) {
            Some(NodeKind::Group)
        } else {
            None
        }
    }

    /// Raw `.zarray` document of the array at `path`.
    pub fn array_metadata(&self, path: &str) -> Option<&Value> {
        self.entries.get(&join_path(path, ".zarray"))
    }

    /// Direct children of the group at `path`, sorted by name.
    pub fn children(&self, path: &str) -> Vec<ChildEntry> {
        let path = path.trim_matches('/');
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        };

        let mut children = BTreeMap::new();
        for key in self.entries.keys() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            let Some((name, document)) = rest.split_once('/') else {
                continue;
            };
            let kind = match document {
                ".zarray" => NodeKind::Array,
                ".zgroup" => NodeKind::Group,
                _ => continue,
            };
            children.insert(name.to_string(), kind);
        }

        children
            .into_iter()
            .map(|(name, kind)| ChildEntry::new(name, kind))
            .collect()
    }

    /// Attributes of the node at `path`; empty if it has none.
    pub fn attributes(&self, path: &str) -> Result<Map<String, Value>> {
        match self.entries.get(&join_path(path, ".zattrs")) {
            None => Ok(Map::new()),
            Some(Value::Object(attrs)) => Ok(attrs.clone()),
            Some(_) => Err(BundleError::upstream(format!(
                "malformed store metadata: attributes of '{}' are not an object",
                path
            ))),
        }
    }
}
