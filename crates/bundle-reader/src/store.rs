//! Bundle accessor abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use feature_protocol::CellValue;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::source::BundleReference;

/// Kind of a node inside a chunked-array store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A directory-like group.
    Group,
    /// A chunked array.
    Array,
}

/// A named child of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub kind: NodeKind,
}

impl ChildEntry {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Read access to one opened bundle.
///
/// Paths are store-relative and slash separated, without a leading slash
/// (`"tables/cells/obs"`); the empty string is the bundle root. Every call
/// may suspend on the network.
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Kind of the node at `path`, or `None` if nothing is there.
    async fn node_kind(&self, path: &str) -> Result<Option<NodeKind>>;

    /// Whether a group or array exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.node_kind(path).await?.is_some())
    }

    /// Children of the group at `path`, in a stable order.
    async fn list_children(&self, path: &str) -> Result<Vec<ChildEntry>>;

    /// User attributes of the node at `path` (empty when none).
    async fn attributes(&self, path: &str) -> Result<Map<String, Value>>;

    /// Length of the one-dimensional array at `path`.
    async fn array_len(&self, path: &str) -> Result<u64>;

    /// Elements `[start, end)` of the array at `path`.
    ///
    /// `end` is clamped to the array length. Only the chunks covering the
    /// range are fetched.
    async fn read_range(&self, path: &str, start: u64, end: u64) -> Result<Vec<CellValue>>;
}

/// Opens bundles for validated references.
#[async_trait]
pub trait BundleOpener: Send + Sync {
    async fn open(&self, reference: &BundleReference) -> Result<Arc<dyn BundleStore>>;
}
