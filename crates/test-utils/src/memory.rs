//! In-memory bundle store for tests.
//!
//! [`MemoryBundle`] implements [`BundleStore`] over a map of paths to
//! groups and arrays, counting every call so tests can assert how much
//! work a request did. [`MemoryOpener`] hands the same bundle out for any
//! reference and counts opens.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bundle_reader::layout::join_path;
use bundle_reader::{
    BundleError, BundleLayout, BundleOpener, BundleReference, BundleStore, ChildEntry, NodeKind,
    Result,
};
use feature_protocol::CellValue;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone)]
enum MemoryNode {
    Group(Map<String, Value>),
    Array(Vec<CellValue>),
}

/// A bundle held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBundle {
    nodes: BTreeMap<String, MemoryNode>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    metadata_calls: AtomicUsize,
    read_calls: AtomicUsize,
    reads: Mutex<Vec<(String, u64, u64)>>,
}

impl MemoryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group with the given attributes (a JSON object, or null).
    pub fn with_group(mut self, path: &str, attrs: Value) -> Self {
        let attrs = match attrs {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.insert_parents(path);
        self.nodes.insert(trim(path), MemoryNode::Group(attrs));
        self
    }

    /// Add a one-dimensional array.
    pub fn with_array(mut self, path: &str, values: Vec<CellValue>) -> Self {
        self.insert_parents(path);
        self.nodes.insert(trim(path), MemoryNode::Array(values));
        self
    }

    /// Make reads of the array at `path` fail with an upstream error.
    pub fn with_failing_array(mut self, path: &str) -> Self {
        self.failing.insert(trim(path));
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// A bundle with one table under the default layout, declaring its
    /// column order.
    pub fn with_table(self, table: &str, columns: Vec<(&str, Vec<CellValue>)>) -> Self {
        let order: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        self.with_table_attrs(table, json!({ "column-order": order }), columns)
    }

    /// A bundle with one table whose observation root carries `attrs`.
    pub fn with_table_attrs(
        self,
        table: &str,
        attrs: Value,
        columns: Vec<(&str, Vec<CellValue>)>,
    ) -> Self {
        let obs = BundleLayout::default().observation_path(table);
        let mut bundle = self.with_group(&obs, attrs);
        for (name, values) in columns {
            bundle = bundle.with_array(&join_path(&obs, name), values);
        }
        bundle
    }

    /// Number of metadata calls (kind, listing, attributes, length).
    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::Relaxed)
    }

    /// Number of range reads.
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::Relaxed)
    }

    /// Every range read as `(path, start, end)`, in call order.
    pub fn reads(&self) -> Vec<(String, u64, u64)> {
        self.reads.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn insert_parents(&mut self, path: &str) {
        let path = trim(path);
        let mut parent = String::new();
        for part in path.split('/').take(path.split('/').count().saturating_sub(1)) {
            parent = join_path(&parent, part);
            self.nodes
                .entry(parent.clone())
                .or_insert_with(|| MemoryNode::Group(Map::new()));
        }
    }

    async fn enter(&self, counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn array(&self, path: &str) -> Result<&Vec<CellValue>> {
        match self.nodes.get(&trim(path)) {
            Some(MemoryNode::Array(values)) => Ok(values),
            _ => Err(BundleError::upstream(format!("no array at '{}'", path))),
        }
    }
}

#[async_trait]
impl BundleStore for MemoryBundle {
    async fn node_kind(&self, path: &str) -> Result<Option<NodeKind>> {
        self.enter(&self.metadata_calls).await;
        let path = trim(path);
        if path.is_empty() {
            return Ok(Some(NodeKind::Group));
        }
        Ok(self.nodes.get(&path).map(|node| match node {
            MemoryNode::Group(_) => NodeKind::Group,
            MemoryNode::Array(_) => NodeKind::Array,
        }))
    }

    async fn list_children(&self, path: &str) -> Result<Vec<ChildEntry>> {
        self.enter(&self.metadata_calls).await;
        let parent = trim(path);
        Ok(self
            .nodes
            .iter()
            .filter_map(|(key, node)| {
                let name = if parent.is_empty() {
                    key.as_str()
                } else {
                    key.strip_prefix(&parent)?.strip_prefix('/')?
                };
                if name.is_empty() || name.contains('/') {
                    return None;
                }
                let kind = match node {
                    MemoryNode::Group(_) => NodeKind::Group,
                    MemoryNode::Array(_) => NodeKind::Array,
                };
                Some(ChildEntry::new(name, kind))
            })
            .collect())
    }

    async fn attributes(&self, path: &str) -> Result<Map<String, Value>> {
        self.enter(&self.metadata_calls).await;
        Ok(match self.nodes.get(&trim(path)) {
            Some(MemoryNode::Group(attrs)) => attrs.clone(),
            _ => Map::new(),
        })
    }

    async fn array_len(&self, path: &str) -> Result<u64> {
        self.enter(&self.metadata_calls).await;
        Ok(self.array(path)?.len() as u64)
    }

    async fn read_range(&self, path: &str, start: u64, end: u64) -> Result<Vec<CellValue>> {
        self.enter(&self.read_calls).await;
        if let Ok(mut reads) = self.reads.lock() {
            reads.push((trim(path), start, end));
        }
        if self.failing.contains(&trim(path)) {
            return Err(BundleError::upstream(format!("connection reset reading '{}'", path)));
        }

        let values = self.array(path)?;
        let end = (end as usize).min(values.len());
        let start = (start as usize).min(end);
        Ok(values[start..end].to_vec())
    }
}

/// Opens the same [`MemoryBundle`] for every reference.
#[derive(Debug, Default)]
pub struct MemoryOpener {
    bundle: Option<Arc<MemoryBundle>>,
    opens: AtomicUsize,
}

impl MemoryOpener {
    pub fn new(bundle: MemoryBundle) -> Self {
        Self {
            bundle: Some(Arc::new(bundle)),
            opens: AtomicUsize::new(0),
        }
    }

    /// An opener whose every open fails as an unreachable host.
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// The served bundle, for inspecting its counters.
    pub fn bundle(&self) -> Option<&Arc<MemoryBundle>> {
        self.bundle.as_ref()
    }

    /// Number of opens so far.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BundleOpener for MemoryOpener {
    async fn open(&self, reference: &BundleReference) -> Result<Arc<dyn BundleStore>> {
        self.opens.fetch_add(1, Ordering::Relaxed);
        match &self.bundle {
            Some(bundle) => Ok(bundle.clone() as Arc<dyn BundleStore>),
            None => Err(BundleError::upstream(format!(
                "error sending request for url ({}): connection refused",
                reference
            ))),
        }
    }
}

fn trim(path: &str) -> String {
    path.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parents_are_created() {
        let bundle = MemoryBundle::new().with_array("tables/cells/obs/x", vec![CellValue::Float(1.0)]);

        assert_eq!(bundle.node_kind("tables").await.unwrap(), Some(NodeKind::Group));
        assert_eq!(bundle.node_kind("tables/cells/obs/x").await.unwrap(), Some(NodeKind::Array));
        assert_eq!(bundle.node_kind("tables/missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lists_direct_children_only() {
        let bundle = MemoryBundle::new()
            .with_array("tables/a/obs/x", vec![])
            .with_group("tables/b", Value::Null);

        let children = bundle.list_children("tables").await.unwrap();
        assert_eq!(
            children,
            vec![ChildEntry::new("a", NodeKind::Group), ChildEntry::new("b", NodeKind::Group)]
        );
        assert_eq!(bundle.list_children("").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_read_range_is_clamped_and_recorded() {
        let values = (0..5).map(CellValue::Int).collect();
        let bundle = MemoryBundle::new().with_array("a", values);

        let read = bundle.read_range("a", 3, 100).await.unwrap();
        assert_eq!(read, vec![CellValue::Int(3), CellValue::Int(4)]);
        assert_eq!(bundle.read_calls(), 1);
        assert_eq!(bundle.reads(), vec![("a".to_string(), 3, 100)]);
    }

    #[tokio::test]
    async fn test_unreachable_opener() {
        let opener = MemoryOpener::unreachable();
        let reference = BundleReference::parse("https://example.org/a.zarr").unwrap();

        let err = opener.open(&reference).await.err().unwrap();
        assert!(matches!(err, BundleError::Upstream(_)));
        assert_eq!(opener.opens(), 1);
    }
}
