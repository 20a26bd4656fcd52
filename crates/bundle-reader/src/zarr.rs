//! Zarr bundle access over object storage.
//!
//! A [`ZarrBundle`] wraps an `object_store` client rooted at the bundle URL.
//! Hierarchy questions (what exists, what is listed, which attributes) are
//! answered from consolidated metadata when the bundle has it, otherwise by
//! probing metadata documents directly. Array reads go through `zarrs`, so
//! only the chunks intersecting a requested range are fetched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use feature_protocol::CellValue;
use futures::future::try_join_all;
use object_store::http::HttpBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{ClientOptions, ObjectStore};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use zarrs::array::{Array, ArrayMetadata, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs_object_store::AsyncObjectStore;

use crate::consolidated::{ConsolidatedMetadata, CONSOLIDATED_KEY};
use crate::error::{BundleError, Result};
use crate::layout::join_path;
use crate::source::BundleReference;
use crate::store::{BundleOpener, BundleStore, ChildEntry, NodeKind};

/// Storage type handed to `zarrs`.
pub type ZarrStore = AsyncObjectStore<Arc<dyn ObjectStore>>;

/// Zarr v3 node document (`zarr.json`), only the fields needed here.
#[derive(Debug, Deserialize)]
struct V3Node {
    node_type: String,
    #[serde(default)]
    attributes: Map<String, Value>,
}

/// HTTP client settings for bundle hosts.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout applied to every request to the bundle host.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// An opened zarr bundle.
pub struct ZarrBundle {
    reference: BundleReference,
    objects: Arc<dyn ObjectStore>,
    zarr: Arc<ZarrStore>,
    consolidated: Option<ConsolidatedMetadata>,
    /// Arrays opened so far, keyed by store path.
    arrays: RwLock<HashMap<String, Arc<Array<ZarrStore>>>>,
}

impl ZarrBundle {
    /// Open a bundle over HTTP(S).
    pub async fn open(reference: BundleReference, config: &ClientConfig) -> Result<Self> {
        let options = ClientOptions::new()
            .with_timeout(config.timeout)
            .with_allow_http(true);

        let store = HttpBuilder::new()
            .with_url(reference.as_str())
            .with_client_options(options)
            .build()
            .map_err(|e| {
                BundleError::upstream(format!("Failed to create HTTP client for {}: {}", reference, e))
            })?;

        Self::with_store(reference, Arc::new(store)).await
    }

    /// Open a bundle on an existing object store rooted at the bundle.
    pub async fn with_store(
        reference: BundleReference,
        objects: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        let consolidated = match get_optional(objects.as_ref(), CONSOLIDATED_KEY).await? {
            Some(bytes) => Some(ConsolidatedMetadata::from_slice(&bytes)?),
            None => None,
        };

        debug!(
            bundle = %reference,
            consolidated = consolidated.as_ref().map(|c| c.len()),
            "Opened bundle"
        );

        let zarr = Arc::new(AsyncObjectStore::new(objects.clone()));

        Ok(Self {
            reference,
            objects,
            zarr,
            consolidated,
            arrays: RwLock::new(HashMap::new()),
        })
    }

    pub fn reference(&self) -> &BundleReference {
        &self.reference
    }

    /// Whether the bundle ships consolidated metadata.
    pub fn is_consolidated(&self) -> bool {
        self.consolidated.is_some()
    }

    /// Read a node's metadata documents directly.
    async fn probe(&self, path: &str) -> Result<Option<(NodeKind, Map<String, Value>)>> {
        if let Some(bytes) = get_optional(self.objects.as_ref(), &join_path(path, "zarr.json")).await? {
            let node: V3Node = serde_json::from_slice(&bytes)?;
            let kind = match node.node_type.as_str() {
                "array" => NodeKind::Array,
                "group" => NodeKind::Group,
                other => {
                    return Err(BundleError::upstream(format!(
                        "malformed store metadata: unknown node_type '{}' at '{}'",
                        other, path
                    )))
                }
            };
            return Ok(Some((kind, node.attributes)));
        }

        let kind = if head_exists(self.objects.as_ref(), &join_path(path, ".zarray")).await? {
            NodeKind::Array
        } else if head_exists(self.objects.as_ref(), &join_path(path, ".zgroup")).await? {
            NodeKind::Group
        } else {
            return Ok(None);
        };

        let attrs = match get_optional(self.objects.as_ref(), &join_path(path, ".zattrs")).await? {
            Some(bytes) => match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(attrs) => attrs,
                _ => {
                    return Err(BundleError::upstream(format!(
                        "malformed store metadata: attributes of '{}' are not an object",
                        path
                    )))
                }
            },
            None => Map::new(),
        };

        Ok(Some((kind, attrs)))
    }

    /// The `.zarray` document of a v2 variable-length string array, with its
    /// fill value normalised. `None` for every other array.
    async fn v2_string_metadata(&self, path: &str) -> Result<Option<Value>> {
        let document = match &self.consolidated {
            Some(meta) => meta.array_metadata(path).cloned(),
            None => match get_optional(self.objects.as_ref(), &join_path(path, ".zarray")).await? {
                Some(bytes) => Some(serde_json::from_slice(&bytes)?),
                None => None,
            },
        };

        Ok(document.and_then(|mut document| {
            normalise_vlen_utf8(&mut document).then_some(document)
        }))
    }

    /// Open (or reuse) the array at `path`.
    async fn array(&self, path: &str) -> Result<Arc<Array<ZarrStore>>> {
        if let Some(array) = self.arrays.read().await.get(path) {
            return Ok(array.clone());
        }

        let node_path = format!("/{}", path.trim_matches('/'));
        let open_err = |e: zarrs::array::ArrayCreateError| {
            BundleError::upstream(format!("Failed to open array '{}': {}", path, e))
        };

        let array = match self.v2_string_metadata(path).await? {
            Some(metadata) => {
                let metadata: ArrayMetadata = serde_json::from_value(metadata).map_err(|e| {
                    BundleError::upstream(format!("malformed store metadata for '{}': {}", path, e))
                })?;
                Array::new_with_metadata(self.zarr.clone(), &node_path, metadata).map_err(open_err)?
            }
            None => Array::async_open(self.zarr.clone(), &node_path)
                .await
                .map_err(open_err)?,
        };

        if array.shape().len() != 1 {
            return Err(BundleError::upstream(format!(
                "array '{}' has shape {:?}, expected one dimension",
                path,
                array.shape()
            )));
        }

        let array = Arc::new(array);
        self.arrays
            .write()
            .await
            .insert(path.to_string(), array.clone());
        Ok(array)
    }
}

#[async_trait]
impl BundleStore for ZarrBundle {
    async fn node_kind(&self, path: &str) -> Result<Option<NodeKind>> {
        if let Some(meta) = &self.consolidated {
            return Ok(meta.node_kind(path));
        }
        Ok(self.probe(path).await?.map(|(kind, _)| kind))
    }

    #[instrument(skip(self), fields(bundle = %self.reference))]
    async fn list_children(&self, path: &str) -> Result<Vec<ChildEntry>> {
        if let Some(meta) = &self.consolidated {
            return Ok(meta.children(path));
        }

        let prefix = path.trim_matches('/');
        let prefix = (!prefix.is_empty()).then(|| ObjectPath::from(prefix));
        let listing = self.objects.list_with_delimiter(prefix.as_ref()).await?;

        let mut names: Vec<String> = listing
            .common_prefixes
            .iter()
            .filter_map(|p| p.filename().map(str::to_string))
            .collect();
        names.sort();

        let kinds = try_join_all(names.iter().map(|name| {
            let child_path = join_path(path, name);
            async move { self.probe(&child_path).await }
        }))
        .await?;

        Ok(names
            .into_iter()
            .zip(kinds)
            .filter_map(|(name, probed)| probed.map(|(kind, _)| ChildEntry::new(name, kind)))
            .collect())
    }

    async fn attributes(&self, path: &str) -> Result<Map<String, Value>> {
        if let Some(meta) = &self.consolidated {
            return meta.attributes(path);
        }
        Ok(self
            .probe(path)
            .await?
            .map(|(_, attrs)| attrs)
            .unwrap_or_default())
    }

    async fn array_len(&self, path: &str) -> Result<u64> {
        Ok(self.array(path).await?.shape()[0])
    }

    #[instrument(skip(self), fields(bundle = %self.reference))]
    async fn read_range(&self, path: &str, start: u64, end: u64) -> Result<Vec<CellValue>> {
        let array = self.array(path).await?;
        let end = end.min(array.shape()[0]);
        if start >= end {
            return Ok(Vec::new());
        }

        let subset = ArraySubset::new_with_ranges(&[start..end]);
        let read_err =
            |e: zarrs::array::ArrayError| BundleError::upstream(format!("Failed to read '{}': {}", path, e));

        macro_rules! elements {
            ($ty:ty, $map:expr) => {
                array
                    .async_retrieve_array_subset_elements::<$ty>(&subset)
                    .await
                    .map_err(read_err)?
                    .into_iter()
                    .map($map)
                    .collect::<Vec<CellValue>>()
            };
        }

        let values = match array.data_type() {
            DataType::Bool => elements!(bool, CellValue::Bool),
            DataType::Int8 => elements!(i8, |v| CellValue::Int(i64::from(v))),
            DataType::Int16 => elements!(i16, |v| CellValue::Int(i64::from(v))),
            DataType::Int32 => elements!(i32, |v| CellValue::Int(i64::from(v))),
            DataType::Int64 => elements!(i64, CellValue::Int),
            DataType::UInt8 => elements!(u8, |v| CellValue::Int(i64::from(v))),
            DataType::UInt16 => elements!(u16, |v| CellValue::Int(i64::from(v))),
            DataType::UInt32 => elements!(u32, |v| CellValue::Int(i64::from(v))),
            DataType::UInt64 => elements!(u64, |v: u64| i64::try_from(v)
                .map(CellValue::Int)
                .unwrap_or(CellValue::Float(v as f64))),
            DataType::Float32 => elements!(f32, |v| CellValue::Float(f64::from(v))),
            DataType::Float64 => elements!(f64, CellValue::Float),
            DataType::String => elements!(String, CellValue::Text),
            other => {
                return Err(BundleError::upstream(format!(
                    "array '{}' has unsupported data type {:?}",
                    path, other
                )))
            }
        };

        debug!(path, start, end, values = values.len(), "Read array range");
        Ok(values)
    }
}

/// Opens [`ZarrBundle`]s over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpBundleOpener {
    config: ClientConfig,
}

impl HttpBundleOpener {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BundleOpener for HttpBundleOpener {
    async fn open(&self, reference: &BundleReference) -> Result<Arc<dyn BundleStore>> {
        let bundle = ZarrBundle::open(reference.clone(), &self.config).await?;
        Ok(Arc::new(bundle))
    }
}

/// Object arrays written with the `vlen-utf8` filter often carry a numeric
/// or null fill value, which `zarrs` rejects for strings. Replace it with the
/// empty string. Returns whether `document` is such an array.
fn normalise_vlen_utf8(document: &mut Value) -> bool {
    let is_object_dtype = document.get("dtype").and_then(Value::as_str) == Some("|O");
    let has_vlen_utf8 = document
        .get("filters")
        .and_then(Value::as_array)
        .map_or(false, |filters| {
            filters
                .iter()
                .any(|f| f.get("id").and_then(Value::as_str) == Some("vlen-utf8"))
        });

    if !(is_object_dtype && has_vlen_utf8) {
        return false;
    }
    if let Some(object) = document.as_object_mut() {
        if !object.get("fill_value").map_or(false, Value::is_string) {
            object.insert("fill_value".to_string(), Value::String(String::new()));
        }
    }
    true
}

/// Fetch a whole object, `None` if it does not exist.
async fn get_optional(store: &dyn ObjectStore, key: &str) -> Result<Option<Bytes>> {
    match store.get(&ObjectPath::from(key)).await {
        Ok(result) => Ok(Some(result.bytes().await?)),
        Err(object_store::Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn head_exists(store: &dyn ObjectStore, key: &str) -> Result<bool> {
    match store.head(&ObjectPath::from(key)).await {
        Ok(_) => Ok(true),
        Err(object_store::Error::NotFound { .. }) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
