//! Remote Spatial Bundle Reader
//!
//! Reads the leading rows of observation tables stored in remote, chunked
//! zarr bundles, fetching only what a request needs:
//!
//! - **Source validation**: only absolute `http`/`https` URLs, checked
//!   before any I/O
//! - **Layout discovery**: default table and column order from the
//!   bundle's own metadata
//! - **Partial reads**: each column is read as a bounded prefix, chunk by
//!   chunk, never as a whole array
//!
//! # Architecture
//!
//! ```text
//! raw url ──► validate_source ──► BundleReference
//!                                      │
//!                                      ▼
//!                     BundleOpener::open ──► dyn BundleStore
//!                                                 │
//!                  resolve_table ◄────────────────┤
//!                        │                        │
//!                        ▼                        │
//!              resolve_column_order ◄─────────────┤
//!                        │                        │
//!                        ▼                        │
//!                  read_columns ◄─────────────────┘  (concurrent, per column)
//!                        │
//!                        ▼
//!                    TableSlice
//! ```
//!
//! # Example
//!
//! ```ignore
//! use bundle_reader::{read_table, validate_source, BundleLayout, ClientConfig, ZarrBundle};
//!
//! let reference = validate_source("https://data.example.org/sample.zarr")?;
//! let bundle = ZarrBundle::open(reference, &ClientConfig::default()).await?;
//! let slice = read_table(&bundle, &BundleLayout::default(), None, 100).await?;
//! ```

pub mod column;
pub mod consolidated;
pub mod error;
pub mod layout;
pub mod reader;
pub mod source;
pub mod store;
pub mod table;
pub mod zarr;

// Re-export commonly used types at crate root
pub use column::{read_column, read_columns};
pub use consolidated::ConsolidatedMetadata;
pub use error::{BundleError, Result};
pub use layout::BundleLayout;
pub use reader::{read_table, TableSlice};
pub use source::{validate_source, BundleReference};
pub use store::{BundleOpener, BundleStore, ChildEntry, NodeKind};
pub use table::{
    declared_column_order, listed_column_order, resolve_column_order, resolve_table,
    ColumnDescriptor, ColumnOrder, OrderSource,
};
pub use zarr::{ClientConfig, HttpBundleOpener, ZarrBundle};
