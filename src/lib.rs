//! # docweave
//!
//! Push-based dataflow graphs for the documents of a data-acquisition run.
//!
//! A run is a sequence of typed documents: a `start`, one or more
//! `descriptor`s, the `event`s they describe and a closing `stop`. Documents
//! are injected at source nodes and pushed synchronously through transforms
//! and joins to the sinks below them.
//!
//! ## Key Features
//!
//! - **Kind-aware transforms**: map, filter and scan touch only events
//! - **Joins**: zip, bundle and combine_latest align documents from several
//!   upstreams with bounded per-upstream buffers and backpressure
//! - **Failures as data**: a failing user function produces a failed event
//!   instead of stopping the graph
//! - **Zero-Copy**: document bodies are shared by `Arc`
//!
//! ## Quick Start
//!
//! ```rust
//! use docweave::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let source = Arc::new(SourceNode::<i64>::new("src"));
//! let double = Arc::new(MapNode::new("double", "src", map_fn(|x: &i64| Ok(x * 2))));
//! let out = Arc::new(CollectNode::<i64>::new("out", "double"));
//! source.connect(double.clone());
//! double.connect(out.clone());
//!
//! source.emit(Document::start(0)).await?;
//! source.emit(Document::event(21)).await?;
//! assert_eq!(out.payloads().await, vec![0, 42]);
//! # Ok::<(), StreamError>(())
//! # }).unwrap();
//! ```

#![deny(missing_docs)]

/// Document envelopes, kinds and data-level failures.
pub mod document;
/// Structural errors.
pub mod error;
/// Named node registry and wiring.
pub mod graph;
/// Tracing subscriber setup.
pub mod logging;
/// The push protocol shared by every node.
pub mod node;
/// Built-in nodes.
pub mod nodes;
/// Capabilities a payload type may implement.
pub mod payload;

#[cfg(test)]
mod graph_test;

pub use document::{Body, DocKind, Document, Failure};
pub use error::{ComponentInfo, StreamError};
pub use graph::Graph;
pub use node::{BaseNode, Node, NodeRef, NodeResult};
pub use payload::{MapFn, Payload, ReduceFn, Route, map_fn, reduce_fn};

/// Everything needed to build and drive a graph.
pub mod prelude {
  pub use crate::document::{Body, DocKind, Document, Failure};
  pub use crate::error::StreamError;
  pub use crate::graph::Graph;
  pub use crate::node::{Node, NodeRef, NodeResult};
  pub use crate::nodes::bundle_node::{BundleConfig, BundleNode};
  pub use crate::nodes::collect_node::CollectNode;
  pub use crate::nodes::combine_latest_node::{CombineLatestConfig, CombineLatestNode};
  pub use crate::nodes::filter_node::{FilterNode, Predicate};
  pub use crate::nodes::map_node::MapNode;
  pub use crate::nodes::scan_node::{ScanNode, ScanState};
  pub use crate::nodes::source_node::SourceNode;
  pub use crate::nodes::union_node::UnionNode;
  pub use crate::nodes::zip_node::{ZipConfig, ZipNode};
  pub use crate::payload::{Payload, map_fn, reduce_fn};
}
