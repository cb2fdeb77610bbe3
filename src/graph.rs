//! # Graph
//!
//! A named registry of nodes and the wiring between them.
//!
//! Nodes are built with their upstream names and registered with
//! [`Graph::add_node`]. [`Graph::connect`] adds an edge, registering the
//! downstream node as a sink of the upstream one. Documents enter through
//! [`Graph::emit`] or [`Graph::drive`], which push into the named node and
//! return whatever the terminal sinks handed back.
//!
//! ```rust
//! use docweave::document::Document;
//! use docweave::graph::Graph;
//! use docweave::nodes::collect_node::CollectNode;
//! use docweave::nodes::source_node::SourceNode;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let mut graph = Graph::<i64>::new("demo");
//! graph.add_node(Arc::new(SourceNode::<i64>::new("src")))?;
//! graph.add_node(Arc::new(CollectNode::<i64>::new("out", "src")))?;
//! graph.connect("src", "out")?;
//!
//! let reached = graph.emit("src", Document::event(7)).await?;
//! assert_eq!(reached[0].payload(), Some(&7));
//! # Ok::<(), docweave::error::StreamError>(())
//! # }).unwrap();
//! ```

use crate::document::Document;
use crate::error::StreamError;
use crate::node::{self, NodeRef, NodeResult};
use crate::payload::Payload;
use futures::Stream;
use std::collections::HashMap;
use tracing::trace;

/// A named collection of connected nodes.
pub struct Graph<P: Payload> {
  name: String,
  nodes: HashMap<String, NodeRef<P>>,
}

impl<P: Payload> Graph<P> {
  /// Creates an empty graph.
  pub fn new(name: impl Into<String>) -> Self {
    let name = name.into();
    trace!("Graph::new(name={})", name);
    Self {
      name,
      nodes: HashMap::new(),
    }
  }

  /// Returns the name of the graph.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Registers `node` under its own name.
  ///
  /// # Errors
  ///
  /// [`StreamError::DuplicateNode`] when the name is already taken.
  pub fn add_node(&mut self, node: NodeRef<P>) -> Result<(), StreamError> {
    let name = node.name().to_string();
    trace!("Graph::add_node(graph={}, node={})", self.name, name);
    if self.nodes.contains_key(&name) {
      return Err(StreamError::DuplicateNode(name));
    }
    self.nodes.insert(name, node);
    Ok(())
  }

  /// Looks up a node by name.
  pub fn node(&self, name: &str) -> Option<NodeRef<P>> {
    self.nodes.get(name).cloned()
  }

  /// Names of every registered node, sorted.
  pub fn node_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.nodes.keys().cloned().collect();
    names.sort();
    names
  }

  /// Number of registered nodes.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Returns `true` when no node is registered.
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Makes `to` a downstream sink of `from`.
  ///
  /// A node that declares upstream names must list `from` among them, since
  /// that name is how it tells its inputs apart.
  ///
  /// # Arguments
  ///
  /// * `from` - Name of the upstream node.
  /// * `to` - Name of the node that will receive `from`'s documents.
  ///
  /// # Errors
  ///
  /// [`StreamError::UnknownNode`] if either name is not registered, and
  /// [`StreamError::UnknownUpstream`] if `to` does not declare `from`.
  pub fn connect(&self, from: &str, to: &str) -> Result<(), StreamError> {
    trace!("Graph::connect(graph={}, from={}, to={})", self.name, from, to);
    let upstream = self.lookup(from)?;
    let downstream = self.lookup(to)?;
    let declared = downstream.upstream_names();
    if !declared.is_empty() && !declared.iter().any(|name| name == from) {
      return Err(StreamError::UnknownUpstream {
        node: to.to_string(),
        upstream: from.to_string(),
      });
    }
    upstream.connect(downstream);
    Ok(())
  }

  /// Pushes `doc` out of the node named `source`.
  pub async fn emit(&self, source: &str, doc: Document<P>) -> NodeResult<P> {
    let node = self.lookup(source)?;
    trace!(
      "Graph::emit(graph={}, source={}, kind={})",
      self.name,
      source,
      doc.kind()
    );
    node.emit(doc).await
  }

  /// Pushes every document of `stream`, in order, out of the node named
  /// `source`. Stops at the first structural error.
  pub async fn drive<S>(&self, source: &str, stream: S) -> NodeResult<P>
  where
    S: Stream<Item = Document<P>> + Send,
  {
    let entry = self.lookup(source)?;
    trace!("Graph::drive(graph={}, source={})", self.name, source);
    node::drive(entry.as_ref(), stream).await
  }

  fn lookup(&self, name: &str) -> Result<NodeRef<P>, StreamError> {
    self
      .node(name)
      .ok_or_else(|| StreamError::UnknownNode(name.to_string()))
  }
}
