//! # Push Node Protocol
//!
//! This module defines the [`Node`] trait every vertex of a document graph
//! implements, and [`BaseNode`], which owns the wiring shared by all of them.
//!
//! ## Data Flow
//!
//! Data flows from upstream (sources) to downstream (sinks). A node knows the
//! names of its upstream nodes, declared when it is built, and holds its
//! downstream sinks, registered with [`Node::connect`].
//!
//! ## Execution Model
//!
//! Dispatch is a synchronous recursive push. Calling [`Node::emit`] invokes
//! [`Node::update`] on every downstream sink, in registration order, and awaits
//! each before moving to the next, so a document injected at a source has
//! driven every node below it by the time `emit` returns. The only point at
//! which an `update` can suspend is a join node waiting for buffer capacity.
//!
//! A sink that fails does not cut off its siblings: `emit` still delivers the
//! document to every sink and then reports the first error.
//!
//! Both methods return the flattened list of documents handed back by the
//! sinks further down. Terminal sinks such as
//! [`CollectNode`](crate::nodes::collect_node::CollectNode) return the
//! documents they receive, so emitting at a source reports what reached the
//! bottom of the graph.

use crate::document::Document;
use crate::error::StreamError;
use crate::payload::Payload;
use async_trait::async_trait;
use futures::Stream;
use std::sync::{Arc, Mutex};
use tokio_stream::StreamExt;
use tracing::{debug, trace, warn};

/// Result of an `emit` or `update` call: the documents returned by downstream sinks.
pub type NodeResult<P> = Result<Vec<Document<P>>, StreamError>;

/// Shared handle to a node.
pub type NodeRef<P> = Arc<dyn Node<P>>;

/// The unified trait for every node in a document graph.
#[async_trait]
pub trait Node<P: Payload>: Send + Sync {
  /// The shared wiring of this node.
  fn base(&self) -> &BaseNode<P>;

  /// Reacts to `doc` arriving from the upstream node named `source`.
  ///
  /// # Arguments
  ///
  /// * `doc` - The incoming document. Its body is shared with every other
  ///   sink that received it and must not be mutated.
  /// * `source` - Name of the upstream node that emitted `doc`. Nodes with
  ///   declared upstreams resolve it with [`BaseNode::upstream_index`].
  ///
  /// # Returns
  ///
  /// Whatever should be propagated back to the caller, normally the result
  /// of the node's own [`emit`](Node::emit) calls. A node that holds the
  /// document back (a join waiting for partners, a filter rejecting it)
  /// returns an empty vector.
  async fn update(&self, doc: Document<P>, source: &str) -> NodeResult<P>;

  /// Returns the name of the node.
  fn name(&self) -> &str {
    self.base().name()
  }

  /// Returns the names of the node's upstream nodes, in declaration order.
  fn upstream_names(&self) -> &[String] {
    self.base().upstream_names()
  }

  /// Registers `sink` as a downstream of this node.
  ///
  /// Sinks receive documents in registration order.
  fn connect(&self, sink: NodeRef<P>) {
    self.base().add_downstream(sink);
  }

  /// Pushes `doc` into every downstream sink.
  ///
  /// # Returns
  ///
  /// The flattened results of every sink's [`update`](Node::update). When a
  /// sink fails the remaining sinks are still updated, and the first error
  /// is returned.
  async fn emit(&self, doc: Document<P>) -> NodeResult<P> {
    self.base().emit(doc).await
  }
}

/// Name, upstream names and downstream sinks of a node.
pub struct BaseNode<P: Payload> {
  name: String,
  upstream_names: Vec<String>,
  downstream: Mutex<Vec<NodeRef<P>>>,
}

impl<P: Payload> BaseNode<P> {
  /// Creates a new BaseNode with the given name and upstream names.
  ///
  /// # Arguments
  ///
  /// * `name` - The node's name, sent as `source` with every emitted document.
  /// * `upstream_names` - Names of the nodes feeding this one. Their order
  ///   fixes the buffer index of each upstream. Leave empty for nodes that
  ///   accept documents from anywhere.
  pub fn new(name: impl Into<String>, upstream_names: Vec<String>) -> Self {
    let name = name.into();
    trace!(
      "BaseNode::new(name={}, upstream_names={:?})",
      name, upstream_names
    );
    Self {
      name,
      upstream_names,
      downstream: Mutex::new(Vec::new()),
    }
  }

  /// Returns the node's name.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Returns the upstream names.
  pub fn upstream_names(&self) -> &[String] {
    &self.upstream_names
  }

  /// Position of `source` among the upstream names.
  ///
  /// # Errors
  ///
  /// [`StreamError::UnknownUpstream`] when `source` was not declared.
  pub fn upstream_index(&self, source: &str) -> Result<usize, StreamError> {
    self
      .upstream_names
      .iter()
      .position(|name| name == source)
      .ok_or_else(|| StreamError::UnknownUpstream {
        node: self.name.clone(),
        upstream: source.to_string(),
      })
  }

  /// Appends a downstream sink.
  pub fn add_downstream(&self, sink: NodeRef<P>) {
    trace!(
      "BaseNode::add_downstream(name={}, sink={})",
      self.name,
      sink.name()
    );
    self.sinks_guard().push(sink);
  }

  /// Names of the downstream sinks, in registration order.
  pub fn downstream_names(&self) -> Vec<String> {
    self
      .sinks_guard()
      .iter()
      .map(|sink| sink.name().to_string())
      .collect()
  }

  /// Pushes `doc` into every downstream sink and flattens what they return.
  pub async fn emit(&self, doc: Document<P>) -> NodeResult<P> {
    // Snapshot so the lock is not held across sink updates.
    let sinks: Vec<NodeRef<P>> = self.sinks_guard().clone();
    trace!(
      "BaseNode::emit(name={}, kind={}, sinks={})",
      self.name,
      doc.kind(),
      sinks.len()
    );
    let mut results = Vec::new();
    let mut first_error = None;
    for sink in sinks {
      match sink.update(doc.clone(), &self.name).await {
        Ok(returned) => results.extend(returned),
        Err(err) => {
          warn!(node = %self.name, sink = sink.name(), error = %err, "sink update failed");
          first_error.get_or_insert(err);
        }
      }
    }
    match first_error {
      Some(err) => Err(err),
      None => Ok(results),
    }
  }

  fn sinks_guard(&self) -> std::sync::MutexGuard<'_, Vec<NodeRef<P>>> {
    self
      .downstream
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

/// Emits every document of `stream` out of `node`, in order.
///
/// # Arguments
///
/// * `node` - The node the documents leave from. Its downstream sinks see
///   them exactly as if each had been passed to [`Node::emit`].
/// * `stream` - The documents to push.
///
/// # Returns
///
/// Everything the downstream sinks handed back, in emission order. Stops at
/// the first structural error.
pub async fn drive<P, S>(node: &dyn Node<P>, stream: S) -> NodeResult<P>
where
  P: Payload,
  S: Stream<Item = Document<P>> + Send,
{
  tokio::pin!(stream);
  let mut results = Vec::new();
  let mut count = 0usize;
  while let Some(doc) = stream.next().await {
    results.extend(node.emit(doc).await?);
    count += 1;
  }
  debug!(node = node.name(), documents = count, "stream drained");
  Ok(results)
}
