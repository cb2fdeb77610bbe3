//! # Source Node
//!
//! Entry point of a document graph. Documents are injected with
//! [`Node::emit`], or fed from a stream with [`SourceNode::drive`].
//!
//! A source can also sit below other nodes, in which case every update is
//! re-emitted unchanged.

use crate::document::Document;
use crate::node::{self, BaseNode, Node, NodeResult};
use crate::payload::Payload;
use async_trait::async_trait;
use futures::Stream;
use tracing::trace;

/// A node that injects documents into the graph.
pub struct SourceNode<P: Payload> {
  base: BaseNode<P>,
}

impl<P: Payload> SourceNode<P> {
  /// Creates a new SourceNode with no upstreams.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      base: BaseNode::new(name, Vec::new()),
    }
  }

  /// Emits every document of `stream` in order and returns everything the
  /// downstream sinks handed back.
  ///
  /// Stops at the first structural error.
  pub async fn drive<S>(&self, stream: S) -> NodeResult<P>
  where
    S: Stream<Item = Document<P>> + Send,
  {
    node::drive(self, stream).await
  }
}

#[async_trait]
impl<P: Payload> Node<P> for SourceNode<P> {
  fn base(&self) -> &BaseNode<P> {
    &self.base
  }

  async fn update(&self, doc: Document<P>, source: &str) -> NodeResult<P> {
    trace!(
      "SourceNode::update(name={}, source={}, kind={})",
      self.name(),
      source,
      doc.kind()
    );
    self.emit(doc).await
  }
}
