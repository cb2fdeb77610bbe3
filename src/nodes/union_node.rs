//! # Union Node
//!
//! Multi-upstream pass-through: every document from any declared upstream is
//! forwarded unchanged, in arrival order. No buffering, no alignment.

use crate::document::Document;
use crate::error::StreamError;
use crate::node::{BaseNode, Node, NodeResult};
use crate::nodes::common::validate_upstreams;
use crate::payload::Payload;
use async_trait::async_trait;
use tracing::trace;

/// A node that merges several upstreams into one stream.
pub struct UnionNode<P: Payload> {
  base: BaseNode<P>,
}

impl<P: Payload> UnionNode<P> {
  /// Creates a new UnionNode over `upstreams`.
  pub fn new(name: impl Into<String>, upstreams: Vec<String>) -> Result<Self, StreamError> {
    let name = name.into();
    validate_upstreams(&name, &upstreams)?;
    Ok(Self {
      base: BaseNode::new(name, upstreams),
    })
  }
}

#[async_trait]
impl<P: Payload> Node<P> for UnionNode<P> {
  fn base(&self) -> &BaseNode<P> {
    &self.base
  }

  async fn update(&self, doc: Document<P>, source: &str) -> NodeResult<P> {
    self.base.upstream_index(source)?;
    trace!(
      "UnionNode::update(name={}, source={}, kind={})",
      self.name(),
      source,
      doc.kind()
    );
    self.emit(doc).await
  }
}
