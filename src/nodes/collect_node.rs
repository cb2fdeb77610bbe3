//! # Collect Node
//!
//! Terminal sink that records every document it receives.
//!
//! Each update returns the received document (plus anything its own
//! downstream returns), so the result of emitting at a source lists the
//! documents that reached the collectors. [`CollectNode::flush`] emits the
//! cache as one `Combined` event and clears it.

use crate::document::{DocKind, Document};
use crate::node::{BaseNode, Node, NodeResult};
use crate::payload::Payload;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// A node that records the documents it receives.
pub struct CollectNode<P: Payload> {
  base: BaseNode<P>,
  cache: Arc<Mutex<Vec<Document<P>>>>,
}

impl<P: Payload> CollectNode<P> {
  /// Creates a new CollectNode fed by `upstream`.
  pub fn new(name: impl Into<String>, upstream: impl Into<String>) -> Self {
    Self {
      base: BaseNode::new(name, vec![upstream.into()]),
      cache: Arc::new(Mutex::new(Vec::new())),
    }
  }

  /// A copy of every document received since the last flush.
  pub async fn collected(&self) -> Vec<Document<P>> {
    self.cache.lock().await.clone()
  }

  /// Payloads of the collected documents that carry data.
  pub async fn payloads(&self) -> Vec<P> {
    self
      .cache
      .lock()
      .await
      .iter()
      .filter_map(|doc| doc.payload().cloned())
      .collect()
  }

  /// Emits the cache as one `Combined` event and clears it.
  ///
  /// Does nothing when the cache is empty.
  pub async fn flush(&self) -> NodeResult<P> {
    let cached = std::mem::take(&mut *self.cache.lock().await);
    if cached.is_empty() {
      return Ok(Vec::new());
    }
    debug!(node = self.name(), documents = cached.len(), "flushing cache");
    self.emit(Document::combined(DocKind::Event, cached)).await
  }
}

#[async_trait]
impl<P: Payload> Node<P> for CollectNode<P> {
  fn base(&self) -> &BaseNode<P> {
    &self.base
  }

  async fn update(&self, doc: Document<P>, source: &str) -> NodeResult<P> {
    trace!(
      "CollectNode::update(name={}, source={}, kind={})",
      self.name(),
      source,
      doc.kind()
    );
    self.cache.lock().await.push(doc.clone());
    let mut results = vec![doc.clone()];
    results.extend(self.emit(doc).await?);
    Ok(results)
  }
}
