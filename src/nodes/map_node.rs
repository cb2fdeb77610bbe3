//! # Map Node
//!
//! A transform node that applies a function to the payload of each event.
//!
//! ## Behavior
//!
//! - `start`, `descriptor` and `stop` documents are re-emitted unchanged.
//! - For `event` documents the raw payload is extracted and the function is
//!   applied, or the payload's own `custom_map` when it has one and the node is
//!   not in raw mode. The result is wrapped into a new `event`.
//! - A failing function does not stop the graph: the failure is wrapped into
//!   the emitted event instead. An incoming failed event is forwarded as a
//!   failed event without calling the function.

use crate::document::{Document, Failure};
use crate::node::{BaseNode, Node, NodeResult};
use crate::payload::{MapFn, Payload, Route};
use async_trait::async_trait;
use tracing::{debug, trace};

/// A node that applies a function to every event payload.
pub struct MapNode<P: Payload> {
  base: BaseNode<P>,
  function: MapFn<P>,
  raw: bool,
}

impl<P: Payload> MapNode<P> {
  /// Creates a new MapNode fed by `upstream` that applies `function`.
  ///
  /// # Arguments
  ///
  /// * `name` - The node's name.
  /// * `upstream` - Name of the single upstream node.
  /// * `function` - Applied to each event's raw payload. An `Err` is emitted
  ///   as a failed event.
  pub fn new(name: impl Into<String>, upstream: impl Into<String>, function: MapFn<P>) -> Self {
    Self {
      base: BaseNode::new(name, vec![upstream.into()]),
      function,
      raw: false,
    }
  }

  /// Always apply the node's function, ignoring the payload's `custom_map`.
  pub fn with_raw(mut self, raw: bool) -> Self {
    self.raw = raw;
    self
  }

  /// Returns whether the node bypasses the payload's `custom_map`.
  pub fn is_raw(&self) -> bool {
    self.raw
  }

  fn apply(&self, doc: &Document<P>) -> Result<P, Failure> {
    let raw = P::extract_raw(doc)?;
    if !self.raw {
      if let Some(result) = raw.custom_map(&self.function) {
        return result;
      }
    }
    (self.function)(&raw)
  }
}

#[async_trait]
impl<P: Payload> Node<P> for MapNode<P> {
  fn base(&self) -> &BaseNode<P> {
    &self.base
  }

  async fn update(&self, doc: Document<P>, source: &str) -> NodeResult<P> {
    trace!(
      "MapNode::update(name={}, source={}, kind={})",
      self.name(),
      source,
      doc.kind()
    );
    let event = match P::classify(doc) {
      Route::Forward(doc) => return self.emit(doc).await,
      Route::Event(event) => event,
    };

    let result = self
      .apply(&event)
      .map_err(|failure| failure.with_origin(self.name()));
    if let Err(failure) = &result {
      debug!(node = self.name(), %failure, "map function failed, emitting failure");
    }
    self.emit(P::wrap_result(result)).await
  }
}
