//! # Filter Node
//!
//! Passes through the events that satisfy a predicate.
//!
//! Non-event documents always pass. The predicate sees either the raw payload
//! or the whole document, depending on the [`Predicate`] variant. Events that
//! carry a failure have no raw payload to test; a raw predicate lets them
//! through untested so failures stay visible downstream.

use crate::document::Document;
use crate::node::{BaseNode, Node, NodeResult};
use crate::payload::{Payload, Route};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

/// The test applied to each event.
#[derive(Clone)]
pub enum Predicate<P> {
  /// Evaluated against the raw payload.
  Raw(Arc<dyn Fn(&P) -> bool + Send + Sync>),
  /// Evaluated against the full document.
  Document(Arc<dyn Fn(&Document<P>) -> bool + Send + Sync>),
}

impl<P> Predicate<P> {
  /// A predicate over the raw payload.
  pub fn raw<F>(function: F) -> Self
  where
    F: Fn(&P) -> bool + Send + Sync + 'static,
  {
    Predicate::Raw(Arc::new(function))
  }

  /// A predicate over the full document.
  pub fn document<F>(function: F) -> Self
  where
    F: Fn(&Document<P>) -> bool + Send + Sync + 'static,
  {
    Predicate::Document(Arc::new(function))
  }
}

/// A node that drops events failing a predicate.
pub struct FilterNode<P: Payload> {
  base: BaseNode<P>,
  predicate: Predicate<P>,
}

impl<P: Payload> FilterNode<P> {
  /// Creates a new FilterNode fed by `upstream`.
  pub fn new(
    name: impl Into<String>,
    upstream: impl Into<String>,
    predicate: Predicate<P>,
  ) -> Self {
    Self {
      base: BaseNode::new(name, vec![upstream.into()]),
      predicate,
    }
  }

  fn accepts(&self, doc: &Document<P>) -> bool {
    match &self.predicate {
      Predicate::Document(test) => test(doc),
      Predicate::Raw(test) => match P::extract_raw(doc) {
        Ok(raw) => test(&raw),
        Err(_) => true,
      },
    }
  }
}

#[async_trait]
impl<P: Payload> Node<P> for FilterNode<P> {
  fn base(&self) -> &BaseNode<P> {
    &self.base
  }

  async fn update(&self, doc: Document<P>, source: &str) -> NodeResult<P> {
    let event = match P::classify(doc) {
      Route::Forward(doc) => return self.emit(doc).await,
      Route::Event(event) => event,
    };
    let accepted = self.accepts(&event);
    trace!(
      "FilterNode::update(name={}, source={}) -> accepted={}",
      self.name(),
      source,
      accepted
    );
    if accepted {
      self.emit(event).await
    } else {
      Ok(Vec::new())
    }
  }
}
