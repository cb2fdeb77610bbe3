//! # Payload Capabilities
//!
//! The hooks a payload type may implement to customise how operators treat it.
//! Every hook has a default, so a plain type only needs an empty
//! `impl Payload for T {}` to flow through the graph.
//!
//! | Hook              | Used by                     | Default                                   |
//! |-------------------|-----------------------------|-------------------------------------------|
//! | `classify`        | map, filter, scan           | route by kind                             |
//! | `extract_raw`     | map, filter, scan           | data payload, or the carried failure      |
//! | `wrap_result`     | map, scan                   | new event with the value or the failure   |
//! | `regenerate`      | bundle                      | new event sharing the original body       |
//! | `combine`         | bundle                      | `Combined` document of the aligned kind   |
//! | `custom_map`      | map                         | not implemented                           |
//! | `custom_reduce`   | scan                        | not implemented                           |
//! | `custom_merge`    | zip, combine_latest         | not implemented                           |
//! | `inject_state`    | scan with a state key       | no-op                                     |

use crate::document::{Body, DocKind, Document, Failure};
use std::fmt::Debug;
use std::sync::Arc;

/// Function applied by `map` to each event payload.
pub type MapFn<P> = Arc<dyn Fn(&P) -> Result<P, Failure> + Send + Sync>;

/// Combining function applied by `scan` as `f(state, payload)`.
pub type ReduceFn<P> = Arc<dyn Fn(&P, &P) -> Result<P, Failure> + Send + Sync>;

/// Wraps a closure as a [`MapFn`].
pub fn map_fn<P, F>(function: F) -> MapFn<P>
where
  F: Fn(&P) -> Result<P, Failure> + Send + Sync + 'static,
{
  Arc::new(function)
}

/// Wraps a closure as a [`ReduceFn`].
pub fn reduce_fn<P, F>(function: F) -> ReduceFn<P>
where
  F: Fn(&P, &P) -> Result<P, Failure> + Send + Sync + 'static,
{
  Arc::new(function)
}

/// Result of classifying a document on its way into a transform.
#[derive(Debug, Clone, PartialEq)]
pub enum Route<P> {
  /// A start, descriptor or stop document to re-emit unchanged.
  Forward(Document<P>),
  /// An event whose body the operator handles.
  Event(Document<P>),
}

/// Optional capabilities of a payload type.
pub trait Payload: Clone + Debug + Send + Sync + 'static {
  /// Routes special documents straight through and hands events to the operator.
  fn classify(doc: Document<Self>) -> Route<Self> {
    if doc.kind().is_special() {
      Route::Forward(doc)
    } else {
      Route::Event(doc)
    }
  }

  /// The bare value a transform function should see.
  ///
  /// A failed body yields its failure so it can be forwarded as data.
  fn extract_raw(doc: &Document<Self>) -> Result<Self, Failure> {
    match doc.body() {
      Body::Data(payload) => Ok(payload.clone()),
      Body::Failed(failure) => Err(failure.clone()),
      Body::Combined(parts) => Err(Failure::new(format!(
        "{} document combines {} parts and has no raw payload",
        doc.kind(),
        parts.len()
      ))),
    }
  }

  /// Builds a new event carrying either a computed value or a failure.
  fn wrap_result(result: Result<Self, Failure>) -> Document<Self> {
    match result {
      Ok(payload) => Document::event(payload),
      Err(failure) => Document::failed(failure),
    }
  }

  /// Produces a fresh event for a document drained standalone by `bundle`.
  fn regenerate(doc: &Document<Self>) -> Document<Self> {
    Document::from_shared(DocKind::Event, Arc::clone(doc.shared_body()))
  }

  /// Combines an aligned tuple of same-kind documents into one document.
  fn combine(kind: DocKind, parts: Vec<Document<Self>>) -> Document<Self> {
    Document::combined(kind, parts)
  }

  /// Payload-specific map. `None` means the node applies `function` itself.
  fn custom_map(&self, _function: &MapFn<Self>) -> Option<Result<Self, Failure>> {
    None
  }

  /// Payload-specific reduce. `None` means the node applies `function` itself.
  fn custom_reduce(
    &self,
    _function: &ReduceFn<Self>,
    _state: &Self,
  ) -> Option<Result<Self, Failure>> {
    None
  }

  /// Payload-specific merge of a join tuple. `None` keeps the tuple as a
  /// `Combined` document.
  fn custom_merge(_parts: &[Document<Self>]) -> Option<Document<Self>> {
    None
  }

  /// Places the scan accumulator inside the payload under `key`.
  fn inject_state(self, _key: &str, _state: &Self) -> Self {
    self
  }
}

impl Payload for i64 {}
impl Payload for f64 {}
impl Payload for bool {}
impl Payload for String {}

impl Payload for serde_json::Value {
  fn extract_raw(doc: &Document<Self>) -> Result<Self, Failure> {
    match doc.body() {
      Body::Data(value) => Ok(value.clone()),
      Body::Failed(failure) => Err(failure.clone()),
      Body::Combined(parts) => parts
        .iter()
        .map(Self::extract_raw)
        .collect::<Result<Vec<_>, _>>()
        .map(serde_json::Value::Array),
    }
  }

  fn inject_state(mut self, key: &str, state: &Self) -> Self {
    if let serde_json::Value::Object(map) = &mut self {
      map.insert(key.to_string(), state.clone());
    }
    self
  }
}
