//! # Scan Node
//!
//! Accumulates event payloads into a running state and emits the state after
//! every event.
//!
//! ## Behavior
//!
//! Non-event documents pass through unchanged. For each event:
//!
//! - [`ScanState::Uninitialized`]: the payload becomes the state.
//! - [`ScanState::Initializer`]: the initializer is called once with the
//!   payload to produce the real initial state.
//! - [`ScanState::Value`]: the payload's `custom_reduce` or, failing that, the
//!   node's function computes the next state as `f(state, payload)`. With a
//!   state key configured the state is first injected into the payload under
//!   that key.
//!
//! The current state is emitted as a new event after every update. When the
//! function fails, the state is left as it was and the failure is emitted
//! instead.

use crate::document::{Document, Failure};
use crate::node::{BaseNode, Node, NodeResult};
use crate::payload::{Payload, ReduceFn, Route};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Builds the initial scan state from the first payload.
pub type InitFn<P> = Arc<dyn Fn(&P) -> P + Send + Sync>;

/// The accumulator of a scan node.
#[derive(Clone)]
pub enum ScanState<P> {
  /// No state yet; the first payload seeds it.
  Uninitialized,
  /// Produces the initial state from the first payload.
  Initializer(InitFn<P>),
  /// The current state.
  Value(P),
}

impl<P: fmt::Debug> fmt::Debug for ScanState<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ScanState::Uninitialized => write!(f, "ScanState::Uninitialized"),
      ScanState::Initializer(_) => write!(f, "ScanState::Initializer"),
      ScanState::Value(value) => write!(f, "ScanState::Value({:?})", value),
    }
  }
}

/// A node that folds event payloads into a running state.
pub struct ScanNode<P: Payload> {
  base: BaseNode<P>,
  function: ReduceFn<P>,
  state: Mutex<ScanState<P>>,
  state_key: Option<String>,
}

impl<P: Payload> ScanNode<P> {
  /// Creates a new ScanNode fed by `upstream`, starting uninitialized.
  ///
  /// # Arguments
  ///
  /// * `name` - The node's name.
  /// * `upstream` - Name of the single upstream node.
  /// * `function` - Called as `function(state, payload)` to produce the next
  ///   state.
  pub fn new(name: impl Into<String>, upstream: impl Into<String>, function: ReduceFn<P>) -> Self {
    Self {
      base: BaseNode::new(name, vec![upstream.into()]),
      function,
      state: Mutex::new(ScanState::Uninitialized),
      state_key: None,
    }
  }

  /// Starts from an explicit initial state.
  pub fn with_initial(mut self, initial: P) -> Self {
    self.state = Mutex::new(ScanState::Value(initial));
    self
  }

  /// Builds the initial state from the first payload.
  pub fn with_initializer<F>(mut self, initializer: F) -> Self
  where
    F: Fn(&P) -> P + Send + Sync + 'static,
  {
    self.state = Mutex::new(ScanState::Initializer(Arc::new(initializer)));
    self
  }

  /// Injects the state into each payload under `key` before combining.
  pub fn with_state_key(mut self, key: impl Into<String>) -> Self {
    self.state_key = Some(key.into());
    self
  }

  /// A copy of the current state.
  pub async fn state(&self) -> ScanState<P> {
    self.state.lock().await.clone()
  }

  fn reduce(&self, state: &P, payload: P) -> Result<P, Failure> {
    if let Some(result) = payload.custom_reduce(&self.function, state) {
      return result;
    }
    let payload = match &self.state_key {
      Some(key) => payload.inject_state(key, state),
      None => payload,
    };
    (self.function)(state, &payload)
  }

  async fn step(&self, event: &Document<P>) -> Result<P, Failure> {
    let payload = P::extract_raw(event)?;
    let mut state = self.state.lock().await;
    let next = match &*state {
      ScanState::Uninitialized => payload,
      ScanState::Initializer(initializer) => initializer(&payload),
      ScanState::Value(current) => self.reduce(current, payload)?,
    };
    *state = ScanState::Value(next.clone());
    Ok(next)
  }
}

#[async_trait]
impl<P: Payload> Node<P> for ScanNode<P> {
  fn base(&self) -> &BaseNode<P> {
    &self.base
  }

  async fn update(&self, doc: Document<P>, source: &str) -> NodeResult<P> {
    trace!(
      "ScanNode::update(name={}, source={}, kind={})",
      self.name(),
      source,
      doc.kind()
    );
    let event = match P::classify(doc) {
      Route::Forward(doc) => return self.emit(doc).await,
      Route::Event(event) => event,
    };

    let result = self
      .step(&event)
      .await
      .map_err(|failure| failure.with_origin(self.name()));
    if let Err(failure) = &result {
      debug!(node = self.name(), %failure, "scan function failed, state unchanged");
    }
    self.emit(P::wrap_result(result)).await
  }
}
