//! # Bundle Node
//!
//! Batch alignment join. Like zip it buffers per upstream, but it drains as
//! much as it can per wake-up and treats events specially: events never need a
//! partner from the other upstreams.
//!
//! ## Behavior
//!
//! When a buffer goes from empty to one document and every buffer is
//! non-empty, the node loops while every buffer stays non-empty:
//!
//! - All heads share one kind and it is not `event`: pop one document from
//!   each buffer, combine them through the payload's `combine` hook and emit
//!   the single result (e.g. simultaneous `start` documents become one start).
//! - At least one head is an `event`: in upstream order, drain each buffer's
//!   leading events, regenerating each through the payload's `regenerate`
//!   hook and emitting it on its own.
//! - Otherwise the heads disagree and none is an event. No alignment can ever
//!   make progress, so the node reports [`StreamError::KindMismatch`] and
//!   refuses every later document with [`StreamError::Halted`].
//!
//! If instead the receiving buffer holds more than `max_buffer` documents,
//! the caller suspends until the node drains it back within capacity.

use crate::document::{DocKind, Document};
use crate::error::{ComponentInfo, StreamError};
use crate::node::{BaseNode, Node, NodeResult};
use crate::nodes::common::{
  Backpressure, Buffered, JoinBuffers, validate_max_buffer, validate_upstreams,
};
use crate::payload::Payload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, trace};

/// Configuration for BundleNode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
  /// Documents a single upstream buffer may hold before its producer suspends.
  pub max_buffer: usize,
}

impl Default for BundleConfig {
  fn default() -> Self {
    Self { max_buffer: 100 }
  }
}

impl BundleConfig {
  /// Sets the buffer capacity.
  pub fn with_max_buffer(mut self, max_buffer: usize) -> Self {
    self.max_buffer = max_buffer;
    self
  }
}

struct BundleState<P> {
  buffers: JoinBuffers<P>,
  halted: bool,
}

impl<P: Payload> Buffered for BundleState<P> {
  type Payload = P;

  fn buffers(&self) -> &JoinBuffers<P> {
    &self.buffers
  }
}

/// One step of a drain pass.
enum Step<P> {
  /// Aligned non-event heads, popped as one tuple.
  Aligned(Vec<Document<P>>),
  /// Events drained standalone.
  Events(Vec<Document<P>>),
}

impl<P: Payload> BundleState<P> {
  /// Takes the next unit of work off the buffers, or returns the head kinds
  /// when the heads can neither align nor drain.
  ///
  /// Must only be called while every buffer is non-empty.
  fn next_step(&mut self) -> Result<Step<P>, Vec<DocKind>> {
    let kinds = self.buffers.head_kinds();
    let lead = kinds[0];
    if lead.is_special() && kinds.iter().all(|kind| *kind == lead) {
      // Only reached with every buffer non-empty, so the round is complete.
      return self.buffers.pop_round().map(Step::Aligned).ok_or(kinds);
    }
    if kinds.iter().any(|kind| !kind.is_special()) {
      return Ok(Step::Events(self.drain_events()));
    }
    Err(kinds)
  }

  fn drain_events(&mut self) -> Vec<Document<P>> {
    let mut drained = Vec::new();
    for index in 0..self.buffers.count() {
      while self.buffers.head(index).is_some_and(Document::is_event) {
        if let Some(event) = self.buffers.pop_front(index) {
          drained.push(P::regenerate(&event));
        }
      }
    }
    drained
  }
}

/// A node that batches aligned documents and drains events eagerly.
pub struct BundleNode<P: Payload> {
  base: BaseNode<P>,
  state: Mutex<BundleState<P>>,
  backpressure: Backpressure,
}

impl<P: Payload> BundleNode<P> {
  /// Creates a new BundleNode over `upstreams` with the default configuration.
  pub fn new(name: impl Into<String>, upstreams: Vec<String>) -> Result<Self, StreamError> {
    Self::with_config(name, upstreams, BundleConfig::default())
  }

  /// Creates a new BundleNode over `upstreams` with `config`.
  ///
  /// # Errors
  ///
  /// [`StreamError::InvalidConfig`] for an empty or duplicated upstream list,
  /// or a zero `max_buffer`.
  pub fn with_config(
    name: impl Into<String>,
    upstreams: Vec<String>,
    config: BundleConfig,
  ) -> Result<Self, StreamError> {
    let name = name.into();
    validate_upstreams(&name, &upstreams)?;
    validate_max_buffer(&name, config.max_buffer)?;
    trace!(
      "BundleNode::with_config(name={}, upstreams={:?}, config={:?})",
      name, upstreams, config
    );
    let count = upstreams.len();
    Ok(Self {
      base: BaseNode::new(name, upstreams),
      state: Mutex::new(BundleState {
        buffers: JoinBuffers::new(count),
        halted: false,
      }),
      backpressure: Backpressure::new(config.max_buffer),
    })
  }

  /// The configured buffer capacity.
  pub fn max_buffer(&self) -> usize {
    self.backpressure.max_buffer()
  }

  /// Current length of every upstream buffer.
  pub async fn buffer_lens(&self) -> Vec<usize> {
    self.state.lock().await.buffers.lens()
  }

  /// Returns `true` once the node has failed structurally.
  pub async fn is_halted(&self) -> bool {
    self.state.lock().await.halted
  }

  fn component(&self) -> ComponentInfo {
    ComponentInfo::new(self.name(), "BundleNode")
  }
}

#[async_trait]
impl<P: Payload> Node<P> for BundleNode<P> {
  fn base(&self) -> &BaseNode<P> {
    &self.base
  }

  async fn update(&self, doc: Document<P>, source: &str) -> NodeResult<P> {
    let index = self.base.upstream_index(source)?;
    let mut state = self.state.lock().await;
    if state.halted {
      return Err(StreamError::Halted {
        component: self.component(),
      });
    }
    let len = state.buffers.push(index, doc);
    trace!(
      "BundleNode::update(name={}, source={}, index={}) -> len={}",
      self.name(),
      source,
      index,
      len
    );

    if len == 1 && state.buffers.all_non_empty() {
      let mut outgoing = Vec::new();
      let mut mismatch = None;
      while state.buffers.all_non_empty() {
        match state.next_step() {
          Ok(Step::Aligned(tuple)) => {
            let kind = tuple[0].kind();
            debug!(node = self.name(), %kind, width = tuple.len(), "emitting bundled documents");
            outgoing.push(P::combine(kind, tuple));
          }
          Ok(Step::Events(events)) => outgoing.extend(events),
          Err(kinds) => {
            state.halted = true;
            error!(node = self.name(), ?kinds, "bundle heads mismatch with no event to drain");
            mismatch = Some(StreamError::KindMismatch {
              component: self.component(),
              kinds,
            });
            break;
          }
        }
      }
      drop(state);
      self.backpressure.release();

      // Whatever was drained before a mismatch still goes out.
      let mut results = Vec::new();
      for doc in outgoing {
        results.extend(self.emit(doc).await?);
      }
      return match mismatch {
        Some(err) => Err(err),
        None => Ok(results),
      };
    }

    if self.backpressure.is_over(len) {
      drop(state);
      self
        .backpressure
        .wait_for_capacity(self.name(), &self.state, index)
        .await;
    }
    Ok(Vec::new())
  }
}
