//! # Zip Node
//!
//! Pairwise alignment join: one combined tuple per round, taking exactly one
//! buffered document from each upstream in arrival order.
//!
//! ## Behavior
//!
//! Each upstream has its own FIFO buffer. When a buffer goes from empty to
//! one document and every other buffer is non-empty, a round is formed:
//!
//! 1. Kind repair: if a head's kind differs from the first buffer's head, the
//!    matching slot of the previous round's tuple stands in for it this round.
//!    The displaced head stays queued for a later round. On the very first
//!    round there is no prior tuple, and mismatched kinds pass through as-is.
//! 2. One document is popped from every buffer. The tuple is kept as the new
//!    prior, merged with the payload's `custom_merge` if it has one (otherwise
//!    it is emitted as a `Combined` document), and emitted.
//! 3. Rounds keep forming while every buffer is still non-empty, which only
//!    happens after a repair left the displaced head queued.
//! 4. Every producer suspended on backpressure is woken.
//!
//! If instead the receiving buffer holds more than `max_buffer` documents,
//! the caller suspends until a later round brings it back within capacity.

use crate::document::Document;
use crate::error::StreamError;
use crate::node::{BaseNode, Node, NodeResult};
use crate::nodes::common::{
  Backpressure, Buffered, JoinBuffers, merge_tuple, validate_max_buffer, validate_upstreams,
};
use crate::payload::Payload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

/// Configuration for ZipNode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZipConfig {
  /// Documents a single upstream buffer may hold before its producer suspends.
  pub max_buffer: usize,
}

impl Default for ZipConfig {
  fn default() -> Self {
    Self { max_buffer: 10 }
  }
}

impl ZipConfig {
  /// Sets the buffer capacity.
  pub fn with_max_buffer(mut self, max_buffer: usize) -> Self {
    self.max_buffer = max_buffer;
    self
  }
}

struct ZipState<P> {
  buffers: JoinBuffers<P>,
  prior: Option<Vec<Document<P>>>,
}

impl<P: Payload> Buffered for ZipState<P> {
  type Payload = P;

  fn buffers(&self) -> &JoinBuffers<P> {
    &self.buffers
  }
}

impl<P: Payload> ZipState<P> {
  /// Substitutes prior slots for heads whose kind differs from the first head.
  fn repair_heads(&mut self, node: &str) {
    let Some(lead) = self.buffers.head(0).map(Document::kind) else {
      return;
    };
    for index in 1..self.buffers.count() {
      let head_kind = match self.buffers.head(index) {
        Some(head) => head.kind(),
        None => continue,
      };
      if head_kind == lead {
        continue;
      }
      match &self.prior {
        Some(prior) => {
          debug!(
            node,
            upstream_index = index,
            expected = %lead,
            found = %head_kind,
            "repairing misaligned head from prior round"
          );
          self.buffers.push_front(index, prior[index].clone());
        }
        None => warn!(
          node,
          upstream_index = index,
          expected = %lead,
          found = %head_kind,
          "misaligned kinds on first round, no prior tuple to repair from"
        ),
      }
    }
  }
}

/// A node that emits one tuple per round of upstream documents.
pub struct ZipNode<P: Payload> {
  base: BaseNode<P>,
  state: Mutex<ZipState<P>>,
  backpressure: Backpressure,
}

impl<P: Payload> ZipNode<P> {
  /// Creates a new ZipNode over `upstreams` with the default configuration.
  pub fn new(name: impl Into<String>, upstreams: Vec<String>) -> Result<Self, StreamError> {
    Self::with_config(name, upstreams, ZipConfig::default())
  }

  /// Creates a new ZipNode over `upstreams` with `config`.
  ///
  /// # Arguments
  ///
  /// * `name` - The node's name.
  /// * `upstreams` - The joined upstreams. Their order is the slot order of
  ///   every emitted tuple.
  /// * `config` - Buffer capacity.
  ///
  /// # Errors
  ///
  /// [`StreamError::InvalidConfig`] for an empty or duplicated upstream list,
  /// or a zero `max_buffer`.
  pub fn with_config(
    name: impl Into<String>,
    upstreams: Vec<String>,
    config: ZipConfig,
  ) -> Result<Self, StreamError> {
    let name = name.into();
    validate_upstreams(&name, &upstreams)?;
    validate_max_buffer(&name, config.max_buffer)?;
    trace!(
      "ZipNode::with_config(name={}, upstreams={:?}, config={:?})",
      name, upstreams, config
    );
    let count = upstreams.len();
    Ok(Self {
      base: BaseNode::new(name, upstreams),
      state: Mutex::new(ZipState {
        buffers: JoinBuffers::new(count),
        prior: None,
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

  /// The last emitted tuple, before merging.
  pub async fn prior(&self) -> Option<Vec<Document<P>>> {
    self.state.lock().await.prior.clone()
  }
}

#[async_trait]
impl<P: Payload> Node<P> for ZipNode<P> {
  fn base(&self) -> &BaseNode<P> {
    &self.base
  }

  async fn update(&self, doc: Document<P>, source: &str) -> NodeResult<P> {
    let index = self.base.upstream_index(source)?;
    let mut state = self.state.lock().await;
    let len = state.buffers.push(index, doc);
    trace!(
      "ZipNode::update(name={}, source={}, index={}) -> len={}",
      self.name(),
      source,
      index,
      len
    );

    if len == 1 && state.buffers.all_non_empty() {
      // A repaired round leaves the displaced head queued, so more than one
      // round can be ready.
      let mut tuples = Vec::new();
      while state.buffers.all_non_empty() {
        state.repair_heads(self.name());
        let Some(tuple) = state.buffers.pop_round() else {
          break;
        };
        state.prior = Some(tuple.clone());
        tuples.push(tuple);
      }
      drop(state);
      self.backpressure.release();

      let mut results = Vec::new();
      for tuple in tuples {
        let kind = tuple[0].kind();
        debug!(node = self.name(), %kind, width = tuple.len(), "emitting zipped tuple");
        results.extend(self.emit(merge_tuple(kind, tuple)).await?);
      }
      return Ok(results);
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
