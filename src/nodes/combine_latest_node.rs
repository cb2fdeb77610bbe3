//! # Combine Latest Node
//!
//! Latest-value join: keeps the most recent document from every upstream and
//! emits the combination once every upstream has reported.
//!
//! ## Categories
//!
//! Events and each special kind (`start`, `descriptor`, `stop`) are tracked in
//! independent windows. A `start` from one upstream never counts towards the
//! event window, and vice versa. Each window holds one slot per upstream and a
//! missing set, initially every upstream.
//!
//! ## Behavior
//!
//! On a document of kind `k` from upstream `i`: slot `i` of window `k` is
//! replaced and `i` leaves the window's missing set. If the missing set is now
//! empty and `i` is in the emission set, the window's slots are merged (the
//! payload's `custom_merge`, or a `Combined` document of kind `k`) and
//! emitted.
//!
//! By default the missing set is never refilled, so once every upstream has
//! reported, every further report from an emitting upstream emits again. With
//! [`CombineLatestConfig::reset_on_emit`] the missing set is refilled after each
//! emission and the next combination waits for a fresh report from everyone.

use crate::document::{DocKind, Document};
use crate::error::StreamError;
use crate::node::{BaseNode, Node, NodeResult};
use crate::nodes::common::{merge_tuple, validate_upstreams};
use crate::payload::Payload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// Configuration for CombineLatestNode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineLatestConfig {
  /// Upstreams whose reports trigger an emission. `None` means all of them.
  pub emit_on: Option<Vec<String>>,
  /// Refill the missing set after every emission.
  pub reset_on_emit: bool,
}

impl CombineLatestConfig {
  /// Restricts emission to reports from `emit_on`.
  pub fn with_emit_on(mut self, emit_on: Vec<String>) -> Self {
    self.emit_on = Some(emit_on);
    self
  }

  /// Sets whether the missing set is refilled after each emission.
  pub fn with_reset_on_emit(mut self, reset_on_emit: bool) -> Self {
    self.reset_on_emit = reset_on_emit;
    self
  }
}

/// Latest documents of one category.
struct Window<P> {
  slots: Vec<Option<Document<P>>>,
  missing: BTreeSet<usize>,
}

impl<P: Payload> Window<P> {
  fn new(count: usize) -> Self {
    Self {
      slots: vec![None; count],
      missing: (0..count).collect(),
    }
  }

  fn record(&mut self, index: usize, doc: Document<P>) {
    self.slots[index] = Some(doc);
    self.missing.remove(&index);
  }

  fn is_complete(&self) -> bool {
    self.missing.is_empty()
  }

  /// The slots as a tuple, once every slot has been filled.
  fn snapshot(&self) -> Option<Vec<Document<P>>> {
    self.slots.iter().cloned().collect()
  }

  fn reset(&mut self) {
    self.missing = (0..self.slots.len()).collect();
  }
}

/// A node that combines the latest document from every upstream.
pub struct CombineLatestNode<P: Payload> {
  base: BaseNode<P>,
  emit_on: Vec<bool>,
  reset_on_emit: bool,
  windows: Mutex<HashMap<DocKind, Window<P>>>,
}

impl<P: Payload> CombineLatestNode<P> {
  /// Creates a new CombineLatestNode that emits on reports from any upstream.
  pub fn new(name: impl Into<String>, upstreams: Vec<String>) -> Result<Self, StreamError> {
    Self::with_config(name, upstreams, CombineLatestConfig::default())
  }

  /// Creates a new CombineLatestNode with `config`.
  ///
  /// # Arguments
  ///
  /// * `name` - The node's name.
  /// * `upstreams` - The joined upstreams, in slot order.
  /// * `config` - Which upstreams trigger emission and whether the missing
  ///   sets are refilled after each one.
  ///
  /// # Errors
  ///
  /// [`StreamError::InvalidConfig`] for an empty or duplicated upstream list,
  /// or an `emit_on` entry that is not an upstream.
  pub fn with_config(
    name: impl Into<String>,
    upstreams: Vec<String>,
    config: CombineLatestConfig,
  ) -> Result<Self, StreamError> {
    let name = name.into();
    validate_upstreams(&name, &upstreams)?;
    trace!(
      "CombineLatestNode::with_config(name={}, upstreams={:?}, config={:?})",
      name, upstreams, config
    );

    let emit_on = match &config.emit_on {
      None => vec![true; upstreams.len()],
      Some(selected) => {
        if let Some(unknown) = selected.iter().find(|s| !upstreams.contains(*s)) {
          return Err(StreamError::invalid_config(
            &name,
            format!("emit_on names '{}', which is not an upstream", unknown),
          ));
        }
        upstreams.iter().map(|u| selected.contains(u)).collect()
      }
    };

    let count = upstreams.len();
    let windows: HashMap<DocKind, Window<P>> = DocKind::SPECIAL
      .iter()
      .chain(std::iter::once(&DocKind::Event))
      .map(|kind| (*kind, Window::new(count)))
      .collect();

    Ok(Self {
      base: BaseNode::new(name, upstreams),
      emit_on,
      reset_on_emit: config.reset_on_emit,
      windows: Mutex::new(windows),
    })
  }

  /// Names of the upstreams whose reports trigger an emission.
  pub fn emit_on(&self) -> Vec<&str> {
    self
      .upstream_names()
      .iter()
      .zip(&self.emit_on)
      .filter(|(_, emits)| **emits)
      .map(|(name, _)| name.as_str())
      .collect()
  }

  /// Upstreams that have not yet reported in the window of `kind`.
  pub async fn missing(&self, kind: DocKind) -> Vec<String> {
    let windows = self.windows.lock().await;
    match windows.get(&kind) {
      Some(window) => window
        .missing
        .iter()
        .map(|index| self.upstream_names()[*index].clone())
        .collect(),
      None => Vec::new(),
    }
  }
}

#[async_trait]
impl<P: Payload> Node<P> for CombineLatestNode<P> {
  fn base(&self) -> &BaseNode<P> {
    &self.base
  }

  async fn update(&self, doc: Document<P>, source: &str) -> NodeResult<P> {
    let index = self.base.upstream_index(source)?;
    let kind = doc.kind();
    let count = self.emit_on.len();

    let mut windows = self.windows.lock().await;
    let window = windows.entry(kind).or_insert_with(|| Window::new(count));
    window.record(index, doc);
    trace!(
      "CombineLatestNode::update(name={}, source={}, kind={}) -> missing={}",
      self.name(),
      source,
      kind,
      window.missing.len()
    );

    if !window.is_complete() || !self.emit_on[index] {
      return Ok(Vec::new());
    }
    let Some(tuple) = window.snapshot() else {
      return Ok(Vec::new());
    };
    if self.reset_on_emit {
      window.reset();
    }
    drop(windows);

    debug!(node = self.name(), %kind, width = tuple.len(), "emitting latest combination");
    self.emit(merge_tuple(kind, tuple)).await
  }
}
