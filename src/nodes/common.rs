//! # Common Node Utilities
//!
//! Shared building blocks for the join nodes: per-upstream FIFO buffers, the
//! backpressure signal, tuple merging and construction-time validation.

use crate::document::{DocKind, Document};
use crate::error::StreamError;
use crate::payload::Payload;
use std::collections::{HashSet, VecDeque};
use tokio::sync::{Mutex, Notify};
use tracing::{trace, warn};

/// One FIFO queue of documents per upstream, indexed by upstream position.
///
/// The number of queues is fixed at construction, so an upstream's index is
/// stable for the lifetime of the node.
#[derive(Debug)]
pub struct JoinBuffers<P> {
  queues: Vec<VecDeque<Document<P>>>,
}

impl<P: Payload> JoinBuffers<P> {
  /// Creates `count` empty queues.
  pub fn new(count: usize) -> Self {
    Self {
      queues: (0..count).map(|_| VecDeque::new()).collect(),
    }
  }

  /// Number of queues.
  pub fn count(&self) -> usize {
    self.queues.len()
  }

  /// Appends `doc` to queue `index` and returns the queue's new length.
  pub fn push(&mut self, index: usize, doc: Document<P>) -> usize {
    let queue = &mut self.queues[index];
    queue.push_back(doc);
    queue.len()
  }

  /// Puts `doc` back at the head of queue `index`.
  pub fn push_front(&mut self, index: usize, doc: Document<P>) {
    self.queues[index].push_front(doc);
  }

  /// Removes the head of queue `index`.
  pub fn pop_front(&mut self, index: usize) -> Option<Document<P>> {
    self.queues[index].pop_front()
  }

  /// Head of queue `index`.
  pub fn head(&self, index: usize) -> Option<&Document<P>> {
    self.queues[index].front()
  }

  /// Length of queue `index`.
  pub fn len(&self, index: usize) -> usize {
    self.queues[index].len()
  }

  /// Lengths of every queue, in upstream order.
  pub fn lens(&self) -> Vec<usize> {
    self.queues.iter().map(VecDeque::len).collect()
  }

  /// Returns `true` when every queue holds at least one document.
  pub fn all_non_empty(&self) -> bool {
    self.queues.iter().all(|queue| !queue.is_empty())
  }

  /// Kinds of the non-empty queue heads, in upstream order.
  pub fn head_kinds(&self) -> Vec<DocKind> {
    self
      .queues
      .iter()
      .filter_map(|queue| queue.front().map(Document::kind))
      .collect()
  }

  /// Pops one document from every queue, or nothing if any queue is empty.
  pub fn pop_round(&mut self) -> Option<Vec<Document<P>>> {
    if !self.all_non_empty() {
      return None;
    }
    self.queues.iter_mut().map(VecDeque::pop_front).collect()
  }
}

/// State that exposes join buffers to the backpressure wait.
pub trait Buffered {
  /// Payload type held in the buffers.
  type Payload: Payload;

  /// The node's join buffers.
  fn buffers(&self) -> &JoinBuffers<Self::Payload>;
}

/// Bounded-buffer backpressure shared by `zip` and `bundle`.
///
/// A producer whose buffer grows past `max_buffer` suspends until the node
/// makes progress. Progress is broadcast to every waiter, and each waiter
/// re-checks its own buffer before resuming.
#[derive(Debug)]
pub struct Backpressure {
  max_buffer: usize,
  space_freed: Notify,
}

impl Backpressure {
  /// Creates a backpressure gate for buffers holding at most `max_buffer` documents.
  pub fn new(max_buffer: usize) -> Self {
    Self {
      max_buffer,
      space_freed: Notify::new(),
    }
  }

  /// The configured capacity.
  pub fn max_buffer(&self) -> usize {
    self.max_buffer
  }

  /// Returns `true` when a buffer of `len` documents is over capacity.
  pub fn is_over(&self, len: usize) -> bool {
    len > self.max_buffer
  }

  /// Wakes every suspended producer.
  pub fn release(&self) {
    self.space_freed.notify_waiters();
  }

  /// Suspends until buffer `index` of `state` is back within capacity.
  pub async fn wait_for_capacity<S>(&self, node: &str, state: &Mutex<S>, index: usize)
  where
    S: Buffered + Send,
  {
    loop {
      // Register interest before checking so a release between the check
      // and the await is not lost.
      let notified = self.space_freed.notified();
      tokio::pin!(notified);
      notified.as_mut().enable();

      let len = state.lock().await.buffers().len(index);
      if !self.is_over(len) {
        trace!(
          "Backpressure::wait_for_capacity(node={}, index={}) -> resumed at len={}",
          node, index, len
        );
        return;
      }
      warn!(
        node,
        upstream_index = index,
        buffered = len,
        max_buffer = self.max_buffer,
        "buffer over capacity, suspending producer"
      );
      notified.await;
    }
  }
}

/// Merges a join tuple with the payload's custom merge, or keeps it as a
/// `Combined` document of `kind`.
pub fn merge_tuple<P: Payload>(kind: DocKind, tuple: Vec<Document<P>>) -> Document<P> {
  match P::custom_merge(&tuple) {
    Some(merged) => merged,
    None => Document::combined(kind, tuple),
  }
}

/// Checks a join node's upstream list: non-empty and without duplicates.
pub fn validate_upstreams(node: &str, upstreams: &[String]) -> Result<(), StreamError> {
  if upstreams.is_empty() {
    return Err(StreamError::invalid_config(
      node,
      "a join needs at least one upstream",
    ));
  }
  let mut seen = HashSet::new();
  for upstream in upstreams {
    if !seen.insert(upstream.as_str()) {
      return Err(StreamError::invalid_config(
        node,
        format!("upstream '{}' is listed more than once", upstream),
      ));
    }
  }
  Ok(())
}

/// Checks a buffer capacity.
pub fn validate_max_buffer(node: &str, max_buffer: usize) -> Result<(), StreamError> {
  if max_buffer == 0 {
    return Err(StreamError::invalid_config(
      node,
      "max_buffer must be at least 1",
    ));
  }
  Ok(())
}

/// Converts a list of names into owned strings.
pub fn names<I, S>(names: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: Into<String>,
{
  names.into_iter().map(Into::into).collect()
}
