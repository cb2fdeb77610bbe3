//! # Error Handling
//!
//! Structural errors raised by nodes and graph wiring.
//!
//! ## Two Failure Channels
//!
//! - **Data-level failures** (a user function in `map` or `scan` fails) are
//!   never reported here. They are wrapped into an `event` document carrying a
//!   [`Failure`](crate::document::Failure) and keep flowing downstream.
//! - **Structural failures** are returned as [`StreamError`] from `update` and
//!   `emit`. The only fatal one raised while processing documents is
//!   [`StreamError::KindMismatch`]: `bundle` found heads of different kinds with
//!   no event to drain, so no alignment can ever make progress. The bundle stops
//!   accepting documents after reporting it.
//!
//! Everything else in this module is a wiring or configuration mistake caught
//! when the graph is assembled.

use crate::document::DocKind;
use std::fmt;
use thiserror::Error;

/// Information about a node, used when reporting errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
  /// The name of the node.
  pub name: String,
  /// The node's type name.
  pub type_name: String,
}

impl ComponentInfo {
  /// Creates a new `ComponentInfo` with the given name and type name.
  pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      type_name: type_name.into(),
    }
  }
}

impl fmt::Display for ComponentInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.name, self.type_name)
  }
}

/// Errors returned by node updates and graph wiring.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
  /// Buffered heads disagree on kind and none of them is an event.
  #[error("kind mismatch in {component}: heads are {kinds:?} and none is an event to drain")]
  KindMismatch {
    /// The node that detected the mismatch.
    component: ComponentInfo,
    /// The head kind of every buffer, in upstream order.
    kinds: Vec<DocKind>,
  },
  /// The node already failed structurally and refuses further documents.
  #[error("{component} halted after a structural failure")]
  Halted {
    /// The halted node.
    component: ComponentInfo,
  },
  /// A join node received a document from a source it was not built with.
  #[error("node '{node}' has no upstream named '{upstream}'")]
  UnknownUpstream {
    /// The receiving node.
    node: String,
    /// The unexpected sender.
    upstream: String,
  },
  /// A graph operation named a node that is not registered.
  #[error("no node named '{0}' in the graph")]
  UnknownNode(String),
  /// A node with this name is already registered.
  #[error("a node named '{0}' is already in the graph")]
  DuplicateNode(String),
  /// A node was constructed with unusable settings.
  #[error("invalid configuration for '{node}': {reason}")]
  InvalidConfig {
    /// The node being configured.
    node: String,
    /// What is wrong with it.
    reason: String,
  },
}

impl StreamError {
  /// Shorthand for [`StreamError::InvalidConfig`].
  pub fn invalid_config(node: impl Into<String>, reason: impl Into<String>) -> Self {
    StreamError::InvalidConfig {
      node: node.into(),
      reason: reason.into(),
    }
  }

  /// Returns `true` for errors after which the node cannot continue.
  pub fn is_fatal(&self) -> bool {
    matches!(
      self,
      StreamError::KindMismatch { .. } | StreamError::Halted { .. }
    )
  }
}
