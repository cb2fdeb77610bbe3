//! # Documents
//!
//! The envelope that flows through every node: a [`DocKind`] tag plus a shared,
//! immutable [`Body`].
//!
//! A run is opened by a `start` document and closed by a `stop` document.
//! `descriptor` documents describe the shape of the `event` documents that
//! follow them, and `event` documents carry the data points.
//!
//! ## Zero-Copy
//!
//! The body is held behind an `Arc`, so cloning a document for fan-out only
//! bumps a reference count. Nodes never mutate a body in place; transforms
//! build new documents instead.
//!
//! ## Failures As Data
//!
//! When a user function fails inside `map` or `scan`, the failure is wrapped
//! into an `event` document with a [`Body::Failed`] body and keeps flowing
//! downstream. Consumers must be prepared to see these documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The kind tag carried by every document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
  /// Opens a run.
  Start,
  /// Describes the shape of the events that follow.
  Descriptor,
  /// A single data point.
  Event,
  /// Closes a run.
  Stop,
}

impl DocKind {
  /// The kinds that are routed straight through transforms and tracked
  /// separately from events by `combine_latest`.
  pub const SPECIAL: [DocKind; 3] = [DocKind::Start, DocKind::Descriptor, DocKind::Stop];

  /// Returns `true` for `start`, `descriptor` and `stop`.
  pub fn is_special(self) -> bool {
    !matches!(self, DocKind::Event)
  }

  /// Lowercase name of the kind.
  pub fn as_str(self) -> &'static str {
    match self {
      DocKind::Start => "start",
      DocKind::Descriptor => "descriptor",
      DocKind::Event => "event",
      DocKind::Stop => "stop",
    }
  }
}

impl fmt::Display for DocKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A failure raised by a user-supplied function, carried as data.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct Failure {
  /// Human readable description of what went wrong.
  pub message: String,
  /// Name of the node whose function failed, when known.
  pub origin: Option<String>,
  /// When the failure was captured.
  pub occurred_at: DateTime<Utc>,
}

impl Failure {
  /// Creates a failure stamped with the current time and no origin.
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      origin: None,
      occurred_at: Utc::now(),
    }
  }

  /// Records the node that produced this failure.
  ///
  /// An origin that is already set is kept, so a failure forwarded through
  /// several transforms still names the node where it was first captured.
  pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
    if self.origin.is_none() {
      self.origin = Some(origin.into());
    }
    self
  }
}

impl From<String> for Failure {
  fn from(message: String) -> Self {
    Failure::new(message)
  }
}

impl From<&str> for Failure {
  fn from(message: &str) -> Self {
    Failure::new(message)
  }
}

/// What a document carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Body<P> {
  /// An ordinary payload.
  Data(P),
  /// A failure captured from a user function.
  Failed(Failure),
  /// A tuple of documents produced by a join that had no custom merge.
  Combined(Vec<Document<P>>),
}

/// An immutable `(kind, body)` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<P> {
  kind: DocKind,
  body: Arc<Body<P>>,
}

impl<P> Document<P> {
  /// Creates a document of `kind` carrying `payload`.
  pub fn new(kind: DocKind, payload: P) -> Self {
    Self::from_body(kind, Body::Data(payload))
  }

  /// Creates a document from an already built body.
  pub fn from_body(kind: DocKind, body: Body<P>) -> Self {
    Self {
      kind,
      body: Arc::new(body),
    }
  }

  /// Creates a document that shares `body` with another document.
  pub fn from_shared(kind: DocKind, body: Arc<Body<P>>) -> Self {
    Self { kind, body }
  }

  /// A `start` document.
  pub fn start(payload: P) -> Self {
    Self::new(DocKind::Start, payload)
  }

  /// A `descriptor` document.
  pub fn descriptor(payload: P) -> Self {
    Self::new(DocKind::Descriptor, payload)
  }

  /// An `event` document.
  pub fn event(payload: P) -> Self {
    Self::new(DocKind::Event, payload)
  }

  /// A `stop` document.
  pub fn stop(payload: P) -> Self {
    Self::new(DocKind::Stop, payload)
  }

  /// An `event` document carrying a failure.
  pub fn failed(failure: Failure) -> Self {
    Self::from_body(DocKind::Event, Body::Failed(failure))
  }

  /// A document of `kind` carrying an un-merged tuple of documents.
  pub fn combined(kind: DocKind, parts: Vec<Document<P>>) -> Self {
    Self::from_body(kind, Body::Combined(parts))
  }

  /// The document's kind.
  pub fn kind(&self) -> DocKind {
    self.kind
  }

  /// The document's body.
  pub fn body(&self) -> &Body<P> {
    &self.body
  }

  /// The shared body, for building a new document over the same data.
  pub fn shared_body(&self) -> &Arc<Body<P>> {
    &self.body
  }

  /// The payload when the body is [`Body::Data`].
  pub fn payload(&self) -> Option<&P> {
    match self.body.as_ref() {
      Body::Data(payload) => Some(payload),
      _ => None,
    }
  }

  /// The failure when the body is [`Body::Failed`].
  pub fn failure(&self) -> Option<&Failure> {
    match self.body.as_ref() {
      Body::Failed(failure) => Some(failure),
      _ => None,
    }
  }

  /// The tuple when the body is [`Body::Combined`].
  pub fn parts(&self) -> Option<&[Document<P>]> {
    match self.body.as_ref() {
      Body::Combined(parts) => Some(parts),
      _ => None,
    }
  }

  /// Returns `true` for `event` documents.
  pub fn is_event(&self) -> bool {
    self.kind == DocKind::Event
  }

  /// Returns `true` when the body is a captured failure.
  pub fn is_failure(&self) -> bool {
    matches!(self.body.as_ref(), Body::Failed(_))
  }
}
