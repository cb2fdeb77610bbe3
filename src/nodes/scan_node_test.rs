//! Tests for ScanNode

use crate::document::{DocKind, Document, Failure};
use crate::node::Node;
use crate::nodes::collect_node::CollectNode;
use crate::nodes::scan_node::{ScanNode, ScanState};
use crate::nodes::source_node::SourceNode;
use crate::payload::reduce_fn;
use serde_json::json;
use std::sync::Arc;

fn wire<P: crate::payload::Payload>(
  scan: ScanNode<P>,
) -> (SourceNode<P>, Arc<ScanNode<P>>, Arc<CollectNode<P>>) {
  let source = SourceNode::<P>::new("src");
  let scan = Arc::new(scan);
  let out = Arc::new(CollectNode::new("out", "scan"));
  source.connect(scan.clone());
  scan.connect(out.clone());
  (source, scan, out)
}

#[tokio::test]
async fn test_running_sum_seeded_by_first_event() {
  let (source, scan, out) = wire(ScanNode::new(
    "scan",
    "src",
    reduce_fn(|state: &i64, x: &i64| Ok(state + x)),
  ));
  assert!(matches!(scan.state().await, ScanState::Uninitialized));

  for x in [1, 2, 3] {
    source.emit(Document::event(x)).await.unwrap();
  }
  assert_eq!(out.payloads().await, vec![1, 3, 6]);
  assert!(matches!(scan.state().await, ScanState::Value(6)));
}

#[tokio::test]
async fn test_explicit_initial_state() {
  let (source, _, out) = wire(
    ScanNode::new("scan", "src", reduce_fn(|state: &i64, x: &i64| Ok(state * x))).with_initial(10),
  );
  source.emit(Document::event(2)).await.unwrap();
  source.emit(Document::event(3)).await.unwrap();
  assert_eq!(out.payloads().await, vec![20, 60]);
}

#[tokio::test]
async fn test_initializer_runs_once() {
  let (source, _, out) = wire(
    ScanNode::new("scan", "src", reduce_fn(|state: &i64, x: &i64| Ok(state + x)))
      .with_initializer(|first: &i64| first * 100),
  );
  source.emit(Document::event(1)).await.unwrap();
  source.emit(Document::event(2)).await.unwrap();
  assert_eq!(out.payloads().await, vec![100, 102]);
}

#[tokio::test]
async fn test_special_kinds_pass_without_touching_state() {
  let (source, scan, out) = wire(ScanNode::new(
    "scan",
    "src",
    reduce_fn(|state: &i64, x: &i64| Ok(state + x)),
  ));
  source.emit(Document::start(50)).await.unwrap();
  source.emit(Document::event(1)).await.unwrap();
  source.emit(Document::stop(50)).await.unwrap();

  let kinds: Vec<DocKind> = out.collected().await.iter().map(Document::kind).collect();
  assert_eq!(kinds, vec![DocKind::Start, DocKind::Event, DocKind::Stop]);
  assert!(matches!(scan.state().await, ScanState::Value(1)));
}

#[tokio::test]
async fn test_failure_leaves_state_unchanged() {
  let (source, scan, out) = wire(ScanNode::new(
    "scan",
    "src",
    reduce_fn(|state: &i64, x: &i64| {
      if *x == 0 {
        Err(Failure::new("zero is not allowed"))
      } else {
        Ok(state + x)
      }
    }),
  ));
  source.emit(Document::event(5)).await.unwrap();
  source.emit(Document::event(0)).await.unwrap();
  source.emit(Document::event(1)).await.unwrap();

  let collected = out.collected().await;
  assert_eq!(collected.len(), 3);
  let failure = collected[1].failure().unwrap();
  assert_eq!(failure.origin.as_deref(), Some("scan"));
  assert_eq!(collected[2].payload(), Some(&6));
}

#[tokio::test]
async fn test_state_key_injects_accumulator() {
  let (source, _, out) = wire(
    ScanNode::new(
      "scan",
      "src",
      reduce_fn(|_state: &serde_json::Value, payload: &serde_json::Value| {
        let seen = payload["acc"]["count"].as_i64().unwrap_or_default();
        Ok(json!({ "count": seen + 1, "last": payload["x"].clone() }))
      }),
    )
    .with_initial(json!({ "count": 0 }))
    .with_state_key("acc"),
  );
  source.emit(Document::event(json!({ "x": "a" }))).await.unwrap();
  source.emit(Document::event(json!({ "x": "b" }))).await.unwrap();

  assert_eq!(
    out.payloads().await,
    vec![
      json!({ "count": 1, "last": "a" }),
      json!({ "count": 2, "last": "b" }),
    ]
  );
}

/// Payload that accumulates digits itself instead of using the node's function.
#[derive(Debug, Clone, PartialEq)]
struct Digits(i64);

impl crate::payload::Payload for Digits {
  fn custom_reduce(
    &self,
    _function: &crate::payload::ReduceFn<Self>,
    state: &Self,
  ) -> Option<Result<Self, Failure>> {
    Some(Ok(Digits(state.0 * 10 + self.0)))
  }
}

#[tokio::test]
async fn test_custom_reduce_replaces_function() {
  let (source, _, out) = wire(ScanNode::new(
    "scan",
    "src",
    reduce_fn(|state: &Digits, x: &Digits| Ok(Digits(state.0 + x.0))),
  ));
  for x in [1, 2, 3] {
    source.emit(Document::event(Digits(x))).await.unwrap();
  }
  assert_eq!(
    out.payloads().await,
    vec![Digits(1), Digits(12), Digits(123)]
  );
}
