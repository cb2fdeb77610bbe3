//! Tests for FilterNode

use crate::document::{DocKind, Document, Failure};
use crate::node::Node;
use crate::nodes::collect_node::CollectNode;
use crate::nodes::filter_node::{FilterNode, Predicate};
use crate::nodes::source_node::SourceNode;
use std::sync::Arc;

fn pipeline(predicate: Predicate<i64>) -> (SourceNode<i64>, Arc<CollectNode<i64>>) {
  let source = SourceNode::<i64>::new("src");
  let filter = Arc::new(FilterNode::new("filter", "src", predicate));
  let out = Arc::new(CollectNode::new("out", "filter"));
  source.connect(filter.clone());
  filter.connect(out.clone());
  (source, out)
}

#[tokio::test]
async fn test_filter_keeps_matching_events() {
  let (source, out) = pipeline(Predicate::raw(|x: &i64| *x > 0));
  for x in [-1, 2, -3, 4] {
    source.emit(Document::event(x)).await.unwrap();
  }
  assert_eq!(out.payloads().await, vec![2, 4]);
}

#[tokio::test]
async fn test_rejected_event_returns_nothing() {
  let (source, _) = pipeline(Predicate::raw(|x: &i64| *x > 0));
  let results = source.emit(Document::event(-5)).await.unwrap();
  assert!(results.is_empty());
}

#[tokio::test]
async fn test_filter_passes_special_kinds() {
  let (source, out) = pipeline(Predicate::raw(|_: &i64| false));
  source.emit(Document::start(-1)).await.unwrap();
  source.emit(Document::event(-1)).await.unwrap();
  source.emit(Document::stop(-1)).await.unwrap();

  let kinds: Vec<DocKind> = out.collected().await.iter().map(Document::kind).collect();
  assert_eq!(kinds, vec![DocKind::Start, DocKind::Stop]);
}

#[tokio::test]
async fn test_document_predicate_sees_whole_document() {
  let (source, out) = pipeline(Predicate::document(|doc: &Document<i64>| !doc.is_failure()));
  source.emit(Document::event(1)).await.unwrap();
  source
    .emit(Document::failed(Failure::new("bad")))
    .await
    .unwrap();
  assert_eq!(out.collected().await, vec![Document::event(1)]);
}

#[tokio::test]
async fn test_raw_predicate_lets_failures_through() {
  let (source, out) = pipeline(Predicate::raw(|_: &i64| false));
  source
    .emit(Document::failed(Failure::new("bad")))
    .await
    .unwrap();
  let collected = out.collected().await;
  assert_eq!(collected.len(), 1);
  assert!(collected[0].is_failure());
}
