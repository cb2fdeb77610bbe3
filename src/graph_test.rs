//! # Graph Test Suite
//!
//! Tests for [`Graph`]: node registration, wiring checks and driving
//! documents through a wired graph.

use crate::document::{DocKind, Document};
use crate::error::StreamError;
use crate::graph::Graph;
use crate::nodes::collect_node::CollectNode;
use crate::nodes::common::names;
use crate::nodes::filter_node::{FilterNode, Predicate};
use crate::nodes::source_node::SourceNode;
use crate::nodes::zip_node::ZipNode;
use std::sync::Arc;

fn linear_graph() -> (Graph<i64>, Arc<CollectNode<i64>>) {
  let mut graph = Graph::new("linear");
  let out = Arc::new(CollectNode::<i64>::new("out", "positive"));
  graph.add_node(Arc::new(SourceNode::<i64>::new("src"))).unwrap();
  graph
    .add_node(Arc::new(FilterNode::<i64>::new(
      "positive",
      "src",
      Predicate::raw(|x: &i64| *x > 0),
    )))
    .unwrap();
  graph.add_node(out.clone()).unwrap();
  graph.connect("src", "positive").unwrap();
  graph.connect("positive", "out").unwrap();
  (graph, out)
}

#[test]
fn test_graph_registry() {
  let (graph, _) = linear_graph();
  assert_eq!(graph.name(), "linear");
  assert_eq!(graph.len(), 3);
  assert!(!graph.is_empty());
  assert_eq!(graph.node_names(), vec!["out", "positive", "src"]);
  assert!(graph.node("src").is_some());
  assert!(graph.node("missing").is_none());
}

#[test]
fn test_duplicate_node_rejected() {
  let mut graph = Graph::<i64>::new("g");
  graph.add_node(Arc::new(SourceNode::<i64>::new("src"))).unwrap();
  let err = graph.add_node(Arc::new(SourceNode::<i64>::new("src"))).unwrap_err();
  assert_eq!(err, StreamError::DuplicateNode("src".to_string()));
}

#[test]
fn test_connect_checks_names() {
  let mut graph = Graph::<i64>::new("g");
  graph.add_node(Arc::new(SourceNode::<i64>::new("src"))).unwrap();
  graph.add_node(Arc::new(SourceNode::<i64>::new("other"))).unwrap();
  graph
    .add_node(Arc::new(CollectNode::<i64>::new("out", "src")))
    .unwrap();

  assert_eq!(
    graph.connect("src", "nowhere"),
    Err(StreamError::UnknownNode("nowhere".to_string()))
  );
  assert_eq!(
    graph.connect("other", "out"),
    Err(StreamError::UnknownUpstream {
      node: "out".to_string(),
      upstream: "other".to_string(),
    })
  );
  // Sources declare no upstreams and accept any feed.
  assert!(graph.connect("other", "src").is_ok());
}

#[tokio::test]
async fn test_emit_through_graph() {
  let (graph, out) = linear_graph();
  let results = graph.emit("src", Document::event(3)).await.unwrap();
  assert_eq!(results, vec![Document::event(3)]);
  assert!(graph.emit("src", Document::event(-3)).await.unwrap().is_empty());
  assert_eq!(out.payloads().await, vec![3]);

  let err = graph.emit("nope", Document::event(1)).await.unwrap_err();
  assert_eq!(err, StreamError::UnknownNode("nope".to_string()));
}

#[tokio::test]
async fn test_drive_stream_through_graph() {
  let (graph, out) = linear_graph();
  let docs = vec![
    Document::start(0),
    Document::event(-1),
    Document::event(2),
    Document::stop(0),
  ];
  let results = graph.drive("src", futures::stream::iter(docs)).await.unwrap();
  let kinds: Vec<DocKind> = results.iter().map(Document::kind).collect();
  assert_eq!(kinds, vec![DocKind::Start, DocKind::Event, DocKind::Stop]);
  assert_eq!(out.payloads().await, vec![0, 2, 0]);
}

#[tokio::test]
async fn test_join_wired_by_graph() {
  let mut graph = Graph::<i64>::new("join");
  let out = Arc::new(CollectNode::<i64>::new("out", "zip"));
  graph.add_node(Arc::new(SourceNode::<i64>::new("a"))).unwrap();
  graph.add_node(Arc::new(SourceNode::<i64>::new("b"))).unwrap();
  graph
    .add_node(Arc::new(ZipNode::<i64>::new("zip", names(["a", "b"])).unwrap()))
    .unwrap();
  graph.add_node(out.clone()).unwrap();
  graph.connect("a", "zip").unwrap();
  graph.connect("b", "zip").unwrap();
  graph.connect("zip", "out").unwrap();

  graph.emit("a", Document::event(1)).await.unwrap();
  graph.emit("b", Document::event(2)).await.unwrap();
  let collected = out.collected().await;
  assert_eq!(collected.len(), 1);
  assert_eq!(collected[0].parts().map(<[_]>::len), Some(2));
}
