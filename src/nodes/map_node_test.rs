//! # Map Node Test Suite
//!
//! Tests for MapNode: event transformation, pass-through of non-event kinds,
//! failure capture and the payload's custom map hook.

use crate::document::{Body, DocKind, Document, Failure};
use crate::node::Node;
use crate::nodes::collect_node::CollectNode;
use crate::nodes::map_node::MapNode;
use crate::nodes::source_node::SourceNode;
use crate::payload::{MapFn, Payload, map_fn};
use proptest::prelude::*;
use std::sync::Arc;

/// Builds `src -> map -> out`.
fn pipeline<P: Payload>(
  function: MapFn<P>,
) -> (SourceNode<P>, Arc<MapNode<P>>, Arc<CollectNode<P>>) {
  let source = SourceNode::<P>::new("src");
  let map = Arc::new(MapNode::new("map", "src", function));
  let out = Arc::new(CollectNode::new("out", "map"));
  source.connect(map.clone());
  map.connect(out.clone());
  (source, map, out)
}

#[tokio::test]
async fn test_map_node_creation() {
  let (_, map, _) = pipeline(map_fn(|x: &i64| Ok(*x)));
  assert_eq!(map.name(), "map");
  assert_eq!(map.upstream_names().to_vec(), vec!["src"]);
  assert!(!map.is_raw());
}

#[tokio::test]
async fn test_map_node_transforms_events() {
  let (source, _, out) = pipeline(map_fn(|x: &i64| Ok(x * 10)));
  let results = source.emit(Document::event(3)).await.unwrap();
  assert_eq!(results, vec![Document::event(30)]);
  assert_eq!(out.payloads().await, vec![30]);
}

#[tokio::test]
async fn test_map_node_passes_special_kinds_unchanged() {
  let (source, _, out) = pipeline(map_fn(|x: &i64| Ok(x + 1)));
  let start = Document::start(100);
  source.emit(start.clone()).await.unwrap();
  source.emit(Document::descriptor(200)).await.unwrap();
  source.emit(Document::stop(300)).await.unwrap();

  let collected = out.collected().await;
  assert_eq!(collected[0], start);
  assert!(Arc::ptr_eq(collected[0].shared_body(), start.shared_body()));
  assert_eq!(out.payloads().await, vec![100, 200, 300]);
}

#[tokio::test]
async fn test_map_node_captures_failure_as_data() {
  let (source, _, out) = pipeline(map_fn(|x: &i64| {
    if *x < 0 {
      Err(Failure::new("negative input"))
    } else {
      Ok(*x)
    }
  }));

  source.emit(Document::event(-1)).await.unwrap();
  source.emit(Document::event(2)).await.unwrap();

  let collected = out.collected().await;
  assert_eq!(collected.len(), 2);
  assert_eq!(collected[0].kind(), DocKind::Event);
  let failure = collected[0].failure().unwrap();
  assert_eq!(failure.message, "negative input");
  assert_eq!(failure.origin.as_deref(), Some("map"));
  assert_eq!(collected[1].payload(), Some(&2));
}

#[tokio::test]
async fn test_map_node_forwards_incoming_failure_without_calling_function() {
  let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
  let counter = calls.clone();
  let (source, _, out) = pipeline(map_fn(move |x: &i64| {
    counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    Ok(*x)
  }));

  source
    .emit(Document::failed(Failure::new("upstream broke").with_origin("sensor")))
    .await
    .unwrap();

  assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
  let collected = out.collected().await;
  let failure = collected[0].failure().unwrap();
  assert_eq!(failure.origin.as_deref(), Some("sensor"));
}

/// Payload with its own map hook that negates instead of applying the function.
#[derive(Debug, Clone, PartialEq)]
struct Negating(i64);

impl Payload for Negating {
  fn custom_map(&self, _function: &MapFn<Self>) -> Option<Result<Self, Failure>> {
    Some(Ok(Negating(-self.0)))
  }
}

#[tokio::test]
async fn test_map_node_prefers_custom_map_unless_raw() {
  let function = map_fn(|x: &Negating| Ok(Negating(x.0 + 1)));

  let (source, _, out) = pipeline(function.clone());
  source.emit(Document::event(Negating(5))).await.unwrap();
  assert_eq!(out.payloads().await, vec![Negating(-5)]);

  let source = SourceNode::<Negating>::new("src");
  let map = Arc::new(MapNode::new("map", "src", function).with_raw(true));
  let out = Arc::new(CollectNode::new("out", "map"));
  source.connect(map.clone());
  map.connect(out.clone());
  assert!(map.is_raw());

  source.emit(Document::event(Negating(5))).await.unwrap();
  assert_eq!(out.payloads().await, vec![Negating(6)]);
}

#[tokio::test]
async fn test_map_node_json_combined_payload() {
  let (source, _, out) = pipeline(map_fn(|value: &serde_json::Value| {
    let total: i64 = value
      .as_array()
      .map(|items| items.iter().filter_map(serde_json::Value::as_i64).sum())
      .unwrap_or_default();
    Ok(serde_json::json!(total))
  }));

  let tuple = Document::combined(
    DocKind::Event,
    vec![
      Document::event(serde_json::json!(1)),
      Document::event(serde_json::json!(2)),
    ],
  );
  source.emit(tuple).await.unwrap();
  assert_eq!(out.payloads().await, vec![serde_json::json!(3)]);
}

#[tokio::test]
async fn test_map_node_default_payload_rejects_combined() {
  let (source, _, out) = pipeline(map_fn(|x: &i64| Ok(*x)));
  source
    .emit(Document::combined(DocKind::Event, vec![Document::event(1)]))
    .await
    .unwrap();
  let collected = out.collected().await;
  assert!(matches!(collected[0].body(), Body::Failed(_)));
}

proptest! {
  #[test]
  fn prop_map_passes_special_documents_through(
    kinds in prop::collection::vec(0usize..3, 1..20),
    payload in any::<i64>(),
  ) {
    futures::executor::block_on(async {
      let (source, _, out) = pipeline(map_fn(|x: &i64| Ok(x.wrapping_mul(2))));
      let mut sent = Vec::new();
      for kind in &kinds {
        let doc = Document::new(DocKind::SPECIAL[*kind], payload);
        sent.push(doc.clone());
        source.emit(doc).await.unwrap();
      }
      assert_eq!(out.collected().await, sent);
    });
  }
}
