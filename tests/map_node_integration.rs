//! Integration test for running a map as a workflow step
//!
//! Mirrors `demos/basic_map.rs`: named invocations in a registry, items in
//! the shared state, results written back under the map's name.

use fanmap::prelude::*;
use fanmap::{MemoryTelemetry, Telemetry};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn registry() -> Arc<InvocationRegistry> {
    let mut registry = InvocationRegistry::new();
    registry
        .register(
            "word_count",
            invocation_fn(|args: Vec<NodeValue>| async move {
                let Some(text) = args[0].as_str() else {
                    return Err(ItemError::failed("expected text"));
                };
                tokio::time::sleep(Duration::from_millis(text.len() as u64 % 5)).await;
                Ok(json!(text.split_whitespace().count()))
            }),
        )
        .register(
            "identity",
            invocation_fn(|args: Vec<NodeValue>| async move {
                Ok::<_, ItemError>(args.into_iter().next().unwrap_or(NodeValue::Null))
            }),
        );
    Arc::new(registry)
}

fn params(pairs: &[(&str, NodeValue)]) -> HashMap<String, NodeValue> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_map_node_end_to_end() {
    let telemetry = Arc::new(MemoryTelemetry::new());
    let mut node = MapNode::new(registry()).with_telemetry(telemetry.clone());
    node.set_params(params(&[
        ("name", json!("counts")),
        ("over", json!("docs")),
        ("map", json!("word_count")),
        ("par", json!(2)),
    ]));

    let mut shared = HashMap::new();
    shared.insert(
        "docs".to_string(),
        json!(["the quick brown fox", null, "", "jumps over"]),
    );

    let action = node.run(&mut shared).await.unwrap();
    assert_eq!(action, "counts.done");

    let result = &shared["counts"];
    assert_eq!(result["out"], json!([4, null, 0, 2]));
    assert_eq!(result["in"], json!(["the quick brown fox", null, "", "jumps over"]));
    assert_eq!(
        result["err"],
        json!([null, "invocation failed: expected text", null, null])
    );

    let traces = telemetry.get_traces();
    assert_eq!(traces.len(), 4);
    assert!(traces.iter().all(|t| t.batch_id == traces[0].batch_id));
    telemetry.flush();
}

#[tokio::test]
async fn test_map_node_empty_sequence() {
    let node = MapNode::new(registry());
    let mut shared = HashMap::new();
    shared.insert("docs".to_string(), json!([]));

    let action = node
        .run_with_params(
            &mut shared,
            &params(&[("over", json!("docs")), ("map", json!("identity"))]),
        )
        .await
        .unwrap();

    assert_eq!(action, "map.done");
    assert_eq!(shared["map"], json!({"out": [], "in": [], "err": []}));
}

#[tokio::test]
async fn test_map_nodes_chain_through_shared_state() {
    let registry = registry();
    let mut shared = HashMap::new();
    shared.insert("docs".to_string(), json!(["a b", "c"]));

    let first = MapNode::new(Arc::clone(&registry))
        .with_argfn(|item: &NodeValue, _pos: usize| json!([item.as_str().map(str::to_uppercase)]));
    first
        .run_with_params(
            &mut shared,
            &params(&[
                ("over", json!("docs")),
                ("map", json!("identity")),
                ("name", json!("upper")),
                ("replace", json!(true)),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(shared["docs"], json!(["A B", "C"]));

    // Second step reads the first step's output
    let second = MapNode::new(registry).with_over_fn(|shared: &HashMap<String, NodeValue>| {
        shared["upper"]["out"].clone()
    });
    let action = second
        .run_with_params(
            &mut shared,
            &params(&[("map", json!("word_count")), ("name", json!("counts"))]),
        )
        .await
        .unwrap();

    assert_eq!(action, "counts.done");
    assert_eq!(shared["counts"]["out"], json!([2, 1]));
}

#[tokio::test]
async fn test_map_node_config_error_runs_nothing() {
    let node = MapNode::new(registry());
    let mut shared = HashMap::new();

    let err = node
        .run_with_params(
            &mut shared,
            &params(&[("over", json!(42)), ("map", json!("identity"))]),
        )
        .await
        .unwrap_err();

    assert_eq!(err, MapError::OverNotArray("42".to_string()));
    assert!(!err.is_protocol_violation());
    assert!(shared.is_empty());
}
