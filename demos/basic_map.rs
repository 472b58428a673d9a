//! A small map run two ways: directly with [`Map`], and as a workflow step
//! with [`MapNode`] reading its items from shared state.
//!
//! Run with `cargo run --example basic_map`.

use fanmap::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Pretend lookup that takes longer for shorter names and rejects blanks.
fn lookup() -> Arc<dyn Invocation> {
    invocation_fn(|args: Vec<NodeValue>| async move {
        let name = args[0].as_str().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(ItemError::failed("blank name"));
        }
        tokio::time::sleep(Duration::from_millis(50 / name.len() as u64)).await;
        Ok(json!({"user": name, "id": name.len() * 7}))
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), MapError> {
    // Direct use
    let done = Map::new(lookup())
        .with_concurrency(2)
        .with_argfn(|item: &NodeValue, _pos: usize| {
            json!([item.as_str().unwrap_or_default().trim()])
        })
        .with_mapper(|value: &NodeValue, _args: &[NodeValue]| value["id"].clone())
        .with_replace(true)
        .run(vec![json!(" ada "), json!(""), json!("grace")])
        .await?;

    for (i, input) in done.inputs.iter().enumerate() {
        match (&done.outputs[i], &done.errors[i]) {
            (Some(out), None) => println!("✅ {} -> {}", input, out),
            (None, Some(err)) => println!("❌ {} -> {}", input, err),
            _ => unreachable!("exactly one slot is set per position"),
        }
    }

    // As a workflow step
    let mut registry = InvocationRegistry::new();
    registry.register("lookup", lookup());

    let mut node = MapNode::new(Arc::new(registry));
    node.set_params(HashMap::from([
        ("over".to_string(), json!("users")),
        ("map".to_string(), json!("lookup")),
        ("par".to_string(), json!(3)),
        ("name".to_string(), json!("lookups")),
    ]));

    let mut shared = HashMap::new();
    shared.insert("users".to_string(), json!(["linus", "barbara", "ken"]));

    let action = node.run(&mut shared).await?;
    println!("action: {}", action);
    println!("result: {}", shared["lookups"]);
    Ok(())
}
