use crate::core::NodeValue;
use crate::core::async_impl::map::Map;
use crate::core::batch::{ArgFn, MapDone, Transform};
use crate::core::config::{MapConfig, OverFn, OverSource};
use crate::core::error::{MapError, Result};
use crate::core::invocation::{Invocation, MapOp};
use crate::core::registry::InvocationRegistry;
use crate::core::telemetry::Telemetry;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// A map exposed as a workflow step.
///
/// Like any node it runs in three phases against the shared state:
/// 1. **Prep**: read the params, resolve the item sequence and the invocation
/// 2. **Exec**: run the batch
/// 3. **Post**: store `{"out", "in", "err"}` under the map's name and return
///    the `<name>.done` action
///
/// Every configuration problem surfaces in prep, before anything runs.
#[derive(Clone)]
pub struct MapNode {
    params: HashMap<String, NodeValue>,
    registry: Arc<InvocationRegistry>,
    op: Option<MapOp>,
    over_fn: Option<Arc<dyn OverFn>>,
    argfn: Option<Arc<dyn ArgFn>>,
    mapper: Option<Arc<dyn Transform>>,
    telemetry: Option<Arc<dyn Telemetry>>,
}

/// Everything prep hands to exec and post.
struct Prepared {
    map: Map,
    name: String,
    items: Vec<NodeValue>,
    /// Shared-state key the items came from, written back under `replace`.
    over_key: Option<String>,
    replace: bool,
}

impl MapNode {
    /// A node resolving `map` params against `registry`.
    pub fn new(registry: Arc<InvocationRegistry>) -> Self {
        MapNode {
            params: HashMap::new(),
            registry,
            op: None,
            over_fn: None,
            argfn: None,
            mapper: None,
            telemetry: None,
        }
    }

    /// A node with a fixed invocation and no registry.
    pub fn with_invocation(invocation: Arc<dyn Invocation>) -> Self {
        MapNode::new(Arc::new(InvocationRegistry::new())).with_op(MapOp::Direct(invocation))
    }

    /// Overrides the `map` param.
    pub fn with_op(self, op: impl Into<MapOp>) -> Self {
        MapNode {
            op: Some(op.into()),
            ..self
        }
    }

    /// Overrides the `over` param with a function of the shared state.
    pub fn with_over_fn<O: OverFn>(self, over: O) -> Self {
        MapNode {
            over_fn: Some(Arc::new(over)),
            ..self
        }
    }

    pub fn with_argfn<A: ArgFn>(self, argfn: A) -> Self {
        MapNode {
            argfn: Some(Arc::new(argfn)),
            ..self
        }
    }

    pub fn with_mapper<T: Transform>(self, mapper: T) -> Self {
        MapNode {
            mapper: Some(Arc::new(mapper)),
            ..self
        }
    }

    pub fn with_telemetry(self, telemetry: Arc<dyn Telemetry>) -> Self {
        MapNode {
            telemetry: Some(telemetry),
            ..self
        }
    }

    /// Sets the node's parameters.
    pub fn set_params(&mut self, params: HashMap<String, NodeValue>) {
        self.params = params;
    }

    pub fn params(&self) -> &HashMap<String, NodeValue> {
        &self.params
    }

    /// Runs the node with its stored params and returns the next action.
    pub async fn run(&self, shared: &mut HashMap<String, NodeValue>) -> Result<String> {
        self.run_with_params(shared, &self.params).await
    }

    /// Runs the node with one-off params, ignoring the stored ones.
    pub async fn run_with_params(
        &self,
        shared: &mut HashMap<String, NodeValue>,
        params: &HashMap<String, NodeValue>,
    ) -> Result<String> {
        let prepared = self.prep(params, shared)?;
        let done = prepared.map.run(prepared.items.clone()).await?;
        Ok(Self::post(shared, &prepared, done))
    }

    fn prep(
        &self,
        params: &HashMap<String, NodeValue>,
        shared: &HashMap<String, NodeValue>,
    ) -> Result<Prepared> {
        let config = MapConfig::from_params(params)?;

        let (over, over_key) = match (&self.over_fn, &config.over) {
            (Some(over_fn), _) => (over_fn.produce(shared), None),
            (None, Some(OverSource::Items(items))) => (NodeValue::Array(items.clone()), None),
            (None, Some(OverSource::Key(key))) => {
                let value = shared
                    .get(key)
                    .cloned()
                    .ok_or_else(|| MapError::MissingOver(key.clone()))?;
                (value, Some(key.clone()))
            }
            (None, None) => return Err(MapError::NoOverSource),
        };
        let items = match over {
            NodeValue::Array(items) => items,
            other => return Err(MapError::OverNotArray(other.to_string())),
        };

        let op = match (&self.op, &config.op) {
            (Some(op), _) => op.clone(),
            (None, Some(name)) => MapOp::Named(name.clone()),
            (None, None) => return Err(MapError::MissingInvocation),
        };

        let mut map = Map::from_op(&op, &self.registry)?
            .with_name(&config.name)
            .with_bound(config.concurrency)
            .with_replace(config.replace)
            .with_shared_argfn(self.argfn.clone())
            .with_shared_mapper(self.mapper.clone());
        if let Some(telemetry) = &self.telemetry {
            map = map.with_telemetry(Arc::clone(telemetry));
        }

        log::debug!(
            "{}: prepared {} item(s) with op {:?}",
            config.name,
            items.len(),
            op
        );
        Ok(Prepared {
            map,
            name: config.name,
            items,
            over_key,
            replace: config.replace,
        })
    }

    fn post(shared: &mut HashMap<String, NodeValue>, prepared: &Prepared, done: MapDone) -> String {
        let failed = done.failed_positions().len();
        let triple = done.to_value();
        shared.insert(
            prepared.name.clone(),
            json!({"out": triple[0], "in": triple[1], "err": triple[2]}),
        );
        if prepared.replace {
            if let Some(key) = &prepared.over_key {
                shared.insert(key.clone(), triple[1].clone());
            }
        }
        if failed > 0 {
            log::warn!("{}: {} of {} item(s) failed", prepared.name, failed, done.len());
        }
        prepared.map.done_event()
    }
}
