use crate::core::NodeValue;
use crate::core::batch::Concurrency;
use crate::core::error::{MapError, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Event prefix used when no `name` param is given.
pub const DEFAULT_NAME: &str = "map";

/// Where a map node takes its items from.
#[derive(Debug, Clone, PartialEq)]
pub enum OverSource {
    /// Items given inline in the params.
    Items(Vec<NodeValue>),
    /// A key into the shared state holding the items.
    Key(String),
}

/// Produces the item sequence from the shared state.
pub trait OverFn: Send + Sync + 'static {
    fn produce(&self, shared: &HashMap<String, NodeValue>) -> NodeValue;
}

impl<F> OverFn for F
where
    F: Fn(&HashMap<String, NodeValue>) -> NodeValue + Send + Sync + 'static,
{
    fn produce(&self, shared: &HashMap<String, NodeValue>) -> NodeValue {
        self(shared)
    }
}

/// The plain-data part of a map's configuration, as read from node params.
///
/// Recognised keys: `name`, `over`, `map`, `par` and `replace`. Other keys
/// are left for the host.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub name: String,
    pub over: Option<OverSource>,
    /// Registry name of the invocation.
    pub op: Option<String>,
    pub concurrency: Concurrency,
    pub replace: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            name: DEFAULT_NAME.to_string(),
            over: None,
            op: None,
            concurrency: Concurrency::Unbounded,
            replace: false,
        }
    }
}

#[derive(Deserialize)]
struct RawParams {
    name: Option<String>,
    map: Option<String>,
    #[serde(default)]
    replace: bool,
}

impl MapConfig {
    pub fn from_params(params: &HashMap<String, NodeValue>) -> Result<Self> {
        let object: serde_json::Map<String, NodeValue> = ["name", "map", "replace"]
            .iter()
            .filter_map(|key| {
                params
                    .get(*key)
                    .filter(|v| !v.is_null())
                    .map(|v| (key.to_string(), v.clone()))
            })
            .collect();
        let raw: RawParams =
            serde_json::from_value(NodeValue::Object(object)).map_err(|e| MapError::InvalidParam {
                name: "params".to_string(),
                reason: e.to_string(),
            })?;

        let name = match raw.name {
            Some(name) if name.is_empty() => {
                return Err(MapError::InvalidParam {
                    name: "name".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
            Some(name) => name,
            None => DEFAULT_NAME.to_string(),
        };

        Ok(MapConfig {
            name,
            over: parse_over(params.get("over"))?,
            op: raw.map,
            concurrency: parse_par(params.get("par"))?,
            replace: raw.replace,
        })
    }
}

fn parse_over(value: Option<&NodeValue>) -> Result<Option<OverSource>> {
    match value {
        None | Some(NodeValue::Null) => Ok(None),
        Some(NodeValue::Array(items)) => Ok(Some(OverSource::Items(items.clone()))),
        Some(NodeValue::String(key)) => Ok(Some(OverSource::Key(key.clone()))),
        Some(other) => Err(MapError::OverNotArray(other.to_string())),
    }
}

/// Absent, `null` and `0` all mean unbounded.
fn parse_par(value: Option<&NodeValue>) -> Result<Concurrency> {
    match value {
        None | Some(NodeValue::Null) => Ok(Concurrency::Unbounded),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Concurrency::from)
            .ok_or_else(|| MapError::InvalidConcurrency(v.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, NodeValue)]) -> HashMap<String, NodeValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = MapConfig::from_params(&HashMap::new()).unwrap();
        assert_eq!(config, MapConfig::default());
        assert_eq!(config.name, "map");
    }

    #[test]
    fn test_full_params() {
        let config = MapConfig::from_params(&params(&[
            ("name", json!("resize")),
            ("over", json!("images")),
            ("map", json!("thumbnail")),
            ("par", json!(4)),
            ("replace", json!(true)),
            ("unrelated", json!({"left": "for the host"})),
        ]))
        .unwrap();

        assert_eq!(config.name, "resize");
        assert_eq!(config.over, Some(OverSource::Key("images".into())));
        assert_eq!(config.op.as_deref(), Some("thumbnail"));
        assert_eq!(config.concurrency, Concurrency::from(4));
        assert!(config.replace);
    }

    #[test]
    fn test_inline_items_and_zero_par() {
        let config =
            MapConfig::from_params(&params(&[("over", json!([1, 2])), ("par", json!(0))])).unwrap();
        assert_eq!(config.over, Some(OverSource::Items(vec![json!(1), json!(2)])));
        assert_eq!(config.concurrency, Concurrency::Unbounded);
    }

    #[test]
    fn test_bad_par() {
        for bad in [json!(-1), json!(1.5), json!("2")] {
            let err = MapConfig::from_params(&params(&[("par", bad.clone())])).unwrap_err();
            assert_eq!(err, MapError::InvalidConcurrency(bad.to_string()));
        }
    }

    #[test]
    fn test_bad_over() {
        let err = MapConfig::from_params(&params(&[("over", json!({"a": 1}))])).unwrap_err();
        assert!(matches!(err, MapError::OverNotArray(_)));
    }

    #[test]
    fn test_bad_replace_type() {
        let err = MapConfig::from_params(&params(&[("replace", json!("yes"))])).unwrap_err();
        assert!(matches!(err, MapError::InvalidParam { .. }));
        assert!(!err.is_protocol_violation());
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = MapConfig::from_params(&params(&[("name", json!(""))])).unwrap_err();
        assert!(matches!(err, MapError::InvalidParam { ref name, .. } if name == "name"));
    }
}
