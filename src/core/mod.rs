pub mod async_impl;
pub mod batch;
pub mod config;
pub mod error;
pub mod invocation;
pub mod registry;
pub mod telemetry;

/// The Alias for serde_json::Value, the payload of every item, argument and result
pub type NodeValue = serde_json::Value;
