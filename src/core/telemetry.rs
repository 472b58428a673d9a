use crate::core::NodeValue;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// A single invocation in the execution trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEntry {
    pub timestamp: u64,
    pub batch_id: Uuid,
    pub position: usize,
    pub args: Vec<NodeValue>,
    /// The raw success value, before any transform. `None` on failure.
    pub output: Option<NodeValue>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Trait for recording execution traces.
pub trait Telemetry: Send + Sync {
    fn record(&self, entry: TraceEntry);
    fn flush(&self);
}

/// Simple in-memory collector for traces.
#[derive(Default)]
pub struct MemoryTelemetry {
    traces: Mutex<Vec<TraceEntry>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_traces(&self) -> Vec<TraceEntry> {
        self.traces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Traces for one batch, in position order.
    pub fn batch_traces(&self, batch_id: Uuid) -> Vec<TraceEntry> {
        let mut traces: Vec<TraceEntry> = self
            .get_traces()
            .into_iter()
            .filter(|t| t.batch_id == batch_id)
            .collect();
        traces.sort_by_key(|t| t.position);
        traces
    }
}

impl Telemetry for MemoryTelemetry {
    fn record(&self, entry: TraceEntry) {
        self.traces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    fn flush(&self) {
        // No-op for memory collector
    }
}

pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(batch_id: Uuid, position: usize) -> TraceEntry {
        TraceEntry {
            timestamp: unix_now(),
            batch_id,
            position,
            args: vec![json!(position)],
            output: Some(json!(position * 10)),
            error: None,
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_memory_telemetry_filters_by_batch() {
        let telemetry = MemoryTelemetry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        telemetry.record(entry(a, 2));
        telemetry.record(entry(b, 0));
        telemetry.record(entry(a, 0));

        assert_eq!(telemetry.get_traces().len(), 3);
        let positions: Vec<usize> = telemetry.batch_traces(a).iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 2]);
    }

    #[test]
    fn test_trace_entry_serializes() {
        let e = entry(Uuid::nil(), 1);
        let value = serde_json::to_value(&e).unwrap();
        assert_eq!(value["position"], json!(1));
        assert_eq!(value["output"], json!(10));
        let back: TraceEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, e);
    }
}
