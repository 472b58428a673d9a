//! Synchronous bookkeeping for one map batch.
//!
//! Nothing in here awaits or spawns. The async driver in
//! [`async_impl`](crate::core::async_impl) owns a [`Batch`] and feeds it
//! outcome messages one at a time, so none of this needs locking:
//! - [`Launcher`] decides which positions may start
//! - [`Collector`] writes outcomes into their slots
//! - [`Tracker`] detects the last completion
//! - [`Transform`] and [`ArgFn`] are the caller's hooks around each invocation

pub mod collector;
pub mod launcher;
pub mod tracker;
pub mod transform;

pub use collector::Collector;
pub use launcher::{Concurrency, Launcher};
pub use tracker::{Progress, Tracker};
pub use transform::{ArgFn, Transform, build_arguments};

use crate::core::NodeValue;
use crate::core::error::{ItemError, MapError, Result};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// What one invocation produced.
pub type Outcome = std::result::Result<NodeValue, ItemError>;

/// One invocation's report back to its batch.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeMessage {
    pub position: usize,
    /// The arguments the invocation was called with.
    pub args: Vec<NodeValue>,
    pub outcome: Outcome,
}

/// The terminal signal of a batch. Emitted once, carrying the output,
/// input and error sequences in input order.
///
/// For every position exactly one of `outputs[i]` and `errors[i]` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDone {
    pub batch_id: Uuid,
    pub outputs: Vec<Option<NodeValue>>,
    pub inputs: Vec<NodeValue>,
    pub errors: Vec<Option<ItemError>>,
}

impl MapDone {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn succeeded(&self, position: usize) -> bool {
        self.errors.get(position).is_some_and(Option::is_none)
    }

    pub fn failed_positions(&self) -> Vec<usize> {
        self.errors
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|_| i))
            .collect()
    }

    pub fn into_parts(self) -> (Vec<Option<NodeValue>>, Vec<NodeValue>, Vec<Option<ItemError>>) {
        (self.outputs, self.inputs, self.errors)
    }

    /// The `[out, in, err]` triple as JSON. Unset slots are `null`.
    pub fn to_value(&self) -> NodeValue {
        let outputs: Vec<NodeValue> = self
            .outputs
            .iter()
            .map(|o| o.clone().unwrap_or(NodeValue::Null))
            .collect();
        let errors: Vec<NodeValue> = self
            .errors
            .iter()
            .map(|e| match e {
                Some(err) => NodeValue::String(err.to_string()),
                None => NodeValue::Null,
            })
            .collect();
        json!([outputs, self.inputs, errors])
    }
}

/// Settings that shape a batch but do not change while it runs.
#[derive(Clone, Default)]
pub struct BatchSettings {
    pub concurrency: Concurrency,
    pub transform: Option<Arc<dyn Transform>>,
    pub replace: bool,
}

/// One execution of the map over one input sequence.
pub struct Batch {
    id: Uuid,
    arguments: Vec<Vec<NodeValue>>,
    launcher: Launcher,
    collector: Collector,
    tracker: Tracker,
}

impl Batch {
    /// `arguments[i]` is what position `i` will be invoked with.
    pub fn new(items: Vec<NodeValue>, arguments: Vec<Vec<NodeValue>>, settings: BatchSettings) -> Self {
        debug_assert_eq!(items.len(), arguments.len());
        let total = items.len();
        Batch {
            id: Uuid::new_v4(),
            arguments,
            launcher: Launcher::new(total, settings.concurrency),
            collector: Collector::new(items, settings.transform, settings.replace),
            tracker: Tracker::new(total),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.collector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collector.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.launcher.in_flight()
    }

    pub fn remaining(&self) -> usize {
        match self.tracker.completed() {
            Some(done) => self.len() - done,
            None => 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.tracker.is_complete()
    }

    /// Every position has been handed out at least once.
    pub fn is_fully_dispatched(&self) -> bool {
        self.launcher.dispatched() == self.len()
    }

    /// Positions to dispatch now, with the arguments for each.
    pub fn admit(&mut self) -> Vec<(usize, Vec<NodeValue>)> {
        self.launcher
            .admit()
            .into_iter()
            .map(|pos| (pos, self.arguments[pos].clone()))
            .collect()
    }

    /// Records one outcome. Returns the terminal signal when this was the
    /// last outstanding position.
    pub fn deliver(&mut self, msg: OutcomeMessage) -> Result<Option<MapDone>> {
        if self.tracker.is_complete() {
            log::error!("batch {}: outcome after completion", self.id);
            return Err(MapError::AlreadyComplete);
        }
        let position = msg.position;
        if position >= self.len() {
            return Err(MapError::PositionOutOfRange {
                position,
                total: self.len(),
            });
        }
        if self.collector.is_settled(position) {
            log::error!("batch {}: position {} reported twice", self.id, position);
            return Err(MapError::DuplicateOutcome(position));
        }

        self.launcher.complete(position)?;
        self.collector.on_outcome(msg)?;

        match self.tracker.record_completion()? {
            Progress::Pending(left) => {
                log::trace!("batch {}: {} outstanding", self.id, left);
                Ok(None)
            }
            Progress::Complete => Ok(Some(self.take_done())),
        }
    }

    /// The terminal signal for a zero-item batch.
    pub fn finish_empty(&mut self) -> Result<MapDone> {
        self.tracker.close_empty()?;
        Ok(self.take_done())
    }

    fn take_done(&mut self) -> MapDone {
        log::debug!(
            "batch {} complete: {} item(s), {} failed",
            self.id,
            self.len(),
            self.collector.errors.iter().filter(|e| e.is_some()).count()
        );
        MapDone {
            batch_id: self.id,
            outputs: std::mem::take(&mut self.collector.outputs),
            inputs: std::mem::take(&mut self.collector.inputs),
            errors: std::mem::take(&mut self.collector.errors),
        }
    }
}
