use crate::core::NodeValue;
use crate::core::batch::{
    ArgFn, Batch, BatchSettings, Concurrency, MapDone, OutcomeMessage, Transform, build_arguments,
};
use crate::core::config::DEFAULT_NAME;
use crate::core::error::{ItemError, MapError, Result};
use crate::core::invocation::{Invocation, MapOp};
use crate::core::registry::InvocationRegistry;
use crate::core::telemetry::{Telemetry, TraceEntry, unix_now};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedSender};

/// What a spawned invocation sends back to the driver.
struct Delivery {
    msg: OutcomeMessage,
    elapsed: Duration,
}

/// The concurrent map combinator.
///
/// Invokes one [`Invocation`] per item with at most `par` of them
/// outstanding, and resolves to a single [`MapDone`] holding outputs,
/// inputs and errors in input order. A failing item never stops the rest
/// of the batch.
///
/// Each invocation runs in its own tokio task and reports over the batch's
/// channel. Only the driver loop in [`run`](Map::run) touches the batch
/// state. Dropping the `run` future abandons the batch: invocations already
/// started run to completion and their outcomes are discarded.
#[derive(Clone)]
pub struct Map {
    invocation: Arc<dyn Invocation>,
    name: String,
    argfn: Option<Arc<dyn ArgFn>>,
    transform: Option<Arc<dyn Transform>>,
    concurrency: Concurrency,
    replace: bool,
    telemetry: Option<Arc<dyn Telemetry>>,
}

impl Map {
    pub fn new(invocation: Arc<dyn Invocation>) -> Self {
        Map {
            invocation,
            name: DEFAULT_NAME.to_string(),
            argfn: None,
            transform: None,
            concurrency: Concurrency::Unbounded,
            replace: false,
            telemetry: None,
        }
    }

    /// Builds a map from a possibly-named op.
    pub fn from_op(op: &MapOp, registry: &InvocationRegistry) -> Result<Self> {
        Ok(Map::new(registry.resolve_op(op)?))
    }

    /// Per-item argument builder. Without one each invocation gets the item
    /// as its only argument.
    pub fn with_argfn<A: ArgFn>(self, argfn: A) -> Self {
        Map {
            argfn: Some(Arc::new(argfn)),
            ..self
        }
    }

    pub fn with_mapper<T: Transform>(self, transform: T) -> Self {
        Map {
            transform: Some(Arc::new(transform)),
            ..self
        }
    }

    pub(crate) fn with_shared_argfn(self, argfn: Option<Arc<dyn ArgFn>>) -> Self {
        Map { argfn, ..self }
    }

    pub(crate) fn with_shared_mapper(self, transform: Option<Arc<dyn Transform>>) -> Self {
        Map { transform, ..self }
    }

    /// Maximum invocations in flight. Zero means unbounded.
    pub fn with_concurrency(self, par: usize) -> Self {
        Map {
            concurrency: Concurrency::from(par),
            ..self
        }
    }

    pub(crate) fn with_bound(self, concurrency: Concurrency) -> Self {
        Map {
            concurrency,
            ..self
        }
    }

    /// On success, overwrite each input slot with the invocation's first argument.
    pub fn with_replace(self, replace: bool) -> Self {
        Map { replace, ..self }
    }

    pub fn with_name(self, name: &str) -> Self {
        Map {
            name: name.to_string(),
            ..self
        }
    }

    pub fn with_telemetry(self, telemetry: Arc<dyn Telemetry>) -> Self {
        Map {
            telemetry: Some(telemetry),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// The event this map's completion is announced under, e.g. `map.done`.
    pub fn done_event(&self) -> String {
        format!("{}.done", self.name)
    }

    /// Like [`run`](Map::run) but takes the sequence as a JSON value, which
    /// must be an array.
    pub async fn run_value(&self, over: NodeValue) -> Result<MapDone> {
        match over {
            NodeValue::Array(items) => self.run(items).await,
            other => Err(MapError::OverNotArray(other.to_string())),
        }
    }

    /// Runs one batch over `items`.
    ///
    /// Configuration errors are returned before any invocation starts.
    /// Per-item failures end up in [`MapDone::errors`].
    pub async fn run(&self, items: Vec<NodeValue>) -> Result<MapDone> {
        let arguments = build_arguments(&items, self.argfn.as_deref())?;
        let mut batch = Batch::new(
            items,
            arguments,
            BatchSettings {
                concurrency: self.concurrency,
                transform: self.transform.clone(),
                replace: self.replace,
            },
        );
        log::debug!(
            "{}: batch {} starting with {} item(s), {:?}",
            self.name,
            batch.id(),
            batch.len(),
            self.concurrency
        );

        if batch.is_empty() {
            return batch.finish_empty();
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<Delivery>();
        let mut sender = Some(tx);
        self.dispatch(&mut batch, &mut sender);

        loop {
            let Some(Delivery { msg, elapsed }) = rx.recv().await else {
                log::error!(
                    "{}: batch {} lost its outcome channel",
                    self.name,
                    batch.id()
                );
                return Err(MapError::ChannelClosed {
                    remaining: batch.remaining(),
                });
            };

            let trace = self
                .telemetry
                .as_ref()
                .map(|_| trace_entry(&batch, &msg, elapsed));

            let done = batch.deliver(msg)?;

            if let (Some(telemetry), Some(entry)) = (&self.telemetry, trace) {
                telemetry.record(entry);
            }

            if let Some(done) = done {
                if let Some(telemetry) = &self.telemetry {
                    telemetry.flush();
                }
                return Ok(done);
            }
            self.dispatch(&mut batch, &mut sender);
        }
    }

    /// Spawns every position the batch admits. Once nothing is left to
    /// admit the driver's sender is dropped, so the channel closes if
    /// every task disappears without reporting.
    fn dispatch(&self, batch: &mut Batch, sender: &mut Option<UnboundedSender<Delivery>>) {
        let Some(tx) = sender.as_ref() else {
            return;
        };
        for (position, args) in batch.admit() {
            let invocation = Arc::clone(&self.invocation);
            let tx = tx.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                let outcome = AssertUnwindSafe(invocation.invoke(args.clone()))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(ItemError::Panicked(panic_message(panic.as_ref()))));
                let delivery = Delivery {
                    msg: OutcomeMessage {
                        position,
                        args,
                        outcome,
                    },
                    elapsed: started.elapsed(),
                };
                if tx.send(delivery).is_err() {
                    log::debug!("batch abandoned, dropping outcome for position {}", position);
                }
            });
        }
        if batch.is_fully_dispatched() {
            sender.take();
        }
    }
}

fn trace_entry(batch: &Batch, msg: &OutcomeMessage, elapsed: Duration) -> TraceEntry {
    TraceEntry {
        timestamp: unix_now(),
        batch_id: batch.id(),
        position: msg.position,
        args: msg.args.clone(),
        output: msg.outcome.as_ref().ok().cloned(),
        error: msg.outcome.as_ref().err().map(ToString::to_string),
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
