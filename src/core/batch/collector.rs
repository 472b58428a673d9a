use crate::core::NodeValue;
use crate::core::batch::OutcomeMessage;
use crate::core::batch::transform::Transform;
use crate::core::error::{ItemError, MapError, Result};
use std::sync::Arc;

/// Writes each outcome into its slot. Slots are positional, so arrival
/// order never affects the final sequences.
pub struct Collector {
    pub(crate) inputs: Vec<NodeValue>,
    pub(crate) outputs: Vec<Option<NodeValue>>,
    pub(crate) errors: Vec<Option<ItemError>>,
    transform: Option<Arc<dyn Transform>>,
    replace: bool,
}

impl Collector {
    pub fn new(inputs: Vec<NodeValue>, transform: Option<Arc<dyn Transform>>, replace: bool) -> Self {
        let len = inputs.len();
        Collector {
            inputs,
            outputs: vec![None; len],
            errors: vec![None; len],
            transform,
            replace,
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// True once either slot for `position` has been written.
    pub fn is_settled(&self, position: usize) -> bool {
        self.outputs.get(position).is_some_and(Option::is_some)
            || self.errors.get(position).is_some_and(Option::is_some)
    }

    pub fn on_outcome(&mut self, msg: OutcomeMessage) -> Result<()> {
        let OutcomeMessage {
            position,
            args,
            outcome,
        } = msg;

        if position >= self.len() {
            log::error!("outcome for position {} outside batch of {}", position, self.len());
            return Err(MapError::PositionOutOfRange {
                position,
                total: self.len(),
            });
        }
        if self.is_settled(position) {
            log::error!("outcome for position {} delivered twice", position);
            return Err(MapError::DuplicateOutcome(position));
        }

        match outcome {
            Err(err) => {
                log::warn!("item {} failed: {}", position, err);
                self.errors[position] = Some(err);
            }
            Ok(value) => {
                log::trace!("item {} succeeded", position);
                let stored = match &self.transform {
                    Some(transform) => transform.apply(&value, &args),
                    None => value,
                };
                self.outputs[position] = Some(stored);

                if self.replace {
                    match args.into_iter().next() {
                        Some(first) => self.inputs[position] = first,
                        None => log::warn!(
                            "replace enabled but item {} was invoked without arguments; input kept",
                            position
                        ),
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(position: usize, args: Vec<NodeValue>, value: NodeValue) -> OutcomeMessage {
        OutcomeMessage {
            position,
            args,
            outcome: Ok(value),
        }
    }

    #[test]
    fn test_collector_writes_positionally() {
        let mut collector = Collector::new(vec![json!(1), json!(2), json!(3)], None, false);
        collector.on_outcome(ok(2, vec![json!(3)], json!(30))).unwrap();
        collector
            .on_outcome(OutcomeMessage {
                position: 1,
                args: vec![json!(2)],
                outcome: Err(ItemError::failed("nope")),
            })
            .unwrap();
        collector.on_outcome(ok(0, vec![json!(1)], json!(10))).unwrap();

        assert_eq!(collector.outputs, vec![Some(json!(10)), None, Some(json!(30))]);
        assert_eq!(collector.errors, vec![None, Some(ItemError::failed("nope")), None]);
        assert_eq!(collector.inputs, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_collector_applies_transform() {
        let transform: Arc<dyn Transform> =
            Arc::new(|value: &NodeValue, args: &[NodeValue]| json!([args[0], value]));
        let mut collector = Collector::new(vec![json!("a")], Some(transform), false);
        collector.on_outcome(ok(0, vec![json!("a")], json!("A"))).unwrap();
        assert_eq!(collector.outputs[0], Some(json!(["a", "A"])));
    }

    #[test]
    fn test_collector_replace_uses_first_argument() {
        let mut collector = Collector::new(vec![json!(" x "), json!(" y ")], None, true);
        collector
            .on_outcome(ok(0, vec![json!("x"), json!("ignored")], json!(true)))
            .unwrap();
        collector
            .on_outcome(OutcomeMessage {
                position: 1,
                args: vec![json!("y")],
                outcome: Err(ItemError::failed("bad")),
            })
            .unwrap();
        assert_eq!(collector.inputs, vec![json!("x"), json!(" y ")]);
    }

    #[test]
    fn test_collector_replace_without_arguments_keeps_input() {
        let mut collector = Collector::new(vec![json!(5)], None, true);
        collector.on_outcome(ok(0, vec![], json!(25))).unwrap();
        assert_eq!(collector.inputs, vec![json!(5)]);
        assert_eq!(collector.outputs[0], Some(json!(25)));
    }

    #[test]
    fn test_collector_rejects_duplicates_and_out_of_range() {
        let mut collector = Collector::new(vec![json!(1)], None, false);
        collector.on_outcome(ok(0, vec![json!(1)], json!(1))).unwrap();
        assert_eq!(
            collector.on_outcome(ok(0, vec![json!(1)], json!(99))),
            Err(MapError::DuplicateOutcome(0))
        );
        // First write wins
        assert_eq!(collector.outputs[0], Some(json!(1)));
        assert_eq!(
            collector.on_outcome(ok(4, vec![], json!(0))),
            Err(MapError::PositionOutOfRange {
                position: 4,
                total: 1
            })
        );
    }
}
