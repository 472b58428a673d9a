use crate::core::NodeValue;
use crate::core::error::{MapError, Result};

/// Turns a successful invocation result into the value stored in the
/// output sequence.
///
/// Receives the success value and the exact argument list the invocation
/// was called with. It runs once per successful position and only sees
/// that position's data.
pub trait Transform: Send + Sync + 'static {
    fn apply(&self, value: &NodeValue, args: &[NodeValue]) -> NodeValue;
}

impl<F> Transform for F
where
    F: Fn(&NodeValue, &[NodeValue]) -> NodeValue + Send + Sync + 'static,
{
    fn apply(&self, value: &NodeValue, args: &[NodeValue]) -> NodeValue {
        self(value, args)
    }
}

/// Builds the argument list for one item. Must return a JSON array, which
/// is spread into the invocation's arguments.
pub trait ArgFn: Send + Sync + 'static {
    fn build(&self, item: &NodeValue, position: usize) -> NodeValue;
}

impl<F> ArgFn for F
where
    F: Fn(&NodeValue, usize) -> NodeValue + Send + Sync + 'static,
{
    fn build(&self, item: &NodeValue, position: usize) -> NodeValue {
        self(item, position)
    }
}

/// Computes every position's arguments up front so a malformed builder is
/// reported before anything is dispatched.
pub fn build_arguments(
    items: &[NodeValue],
    argfn: Option<&dyn ArgFn>,
) -> Result<Vec<Vec<NodeValue>>> {
    let Some(argfn) = argfn else {
        return Ok(items.iter().map(|item| vec![item.clone()]).collect());
    };

    items
        .iter()
        .enumerate()
        .map(|(position, item)| match argfn.build(item, position) {
            NodeValue::Array(args) => Ok(args),
            other => Err(MapError::InvalidArguments {
                position,
                got: other.to_string(),
            }),
        })
        .collect()
}
