use crate::core::NodeValue;
use crate::core::batch::Outcome;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// One asynchronous unit of work, called once per item.
///
/// Returns the success value, or an [`ItemError`](crate::core::error::ItemError)
/// that is recorded for that item alone.
#[async_trait]
pub trait Invocation: Send + Sync + 'static {
    async fn invoke(&self, args: Vec<NodeValue>) -> Outcome;
}

/// Adapts an async closure into an [`Invocation`].
#[derive(Clone)]
pub struct FnInvocation<F>(F);

impl<F, Fut> FnInvocation<F>
where
    F: Fn(Vec<NodeValue>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        FnInvocation(f)
    }
}

#[async_trait]
impl<F, Fut> Invocation for FnInvocation<F>
where
    F: Fn(Vec<NodeValue>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    async fn invoke(&self, args: Vec<NodeValue>) -> Outcome {
        (self.0)(args).await
    }
}

/// Shorthand for `Arc::new(FnInvocation::new(f))`.
pub fn invocation_fn<F, Fut>(f: F) -> Arc<dyn Invocation>
where
    F: Fn(Vec<NodeValue>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    Arc::new(FnInvocation::new(f))
}

/// How a map names the work it runs.
#[derive(Clone)]
pub enum MapOp {
    /// Looked up in an [`InvocationRegistry`](crate::core::registry::InvocationRegistry) when the map starts.
    Named(String),
    Direct(Arc<dyn Invocation>),
}

impl std::fmt::Debug for MapOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapOp::Named(name) => f.debug_tuple("Named").field(name).finish(),
            MapOp::Direct(_) => f.write_str("Direct(..)"),
        }
    }
}

impl From<&str> for MapOp {
    fn from(name: &str) -> Self {
        MapOp::Named(name.to_string())
    }
}

impl From<Arc<dyn Invocation>> for MapOp {
    fn from(invocation: Arc<dyn Invocation>) -> Self {
        MapOp::Direct(invocation)
    }
}
