//! # fanmap
//!
//! A concurrent map combinator for async workflows: run one asynchronous
//! invocation per item with a bounded degree of parallelism, collect each
//! item's result or error in input order, and get exactly one completion
//! signal when every invocation has finished.
//!
//! ## Features
//!
//! - **Bounded parallelism**: at most `par` invocations in flight, admitted in input order
//! - **Ordered results**: outputs and errors land in their input position no matter which finishes first
//! - **Per-item failures**: one failing (or panicking) item never aborts the batch
//! - **One terminal signal**: [`MapDone`] carries `[out, in, err]`, exactly once per batch
//! - **Workflow-ready**: [`MapNode`] runs a map as a step over shared state, with named invocations from an [`InvocationRegistry`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fanmap::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), MapError> {
//!     let square = invocation_fn(|args: Vec<NodeValue>| async move {
//!         match args[0].as_i64() {
//!             Some(n) => Ok(json!(n * n)),
//!             None => Err(ItemError::failed("not a number")),
//!         }
//!     });
//!
//!     let done = Map::new(square)
//!         .with_concurrency(2)
//!         .run(vec![json!(2), json!(3), json!(4)])
//!         .await?;
//!
//!     assert_eq!(done.outputs, vec![Some(json!(4)), Some(json!(9)), Some(json!(16))]);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`batch`]: synchronous bookkeeping (launcher, collector, tracker, transform hooks)
//! - [`async_impl`]: the async driver [`Map`] and the workflow step [`MapNode`]
//! - [`prelude`]: Commonly used types and traits (import with `use fanmap::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

pub use crate::core::async_impl;
pub use crate::core::batch;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

// Core types
pub use crate::core::NodeValue;
pub use crate::core::error::{ItemError, MapError, Result};

// Bookkeeping
pub use crate::core::batch::{
    ArgFn, Batch, BatchSettings, Concurrency, MapDone, Outcome, OutcomeMessage, Transform,
};

// Invocations
pub use crate::core::invocation::{FnInvocation, Invocation, MapOp, invocation_fn};
pub use crate::core::registry::InvocationRegistry;

// Configuration
pub use crate::core::config::{DEFAULT_NAME, MapConfig, OverFn, OverSource};

// Async driver
pub use crate::core::async_impl::{Map, MapNode};

// Telemetry
pub use crate::core::telemetry::{MemoryTelemetry, Telemetry, TraceEntry};

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// The main prelude: imports everything you need to build and run maps.
///
/// # Example
/// ```rust
/// use fanmap::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        invocation_fn,
        ArgFn,
        Concurrency,
        Invocation,
        InvocationRegistry,
        ItemError,
        // Async
        Map,
        MapDone,
        MapError,
        MapNode,
        MapOp,
        // Core
        NodeValue,
        Outcome,
        Transform,
    };
}

// ============================================================================
// Re-export commonly used external types for convenience
// ============================================================================

pub use serde_json::Value as JsonValue;
pub use std::collections::HashMap;

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
