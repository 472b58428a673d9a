//! Asynchronous side of the map combinator.
//!
//! - [`Map`] runs one batch: spawns the invocations, drives the
//!   [`Batch`](crate::core::batch::Batch) from their outcome messages and
//!   returns the terminal [`MapDone`](crate::core::batch::MapDone)
//! - [`MapNode`] wraps a [`Map`] as a workflow step configured from node
//!   params and shared state

pub mod map;
pub mod map_node;

pub use map::Map;
pub use map_node::MapNode;
