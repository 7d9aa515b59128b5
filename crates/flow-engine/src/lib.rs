//! A type-keyed, directed-acyclic-graph task flow engine.
//!
//! Applications declare [`Task`]s that each read zero or more named data slots from a shared
//! [`Collection`] and produce exactly one slot. A [`Factory`] derives the dependency graph from
//! the registered tasks, prunes it to what a given collection actually needs, and spawns
//! single-shot [`Flow`]s that execute the pruned subgraph concurrently under a flow-wide deadline
//! and per-task timeouts.

pub mod collection;
pub mod error;
pub mod factory;
pub mod flow;
pub mod graph;
pub mod meta;
pub mod observability;
pub mod slot;
pub mod task;

pub use collection::{Collection, TypedCollection};
pub use error::{FlowError, TaskError};
pub use factory::Factory;
pub use flow::{ExecutorState, Flow, TaskExecutorSnapshot};
pub use graph::Graph;
pub use meta::TaskMeta;
pub use slot::SlotKey;
pub use task::{Task, TaskContext, TaskFactory};
