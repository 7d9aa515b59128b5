//! The task contract: what a [`Task`] is, and how the Engine obtains fresh instances of one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::collection::Collection;
use crate::error::{FlowError, TaskError};
use crate::slot::SlotKey;

/// What a running task needs to cooperate with the flow's cancellation and observability.
#[derive(Clone)]
pub struct TaskContext {
    /// The flow instance this task is running under.
    pub flow_id: Uuid,
    /// The task's own name, for tracing and error messages.
    pub task_name: Arc<str>,
    /// Cancelled when the flow is cancelled, hits its deadline, or a sibling task fails.
    /// Tasks should `select!` against `cancellation.cancelled()` wherever they can suspend.
    pub cancellation: CancellationToken,
}

impl TaskContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// A unit of work that reads zero or more named data slots from a [`Collection`] and produces
/// exactly one.
///
/// Implementations are instantiated fresh per flow via a [`TaskFactory`] — a `Task` value itself
/// carries no state shared across flow instances.
#[async_trait]
pub trait Task: Send + Sync {
    /// Human-readable name, used in diagnostics and error messages.
    fn name(&self) -> &str;

    /// Slots this task reads before it may run. May be empty or include the null slot; the
    /// Engine always adds the null slot implicitly.
    fn input_types(&self) -> Vec<SlotKey> {
        Vec::new()
    }

    /// The single slot this task produces. Must not be the null slot.
    fn output_type(&self) -> SlotKey;

    /// Upper bound on this task's execution time, enforced by the flow's scheduler independent
    /// of the flow-wide deadline.
    fn timeout(&self) -> Duration;

    /// Run the task body: read inputs from `collection`, do work, write the output slot.
    async fn execute(&self, ctx: TaskContext, collection: Arc<dyn Collection>) -> Result<(), TaskError>;
}

/// A zero-argument producer of a fresh [`Task`] instance.
///
/// Invoked twice in a task's lifecycle: once at registration time (to extract [`crate::TaskMeta`])
/// and once per flow instance (to obtain a live, flow-private task). This split keeps registered
/// metadata authoritative while per-flow instances carry no shared mutable state.
pub type TaskFactory = Arc<dyn Fn() -> Result<Box<dyn Task>, FlowError> + Send + Sync>;

/// Wrap a plain closure as a [`TaskFactory`].
pub fn factory<F>(f: F) -> TaskFactory
where
    F: Fn() -> Result<Box<dyn Task>, FlowError> + Send + Sync + 'static,
{
    Arc::new(f)
}
