//! Error taxonomy for registration, construction, and execution.

use thiserror::Error;

use crate::slot::SlotKey;

/// Cause of a task's failure, returned by [`crate::Task::execute`].
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    Other(String),
    #[error("task timed out")]
    Timeout,
}

impl TaskError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Errors raised by registration, flow construction, or flow execution.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("task factory failed: {0}")]
    FactoryError(String),

    #[error("task declared a null output slot")]
    NullOutput,

    #[error("task output slot {output} is also listed among its own inputs")]
    SelfDependency { output: SlotKey },

    #[error("output slot {output} is already produced by task \"{existing_task}\"")]
    DuplicateOutput {
        output: SlotKey,
        existing_task: String,
    },

    #[error("register_task called after the graph was already built")]
    RegistrationClosed,

    #[error("cycle detected among tasks producing {outputs:?}")]
    CycleDetected { outputs: Vec<SlotKey> },

    #[error("collection declared no non-null target slots")]
    EmptyTargets,

    #[error("target slot(s) unreachable from declared inputs: {0:?}")]
    Unreachable(Vec<SlotKey>),

    #[error("flow cancelled")]
    Cancelled,

    #[error("flow-wide timeout exceeded")]
    FlowTimeout,

    #[error("task \"{name}\" (output {output}) failed: {cause}")]
    TaskFailure {
        name: String,
        output: SlotKey,
        #[source]
        cause: TaskFailureCause,
    },

    #[error("flow already executed")]
    AlreadyExecuted,
}

/// The specific cause wrapped by [`FlowError::TaskFailure`].
#[derive(Debug, Error)]
pub enum TaskFailureCause {
    #[error("{0}")]
    Error(#[from] TaskError),
    #[error("task exceeded its per-task timeout")]
    Timeout,
    #[error("task panicked: {0}")]
    Panic(String),
}
