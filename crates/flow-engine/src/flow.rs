//! The flow executor: a one-shot runtime that drives the readiness protocol over a pruned task
//! subgraph with per-task and flow-wide timeouts, panic recovery, and cancellation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, instrument};
use uuid::Uuid;

use crate::collection::Collection;
use crate::error::{FlowError, TaskFailureCause};
use crate::meta::TaskMeta;
use crate::slot::SlotKey;
use crate::task::{Task, TaskContext};

/// Lifecycle state of a single [`TaskMeta`] within one flow execution, surfaced by [`Flow::tasks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Pending,
    Running,
    CompletedOk,
    CompletedErr,
    TimedOut,
    Panicked,
}

/// Point-in-time diagnostic view of one task within a flow.
#[derive(Debug, Clone)]
pub struct TaskExecutorSnapshot {
    pub name: String,
    pub output: SlotKey,
    pub state: ExecutorState,
}

/// Outcome of one spawned task, reported on the result channel.
enum TaskOutcome {
    Ok {
        output: SlotKey,
    },
    Err {
        name: String,
        output: SlotKey,
        cause: TaskFailureCause,
    },
    /// The task's cancellation token fired before it reported; its eventual result (if any) is
    /// discarded. Only observed by the coordinator after it has already returned, so it carries
    /// no information the caller needs.
    Abandoned,
}

/// One-shot execution context binding a pruned task subgraph to a [`Collection`].
///
/// Built by [`crate::Factory::create_flow`]. Calling [`Flow::execute`] a second time returns
/// [`FlowError::AlreadyExecuted`] without running anything.
pub struct Flow {
    id: Uuid,
    collection: Arc<dyn Collection>,
    metas: Vec<Arc<TaskMeta>>,
    started: AtomicBool,
    states: Arc<Mutex<HashMap<SlotKey, ExecutorState>>>,
    elapsed: Mutex<Option<Duration>>,
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow").field("id", &self.id).finish()
    }
}

impl Flow {
    pub(crate) fn new(collection: Arc<dyn Collection>, metas: Vec<Arc<TaskMeta>>) -> Self {
        let states = metas
            .iter()
            .map(|m| (m.output(), ExecutorState::Pending))
            .collect();
        Self {
            id: Uuid::new_v4(),
            collection,
            metas,
            started: AtomicBool::new(false),
            states: Arc::new(Mutex::new(states)),
            elapsed: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Time spent in the most recent [`Flow::execute`] call, or zero before one completes.
    pub fn time_cost(&self) -> Duration {
        self.elapsed.lock().unwrap().unwrap_or_default()
    }

    /// Point-in-time snapshot of every task's lifecycle state.
    pub fn tasks(&self) -> Vec<TaskExecutorSnapshot> {
        let states = self.states.lock().unwrap();
        self.metas
            .iter()
            .map(|meta| TaskExecutorSnapshot {
                name: meta.name().to_string(),
                output: meta.output(),
                state: states.get(&meta.output()).copied().unwrap_or(ExecutorState::Pending),
            })
            .collect()
    }

    /// Run the pruned subgraph to completion. `cancellation` defaults to a fresh, never-cancelled
    /// root token when `None`. `flow_timeout` bounds the whole call independent of any per-task
    /// timeout.
    #[instrument(skip_all, fields(flow_id = %self.id))]
    pub async fn execute(
        &self,
        cancellation: Option<CancellationToken>,
        flow_timeout: Duration,
    ) -> Result<(), FlowError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(FlowError::AlreadyExecuted);
        }

        let start = Instant::now();
        let result = self.run(cancellation, flow_timeout).await;
        *self.elapsed.lock().unwrap() = Some(start.elapsed());
        result
    }

    async fn run(
        &self,
        cancellation: Option<CancellationToken>,
        flow_timeout: Duration,
    ) -> Result<(), FlowError> {
        let parent_token = cancellation.unwrap_or_default();
        let token = parent_token.child_token();
        let deadline = Instant::now() + flow_timeout;

        let mut blocks: HashMap<SlotKey, HashSet<SlotKey>> = self
            .metas
            .iter()
            .map(|m| (m.output(), m.inputs().iter().copied().collect()))
            .collect();

        let mut input_to_outputs: HashMap<SlotKey, Vec<SlotKey>> = HashMap::new();
        for meta in &self.metas {
            for input in meta.inputs() {
                input_to_outputs.entry(*input).or_default().push(meta.output());
            }
        }

        let capacity = self.metas.len() + self.collection.input_types().len() + 2;
        let (unblock_tx, mut unblock_rx) = tokio::sync::mpsc::channel::<SlotKey>(capacity.max(2));
        let (result_tx, mut result_rx) = tokio::sync::mpsc::channel::<TaskOutcome>(capacity.max(2));

        let mut initial: HashSet<SlotKey> = self.collection.input_types().into_iter().collect();
        initial.insert(SlotKey::null());
        for slot in initial {
            let _ = unblock_tx.try_send(slot);
        }

        let total = self.metas.len();
        let mut launched: HashSet<SlotKey> = HashSet::new();
        let mut outstanding: usize = 0;

        while launched.len() < total || outstanding > 0 {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    return Err(FlowError::Cancelled);
                }

                _ = tokio::time::sleep_until(deadline.into()) => {
                    token.cancel();
                    return Err(FlowError::FlowTimeout);
                }

                Some(slot) = unblock_rx.recv() => {
                    if let Some(outputs) = input_to_outputs.get(&slot) {
                        for &output in outputs {
                            if launched.contains(&output) {
                                continue;
                            }
                            let ready = blocks
                                .get_mut(&output)
                                .map(|set| {
                                    set.remove(&slot);
                                    set.is_empty()
                                })
                                .unwrap_or(false);
                            if ready {
                                launched.insert(output);
                                outstanding += 1;
                                self.states.lock().unwrap().insert(output, ExecutorState::Running);
                                self.spawn_task(output, &token, &result_tx);
                            }
                        }
                    }
                }

                Some(outcome) = result_rx.recv() => {
                    match outcome {
                        TaskOutcome::Ok { output } => {
                            outstanding -= 1;
                            self.states.lock().unwrap().insert(output, ExecutorState::CompletedOk);
                            let _ = unblock_tx.try_send(output);
                        }
                        TaskOutcome::Err { name, output, cause } => {
                            outstanding -= 1;
                            let state = match &cause {
                                TaskFailureCause::Timeout => ExecutorState::TimedOut,
                                TaskFailureCause::Panic(_) => ExecutorState::Panicked,
                                TaskFailureCause::Error(_) => ExecutorState::CompletedErr,
                            };
                            self.states.lock().unwrap().insert(output, state);
                            token.cancel();
                            return Err(FlowError::TaskFailure { name, output, cause });
                        }
                        TaskOutcome::Abandoned => {
                            outstanding -= 1;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn spawn_task(&self, output: SlotKey, token: &CancellationToken, result_tx: &tokio::sync::mpsc::Sender<TaskOutcome>) {
        let meta = self
            .metas
            .iter()
            .find(|m| m.output() == output)
            .expect("output belongs to this flow's pruned meta set")
            .clone();
        let flow_id = self.id;
        let cancellation = token.clone();
        let collection = Arc::clone(&self.collection);
        let result_tx = result_tx.clone();

        tokio::spawn(
            async move {
                let outcome = supervise_one(meta, flow_id, cancellation, collection).await;
                let _ = result_tx.send(outcome).await;
            }
            .in_current_span(),
        );
    }
}

async fn supervise_one(
    meta: Arc<TaskMeta>,
    flow_id: Uuid,
    cancellation: CancellationToken,
    collection: Arc<dyn Collection>,
) -> TaskOutcome {
    let name = meta.name().to_string();
    let output = meta.output();

    let task: Box<dyn Task> = match (meta.factory())() {
        Ok(task) => task,
        Err(e) => {
            return TaskOutcome::Err {
                name,
                output,
                cause: TaskFailureCause::Error(crate::error::TaskError::other(e.to_string())),
            };
        }
    };

    let ctx = TaskContext {
        flow_id,
        task_name: Arc::from(name.as_str()),
        cancellation: cancellation.clone(),
    };
    let span = crate::observability::task_span(&ctx);

    let join = tokio::spawn(async move { task.execute(ctx, collection).await }.instrument(span));
    let abort_handle = join.abort_handle();

    tokio::select! {
        biased;

        res = join => match res {
            Ok(Ok(())) => TaskOutcome::Ok { output },
            Ok(Err(task_err)) => TaskOutcome::Err {
                name,
                output,
                cause: TaskFailureCause::Error(task_err),
            },
            Err(join_err) if join_err.is_panic() => TaskOutcome::Err {
                name,
                output,
                cause: TaskFailureCause::Panic(panic_message(join_err.into_panic())),
            },
            Err(join_err) => TaskOutcome::Err {
                name,
                output,
                cause: TaskFailureCause::Error(crate::error::TaskError::other(join_err.to_string())),
            },
        },

        _ = tokio::time::sleep(meta.timeout()) => {
            abort_handle.abort();
            TaskOutcome::Err { name, output, cause: TaskFailureCause::Timeout }
        }

        _ = cancellation.cancelled() => {
            abort_handle.abort();
            TaskOutcome::Abandoned
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
