//! The registry entry point: accepts task factories, builds the [`Graph`], and spawns [`Flow`]
//! instances for a concrete collection.

use std::collections::HashMap;
use std::sync::Arc;

use crate::collection::Collection;
use crate::error::FlowError;
use crate::flow::Flow;
use crate::graph::Graph;
use crate::meta::TaskMeta;
use crate::slot::SlotKey;
use crate::task::TaskFactory;

/// Registers task factories, ensures output-slot uniqueness, and builds the [`Graph`] once all
/// tasks are registered.
///
/// Registration is closed once [`Factory::create_graph`] has run (or is implicitly run by
/// [`Factory::create_flow`]): a later [`Factory::register_task`] call returns
/// [`FlowError::RegistrationClosed`] rather than silently leaving the graph stale.
#[derive(Default)]
pub struct Factory {
    output_to_meta: HashMap<SlotKey, Arc<TaskMeta>>,
    graph: Option<Arc<Graph>>,
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a [`TaskMeta`] from `factory` and register it, keyed by its output slot.
    ///
    /// Fails with [`FlowError::DuplicateOutput`] if another task already claims the same output,
    /// or [`FlowError::RegistrationClosed`] if [`Factory::create_graph`] already ran.
    pub fn register_task(&mut self, factory: TaskFactory) -> Result<(), FlowError> {
        if self.graph.is_some() {
            return Err(FlowError::RegistrationClosed);
        }

        let meta = TaskMeta::build(factory)?;
        if let Some(existing) = self.output_to_meta.get(&meta.output()) {
            return Err(FlowError::DuplicateOutput {
                output: meta.output(),
                existing_task: existing.name().to_string(),
            });
        }
        self.output_to_meta.insert(meta.output(), Arc::new(meta));
        Ok(())
    }

    /// Materialize the [`Graph`] over all currently registered metas. Idempotent: later calls
    /// return the already-built graph without re-registering. Closes the Factory against further
    /// registration.
    pub fn create_graph(&mut self) -> Result<Arc<Graph>, FlowError> {
        if let Some(graph) = &self.graph {
            return Ok(Arc::clone(graph));
        }
        let metas: Vec<Arc<TaskMeta>> = self.output_to_meta.values().cloned().collect();
        let graph = Arc::new(Graph::build(metas)?);
        self.graph = Some(Arc::clone(&graph));
        Ok(graph)
    }

    /// Build the graph if needed, prune it to what `collection` requires, and return a fresh
    /// single-shot [`Flow`] bound to `collection`.
    ///
    /// Fails with [`FlowError::EmptyTargets`] if the collection declares no non-null targets, or
    /// [`FlowError::Unreachable`] if some target cannot be produced from the collection's inputs.
    pub fn create_flow(&mut self, collection: Arc<dyn Collection>) -> Result<Flow, FlowError> {
        let graph = self.create_graph()?;

        let targets: Vec<SlotKey> = collection
            .target_types()
            .into_iter()
            .filter(|t| !t.is_null())
            .collect();
        if targets.is_empty() {
            return Err(FlowError::EmptyTargets);
        }

        let inputs = collection.input_types();
        let metas = graph.min_task_metas(&inputs, &targets)?;

        Ok(Flow::new(collection, metas))
    }
}
