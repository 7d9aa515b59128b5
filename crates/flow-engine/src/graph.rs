//! The dependency graph over registered task metadata: indices, transitive closures, and
//! reachability analysis (a build-tool-style target solver).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::error::FlowError;
use crate::meta::TaskMeta;
use crate::slot::SlotKey;

/// Indexed, closed-over-registration collection of [`TaskMeta`] supporting reachability queries.
///
/// Built once from the full set of registered metas by [`Graph::build`]; read-only thereafter.
pub struct Graph {
    output_to_meta: HashMap<SlotKey, Arc<TaskMeta>>,
    input_to_metas: HashMap<SlotKey, Vec<Arc<TaskMeta>>>,
    closures: HashMap<SlotKey, HashSet<SlotKey>>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("output_to_meta", &self.output_to_meta)
            .field("input_to_metas", &self.input_to_metas)
            .field("closures", &self.closures)
            .finish()
    }
}

impl Graph {
    /// Build indices and transitive closures over `metas`. Each output slot is guaranteed unique
    /// among registered metas by [`crate::Factory::register_task`], so no duplicate check is
    /// repeated here.
    pub fn build(metas: Vec<Arc<TaskMeta>>) -> Result<Self, FlowError> {
        let mut output_to_meta = HashMap::with_capacity(metas.len());
        let mut input_to_metas: HashMap<SlotKey, Vec<Arc<TaskMeta>>> = HashMap::new();

        for meta in &metas {
            output_to_meta.insert(meta.output(), Arc::clone(meta));
            for input in meta.inputs() {
                input_to_metas.entry(*input).or_default().push(Arc::clone(meta));
            }
        }

        let mut closures = HashMap::with_capacity(metas.len());
        for meta in &metas {
            closures.insert(meta.output(), closure_of(meta.output(), &output_to_meta));
        }

        let graph = Self {
            output_to_meta,
            input_to_metas,
            closures,
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    pub fn meta_for(&self, output: SlotKey) -> Option<&Arc<TaskMeta>> {
        self.output_to_meta.get(&output)
    }

    pub fn metas(&self) -> impl Iterator<Item = &Arc<TaskMeta>> {
        self.output_to_meta.values()
    }

    pub fn dependents_of(&self, input: SlotKey) -> &[Arc<TaskMeta>] {
        self.input_to_metas
            .get(&input)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The transitive closure for output slot `o`: every slot that must eventually be satisfied
    /// to produce `o`, computed once at build time.
    pub fn closure(&self, output: SlotKey) -> Option<&HashSet<SlotKey>> {
        self.closures.get(&output)
    }

    /// Explicit cycle detection, performed once at build time as hardening beyond the contract
    /// guarantee (no task depends on its own output, each slot has one producer). Two tasks whose
    /// outputs mutually depend on each other would otherwise only surface as `Unreachable` when a
    /// target needs them — this walks every output's closure and rejects any that contains itself.
    fn check_acyclic(&self) -> Result<(), FlowError> {
        let mut cyclic = Vec::new();
        for (&output, closure) in &self.closures {
            if closure.contains(&output) {
                cyclic.push(output);
            }
        }
        if cyclic.is_empty() {
            Ok(())
        } else {
            Err(FlowError::CycleDetected { outputs: cyclic })
        }
    }

    /// Reachability analysis: starting from `collection_inputs` (plus the null slot), repeatedly
    /// add the output of any task whose full input set is already reachable, until a fixpoint.
    /// Monotone, terminates in at most `|tasks|` iterations.
    pub fn reach(&self, collection_inputs: &[SlotKey]) -> HashSet<SlotKey> {
        let mut reachable: HashSet<SlotKey> = collection_inputs.iter().copied().collect();
        reachable.insert(SlotKey::null());

        loop {
            let mut added = false;
            for meta in self.output_to_meta.values() {
                if reachable.contains(&meta.output()) {
                    continue;
                }
                if meta.inputs().iter().all(|i| reachable.contains(i)) {
                    reachable.insert(meta.output());
                    added = true;
                }
            }
            if !added {
                break;
            }
        }
        reachable
    }

    /// Every registered task whose output is reachable given `collection_inputs`, or
    /// [`FlowError::Unreachable`] naming the target slots that cannot be produced.
    pub fn min_task_metas(
        &self,
        collection_inputs: &[SlotKey],
        targets: &[SlotKey],
    ) -> Result<Vec<Arc<TaskMeta>>, FlowError> {
        let reachable = self.reach(collection_inputs);

        let unreachable: Vec<SlotKey> = targets
            .iter()
            .filter(|t| !t.is_null() && !reachable.contains(t))
            .copied()
            .collect();
        if !unreachable.is_empty() {
            return Err(FlowError::Unreachable(unreachable));
        }

        Ok(self
            .output_to_meta
            .values()
            .filter(|meta| reachable.contains(&meta.output()))
            .cloned()
            .collect())
    }
}

/// BFS over `input_to_metas`-adjacent producers: starting from `output`'s direct inputs, whenever
/// a visited slot is itself produced by some meta, enqueue that meta's inputs too.
fn closure_of(output: SlotKey, output_to_meta: &HashMap<SlotKey, Arc<TaskMeta>>) -> HashSet<SlotKey> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();

    if let Some(meta) = output_to_meta.get(&output) {
        for input in meta.inputs() {
            queue.push_back(*input);
        }
    }

    while let Some(slot) = queue.pop_front() {
        if !visited.insert(slot) {
            continue;
        }
        if let Some(meta) = output_to_meta.get(&slot) {
            for input in meta.inputs() {
                if !visited.contains(input) {
                    queue.push_back(*input);
                }
            }
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::error::TaskError;
    use crate::task::{Task, TaskContext, factory};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Goods;
    struct Shops;
    struct GoodsInShops;

    struct StubTask {
        name: &'static str,
        inputs: Vec<SlotKey>,
        output: SlotKey,
    }

    #[async_trait]
    impl Task for StubTask {
        fn name(&self) -> &str {
            self.name
        }
        fn input_types(&self) -> Vec<SlotKey> {
            self.inputs.clone()
        }
        fn output_type(&self) -> SlotKey {
            self.output
        }
        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
        async fn execute(
            &self,
            _ctx: TaskContext,
            _collection: Arc<dyn Collection>,
        ) -> Result<(), TaskError> {
            Ok(())
        }
    }

    fn meta(name: &'static str, inputs: Vec<SlotKey>, output: SlotKey) -> Arc<TaskMeta> {
        Arc::new(
            TaskMeta::build(factory(move || {
                Ok(Box::new(StubTask {
                    name,
                    inputs: inputs.clone(),
                    output,
                }))
            }))
            .unwrap(),
        )
    }

    fn sample_graph() -> Graph {
        let g = meta("G", vec![], SlotKey::of::<Goods>());
        let s = meta("S", vec![], SlotKey::of::<Shops>());
        let m = meta(
            "M",
            vec![SlotKey::of::<Goods>(), SlotKey::of::<Shops>()],
            SlotKey::of::<GoodsInShops>(),
        );
        Graph::build(vec![g, s, m]).unwrap()
    }

    #[test]
    fn reach_includes_all_producible_outputs_from_no_inputs() {
        let graph = sample_graph();
        let reachable = graph.reach(&[]);
        assert!(reachable.contains(&SlotKey::of::<Goods>()));
        assert!(reachable.contains(&SlotKey::of::<Shops>()));
        assert!(reachable.contains(&SlotKey::of::<GoodsInShops>()));
    }

    #[test]
    fn min_task_metas_reports_unreachable_target() {
        let g = meta("G", vec![], SlotKey::of::<Goods>());
        let m = meta(
            "M",
            vec![SlotKey::of::<Goods>(), SlotKey::of::<Shops>()],
            SlotKey::of::<GoodsInShops>(),
        );
        let graph = Graph::build(vec![g, m]).unwrap();
        let err = graph
            .min_task_metas(&[], &[SlotKey::of::<GoodsInShops>()])
            .unwrap_err();
        match err {
            FlowError::Unreachable(slots) => assert_eq!(slots, vec![SlotKey::of::<GoodsInShops>()]),
            other => panic!("expected Unreachable, got {other:?}"),
        }
    }

    #[test]
    fn min_task_metas_returns_all_reachable_tasks() {
        let graph = sample_graph();
        let selected = graph
            .min_task_metas(&[], &[SlotKey::of::<GoodsInShops>()])
            .unwrap();
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn closure_of_m_contains_goods_and_shops() {
        let graph = sample_graph();
        let closure = graph.closure(SlotKey::of::<GoodsInShops>()).unwrap();
        assert!(closure.contains(&SlotKey::of::<Goods>()));
        assert!(closure.contains(&SlotKey::of::<Shops>()));
    }

    #[test]
    fn mutually_dependent_tasks_are_rejected_as_cyclic() {
        struct A;
        struct B;
        let a = meta("A", vec![SlotKey::of::<B>()], SlotKey::of::<A>());
        let b = meta("B", vec![SlotKey::of::<A>()], SlotKey::of::<B>());
        let err = Graph::build(vec![a, b]).unwrap_err();
        assert!(matches!(err, FlowError::CycleDetected { .. }));
    }

    #[test]
    fn reach_is_deterministic_across_builds() {
        let graph_a = sample_graph();
        let graph_b = sample_graph();
        assert_eq!(graph_a.reach(&[]), graph_b.reach(&[]));
    }
}
