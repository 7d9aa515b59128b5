//! Task metadata: the validated, immutable descriptor derived from a task factory once.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::FlowError;
use crate::slot::SlotKey;
use crate::task::TaskFactory;

/// A validated descriptor of a registered task: its canonical input set, output slot, timeout,
/// and the factory that can re-instantiate it for a new flow.
///
/// Built exactly once per registration by [`TaskMeta::build`]; immutable thereafter.
#[derive(Clone)]
pub struct TaskMeta {
    name: String,
    /// `dedup(task.input_types()) ∪ {∅}` — the null slot is always an implicit, satisfied input.
    inputs: BTreeSet<SlotKey>,
    output: SlotKey,
    timeout: Duration,
    factory: TaskFactory,
}

impl TaskMeta {
    /// Invoke `factory`, validate the resulting task, and return its immutable descriptor.
    ///
    /// Fails with [`FlowError::FactoryError`] if the factory errors, [`FlowError::NullOutput`] if
    /// the task declares the null slot as its output, or [`FlowError::SelfDependency`] if the
    /// output slot also appears among the declared inputs.
    pub fn build(factory: TaskFactory) -> Result<Self, FlowError> {
        let task = factory().map_err(|e| FlowError::FactoryError(e.to_string()))?;

        let name = task.name().to_string();
        let output = task.output_type();
        let timeout = task.timeout();

        if output.is_null() {
            return Err(FlowError::NullOutput);
        }

        let declared = task.input_types();
        if declared.contains(&output) {
            return Err(FlowError::SelfDependency { output });
        }

        let mut inputs: BTreeSet<SlotKey> = declared.into_iter().collect();
        inputs.insert(SlotKey::null());

        Ok(Self {
            name,
            inputs,
            output,
            timeout,
            factory,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &BTreeSet<SlotKey> {
        &self.inputs
    }

    pub fn output(&self) -> SlotKey {
        self.output
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn factory(&self) -> &TaskFactory {
        &self.factory
    }
}

impl std::fmt::Debug for TaskMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskMeta")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::error::TaskError;
    use crate::task::{Task, TaskContext, factory};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Goods;

    struct MakesGoods;

    #[async_trait]
    impl Task for MakesGoods {
        fn name(&self) -> &str {
            "MakesGoods"
        }
        fn output_type(&self) -> SlotKey {
            SlotKey::of::<Goods>()
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(500)
        }
        async fn execute(
            &self,
            _ctx: TaskContext,
            _collection: Arc<dyn Collection>,
        ) -> Result<(), TaskError> {
            Ok(())
        }
    }

    struct SelfDependent;

    #[async_trait]
    impl Task for SelfDependent {
        fn name(&self) -> &str {
            "SelfDependent"
        }
        fn input_types(&self) -> Vec<SlotKey> {
            vec![SlotKey::of::<Goods>()]
        }
        fn output_type(&self) -> SlotKey {
            SlotKey::of::<Goods>()
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(500)
        }
        async fn execute(
            &self,
            _ctx: TaskContext,
            _collection: Arc<dyn Collection>,
        ) -> Result<(), TaskError> {
            Ok(())
        }
    }

    struct NullOutput;

    #[async_trait]
    impl Task for NullOutput {
        fn name(&self) -> &str {
            "NullOutput"
        }
        fn output_type(&self) -> SlotKey {
            SlotKey::null()
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(500)
        }
        async fn execute(
            &self,
            _ctx: TaskContext,
            _collection: Arc<dyn Collection>,
        ) -> Result<(), TaskError> {
            Ok(())
        }
    }

    #[test]
    fn build_normalizes_inputs_with_null_slot() {
        let meta = TaskMeta::build(factory(|| Ok(Box::new(MakesGoods)))).unwrap();
        assert_eq!(meta.name(), "MakesGoods");
        assert_eq!(meta.output(), SlotKey::of::<Goods>());
        assert!(meta.inputs().contains(&SlotKey::null()));
        assert_eq!(meta.inputs().len(), 1);
    }

    #[test]
    fn build_rejects_self_dependency() {
        let err = TaskMeta::build(factory(|| Ok(Box::new(SelfDependent)))).unwrap_err();
        assert!(matches!(err, FlowError::SelfDependency { .. }));
    }

    #[test]
    fn build_rejects_null_output() {
        let err = TaskMeta::build(factory(|| Ok(Box::new(NullOutput)))).unwrap_err();
        assert!(matches!(err, FlowError::NullOutput));
    }

    #[test]
    fn build_surfaces_factory_error() {
        let err = TaskMeta::build(factory(|| Err(FlowError::FactoryError("boom".into())))).unwrap_err();
        assert!(matches!(err, FlowError::FactoryError(msg) if msg == "boom"));
    }
}
