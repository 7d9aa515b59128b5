//! The collection contract: the shared, application-defined data store tasks read from and
//! write to.

use std::any::Any;

use dashmap::DashMap;

use crate::slot::SlotKey;

/// An application-supplied object storing slot values, read and mutated by task code.
///
/// The Engine never inspects slot *values* — it only asks for the declared input and target
/// slot lists so it can compute reachability and readiness. Reading and writing individual slots
/// is entirely the application's concern; the Engine's only obligation to the caller is to
/// schedule a task's `execute` only once every slot in `t.input_types() \ {∅}` has already been
/// written by its producing task.
pub trait Collection: Send + Sync {
    /// Slots pre-populated by the caller before execution. The null slot is always implicitly
    /// considered present and need not be listed.
    fn input_types(&self) -> Vec<SlotKey>;

    /// Slots the flow must produce. Must be non-empty once the null slot is removed, else flow
    /// construction fails with [`crate::FlowError::EmptyTargets`].
    fn target_types(&self) -> Vec<SlotKey>;

    /// Downcast support for task bodies that need their concrete `Collection` type back out of
    /// the `Arc<dyn Collection>` handed to [`crate::Task::execute`].
    fn as_any(&self) -> &dyn Any;
}

/// A reusable reification of "Collection as a polymorphic store": a `SlotKey`-keyed map of
/// `Box<dyn Any>` values, safe for concurrent access from task bodies running on different
/// worker threads.
///
/// Applications that don't need a strongly-typed struct with named fields can use this directly;
/// `get`/`set` are generic over the slot's payload type, and the `SlotKey` is derived the same
/// way the Engine derives it from a task's declared input/output types.
#[derive(Default)]
pub struct TypedCollection {
    values: DashMap<SlotKey, Box<dyn Any + Send + Sync>>,
    inputs: Vec<SlotKey>,
    targets: Vec<SlotKey>,
}

impl TypedCollection {
    /// An empty collection declaring no inputs and no targets; build it up with
    /// [`TypedCollection::with_input`] / [`TypedCollection::with_target`].
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
            inputs: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Declare slot `T` as a caller-supplied input and store `value` in it.
    pub fn with_input<T: Any + Send + Sync>(mut self, value: T) -> Self {
        let key = SlotKey::of::<T>();
        self.values.insert(key, Box::new(value));
        if !self.inputs.contains(&key) {
            self.inputs.push(key);
        }
        self
    }

    /// Declare slot `T` as a target the flow must produce.
    pub fn with_target<T: Any + Send + Sync>(mut self) -> Self {
        let key = SlotKey::of::<T>();
        if !self.targets.contains(&key) {
            self.targets.push(key);
        }
        self
    }

    /// Read slot `T`, if present and of the expected type.
    pub fn get<T: Any + Send + Sync + Clone>(&self) -> Option<T> {
        self.values
            .get(&SlotKey::of::<T>())
            .and_then(|v| v.downcast_ref::<T>().cloned())
    }

    /// Write slot `T`. Called by task bodies from inside `Task::execute`.
    pub fn set<T: Any + Send + Sync>(&self, value: T) {
        self.values.insert(SlotKey::of::<T>(), Box::new(value));
    }

    /// Whether slot `T` currently has a value.
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.values.contains_key(&SlotKey::of::<T>())
    }
}

impl Collection for TypedCollection {
    fn input_types(&self) -> Vec<SlotKey> {
        self.inputs.clone()
    }

    fn target_types(&self) -> Vec<SlotKey> {
        self.targets.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Goods(Vec<String>);

    #[test]
    fn typed_collection_roundtrips_values() {
        let c = TypedCollection::new().with_input(Goods(vec!["apples".into()]));
        assert_eq!(c.get::<Goods>(), Some(Goods(vec!["apples".into()])));
        assert!(c.contains::<Goods>());
    }

    #[test]
    fn typed_collection_tracks_declared_inputs_and_targets() {
        let c = TypedCollection::new()
            .with_input(Goods(vec![]))
            .with_target::<String>();
        assert_eq!(c.input_types(), vec![SlotKey::of::<Goods>()]);
        assert_eq!(c.target_types(), vec![SlotKey::of::<String>()]);
    }

    #[test]
    fn set_overwrites_existing_value() {
        let c = TypedCollection::new().with_input(Goods(vec!["a".into()]));
        c.set(Goods(vec!["b".into()]));
        assert_eq!(c.get::<Goods>(), Some(Goods(vec!["b".into()])));
    }
}
