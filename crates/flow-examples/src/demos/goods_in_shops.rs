//! Two independent producers feeding a single merge task, the engine's canonical fan-in shape.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flow_engine::{Collection, Factory, SlotKey, Task, TaskContext, TaskError, TypedCollection, task::factory};

#[derive(Debug, Clone)]
pub struct Goods(pub Vec<&'static str>);

#[derive(Debug, Clone)]
pub struct Shops(pub Vec<&'static str>);

#[derive(Debug, Clone)]
pub struct Catalog(pub Vec<(&'static str, &'static str)>);

struct FetchGoods;

#[async_trait]
impl Task for FetchGoods {
    fn name(&self) -> &str {
        "fetch_goods"
    }
    fn output_type(&self) -> SlotKey {
        SlotKey::of::<Goods>()
    }
    fn timeout(&self) -> Duration {
        Duration::from_millis(500)
    }
    async fn execute(&self, _ctx: TaskContext, collection: Arc<dyn Collection>) -> Result<(), TaskError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let typed = collection
            .as_any()
            .downcast_ref::<TypedCollection>()
            .ok_or_else(|| TaskError::other("expected a TypedCollection"))?;
        typed.set(Goods(vec!["bread", "milk"]));
        Ok(())
    }
}

struct FetchShops;

#[async_trait]
impl Task for FetchShops {
    fn name(&self) -> &str {
        "fetch_shops"
    }
    fn output_type(&self) -> SlotKey {
        SlotKey::of::<Shops>()
    }
    fn timeout(&self) -> Duration {
        Duration::from_millis(500)
    }
    async fn execute(&self, _ctx: TaskContext, collection: Arc<dyn Collection>) -> Result<(), TaskError> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let typed = collection
            .as_any()
            .downcast_ref::<TypedCollection>()
            .ok_or_else(|| TaskError::other("expected a TypedCollection"))?;
        typed.set(Shops(vec!["corner store", "market"]));
        Ok(())
    }
}

struct MergeCatalog;

#[async_trait]
impl Task for MergeCatalog {
    fn name(&self) -> &str {
        "merge_catalog"
    }
    fn input_types(&self) -> Vec<SlotKey> {
        vec![SlotKey::of::<Goods>(), SlotKey::of::<Shops>()]
    }
    fn output_type(&self) -> SlotKey {
        SlotKey::of::<Catalog>()
    }
    fn timeout(&self) -> Duration {
        Duration::from_millis(500)
    }
    async fn execute(&self, _ctx: TaskContext, collection: Arc<dyn Collection>) -> Result<(), TaskError> {
        let typed = collection
            .as_any()
            .downcast_ref::<TypedCollection>()
            .ok_or_else(|| TaskError::other("expected a TypedCollection"))?;
        let goods = typed.get::<Goods>().ok_or_else(|| TaskError::other("missing goods"))?;
        let shops = typed.get::<Shops>().ok_or_else(|| TaskError::other("missing shops"))?;
        let paired = goods.0.into_iter().zip(shops.0.into_iter().cycle()).collect();
        typed.set(Catalog(paired));
        Ok(())
    }
}

pub async fn run() -> Result<(Vec<(&'static str, &'static str)>, Duration), Box<dyn std::error::Error>> {
    let mut registry = Factory::new();
    registry.register_task(factory(|| Ok(Box::new(FetchGoods))))?;
    registry.register_task(factory(|| Ok(Box::new(FetchShops))))?;
    registry.register_task(factory(|| Ok(Box::new(MergeCatalog))))?;

    let collection = Arc::new(TypedCollection::new().with_target::<Catalog>());
    let flow = registry.create_flow(collection.clone())?;
    flow.execute(None, Duration::from_secs(2)).await?;

    let catalog = collection.get::<Catalog>().expect("merge_catalog always writes Catalog");
    Ok((catalog.0, flow.time_cost()))
}
