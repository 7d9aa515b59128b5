//! A linear dependency chain, and a task that polls its cancellation token while it waits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flow_engine::{Collection, Factory, SlotKey, Task, TaskContext, TaskError, TypedCollection, task::factory};

#[derive(Debug, Clone, Copy)]
pub struct RawPrice(pub f64);

#[derive(Debug, Clone, Copy)]
pub struct DiscountedPrice(pub f64);

#[derive(Debug, Clone, Copy)]
pub struct TaxedPrice(pub f64);

struct QuoteRawPrice;

#[async_trait]
impl Task for QuoteRawPrice {
    fn name(&self) -> &str {
        "quote_raw_price"
    }
    fn output_type(&self) -> SlotKey {
        SlotKey::of::<RawPrice>()
    }
    fn timeout(&self) -> Duration {
        Duration::from_millis(300)
    }
    async fn execute(&self, _ctx: TaskContext, collection: Arc<dyn Collection>) -> Result<(), TaskError> {
        let typed = collection
            .as_any()
            .downcast_ref::<TypedCollection>()
            .ok_or_else(|| TaskError::other("expected a TypedCollection"))?;
        typed.set(RawPrice(19.99));
        Ok(())
    }
}

struct ApplyDiscount;

#[async_trait]
impl Task for ApplyDiscount {
    fn name(&self) -> &str {
        "apply_discount"
    }
    fn input_types(&self) -> Vec<SlotKey> {
        vec![SlotKey::of::<RawPrice>()]
    }
    fn output_type(&self) -> SlotKey {
        SlotKey::of::<DiscountedPrice>()
    }
    fn timeout(&self) -> Duration {
        Duration::from_millis(300)
    }
    async fn execute(&self, ctx: TaskContext, collection: Arc<dyn Collection>) -> Result<(), TaskError> {
        // Simulate a slow coupon lookup that still honors cancellation promptly.
        for _ in 0..5 {
            if ctx.is_cancelled() {
                return Err(TaskError::other("cancelled mid-discount"));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let typed = collection
            .as_any()
            .downcast_ref::<TypedCollection>()
            .ok_or_else(|| TaskError::other("expected a TypedCollection"))?;
        let raw = typed.get::<RawPrice>().ok_or_else(|| TaskError::other("missing raw price"))?;
        typed.set(DiscountedPrice(raw.0 * 0.9));
        Ok(())
    }
}

struct ApplyTax;

#[async_trait]
impl Task for ApplyTax {
    fn name(&self) -> &str {
        "apply_tax"
    }
    fn input_types(&self) -> Vec<SlotKey> {
        vec![SlotKey::of::<DiscountedPrice>()]
    }
    fn output_type(&self) -> SlotKey {
        SlotKey::of::<TaxedPrice>()
    }
    fn timeout(&self) -> Duration {
        Duration::from_millis(300)
    }
    async fn execute(&self, _ctx: TaskContext, collection: Arc<dyn Collection>) -> Result<(), TaskError> {
        let typed = collection
            .as_any()
            .downcast_ref::<TypedCollection>()
            .ok_or_else(|| TaskError::other("expected a TypedCollection"))?;
        let discounted = typed
            .get::<DiscountedPrice>()
            .ok_or_else(|| TaskError::other("missing discounted price"))?;
        typed.set(TaxedPrice(discounted.0 * 1.07));
        Ok(())
    }
}

pub async fn run() -> Result<(f64, Duration), Box<dyn std::error::Error>> {
    let mut registry = Factory::new();
    registry.register_task(factory(|| Ok(Box::new(QuoteRawPrice))))?;
    registry.register_task(factory(|| Ok(Box::new(ApplyDiscount))))?;
    registry.register_task(factory(|| Ok(Box::new(ApplyTax))))?;

    let collection = Arc::new(TypedCollection::new().with_target::<TaxedPrice>());
    let flow = registry.create_flow(collection.clone())?;
    flow.execute(None, Duration::from_secs(2)).await?;

    let taxed = collection.get::<TaxedPrice>().expect("apply_tax always writes TaxedPrice");
    Ok((taxed.0, flow.time_cost()))
}
