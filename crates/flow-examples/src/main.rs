//! Run demo flows from the demos module (one demo per file).

mod demos;

use crate::demos::{goods_in_shops, retry_pipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    flow_engine::observability::init_observability();

    println!("=== Goods in shops: a three-task fan-in ===\n");
    let (inventory, elapsed) = goods_in_shops::run().await?;
    println!("Catalog: {inventory:?}\n  Completed in {elapsed:?}.\n");

    println!("=== Price pipeline: sequential dependency chain ===\n");
    let (price, elapsed) = retry_pipeline::run().await?;
    println!("Final price: {price:.2}\n  Completed in {elapsed:?}.");

    Ok(())
}
